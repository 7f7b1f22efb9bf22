//! Configuration loading, validation, and management for FitCoach.
//!
//! Loads configuration from `~/.fitcoach/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod locale;

pub use locale::{Language, Locale};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.fitcoach/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Language for the persona, tool description, and style fragments
    #[serde(default)]
    pub language: Language,

    /// Replace the localized coach persona entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub knowledge: KnowledgeSettings,

    /// User-defined response styles, selectable by id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<CustomStyle>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("language", &self.language)
            .field("persona", &self.persona.as_ref().map(|p| p.len()))
            .field("provider", &self.provider)
            .field("agent", &self.agent)
            .field("knowledge", &self.knowledge)
            .field("styles", &self.styles)
            .finish()
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name: "groq", "openai", "openrouter", "ollama"
    #[serde(default = "default_provider")]
    pub name: String,

    /// Override the provider's base URL (OpenAI-compatible endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "openai/gpt-oss-120b".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider(),
            base_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Agent loop and prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum provider calls per turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Style id used when a turn does not name one
    #[serde(default = "default_style")]
    pub default_style: String,

    /// Ask for a `<thinking>` trace before every answer
    #[serde(default)]
    pub reasoning: bool,
}

fn default_max_tool_iterations() -> u32 {
    10
}
fn default_style() -> String {
    "normal".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            default_style: default_style(),
            reasoning: false,
        }
    }
}

/// Which embedder turns chunks and queries into vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Deterministic local feature hashing, no network
    #[default]
    Hashing,
    /// The configured provider's embeddings endpoint
    Provider,
}

/// Knowledge base ingestion and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSettings {
    /// Directory scanned for `.pdf`, `.txt`, and `.md` documents
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks returned per retrieval call
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub embedder: EmbedderKind,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Model name for the provider embedder
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("data/fitness_pdfs")
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    3
}
fn default_embedding_dimensions() -> usize {
    384
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embedder: EmbedderKind::default(),
            embedding_dimensions: default_embedding_dimensions(),
            embedding_model: default_embedding_model(),
        }
    }
}

/// A user-defined response style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStyle {
    /// Id used to select the style (e.g. "drill_sergeant")
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Appended to the persona when the style is selected
    pub instruction: String,

    #[serde(default = "default_style_temperature")]
    pub temperature: f32,
}

fn default_style_temperature() -> f32 {
    0.7
}

impl AppConfig {
    /// Load configuration from the default path (~/.fitcoach/config.toml).
    ///
    /// Environment overrides, applied after the file:
    /// - `FITCOACH_API_KEY`, then `GROQ_API_KEY`, then `OPENAI_API_KEY`
    /// - `FITCOACH_MODEL`
    /// - `FITCOACH_LANGUAGE`
    /// - `FITCOACH_DOCUMENTS_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FITCOACH_API_KEY")
            .or_else(|| non_empty("GROQ_API_KEY"))
            .or_else(|| non_empty("OPENAI_API_KEY"))
        {
            self.api_key = Some(key);
        }

        if let Some(model) = non_empty("FITCOACH_MODEL") {
            self.provider.model = model;
        }

        if let Some(language) = non_empty("FITCOACH_LANGUAGE") {
            self.language = language
                .parse()
                .map_err(ConfigError::ValidationError)?;
        }

        if let Some(dir) = non_empty("FITCOACH_DOCUMENTS_DIR") {
            self.knowledge.documents_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".fitcoach")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be at least 1".into(),
            ));
        }

        let k = &self.knowledge;
        if k.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_size must be > 0".into(),
            ));
        }
        if k.chunk_overlap >= k.chunk_size {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if k.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be at least 1".into(),
            ));
        }
        if k.embedding_dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.embedding_dimensions must be > 0".into(),
            ));
        }

        for style in &self.styles {
            if style.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "custom styles need a non-empty id".into(),
                ));
            }
            if !(0.0..=2.0).contains(&style.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "style '{}': temperature must be between 0.0 and 2.0",
                    style.id
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The persona prompt: the override if set, else the localized default.
    pub fn persona_prompt(&self) -> String {
        self.persona
            .clone()
            .unwrap_or_else(|| Locale::for_language(self.language).persona.to_string())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: Language::default(),
            persona: None,
            provider: ProviderSettings::default(),
            agent: AgentSettings::default(),
            knowledge: KnowledgeSettings::default(),
            styles: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for fitcoach_core::Error {
    fn from(err: ConfigError) -> Self {
        fitcoach_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider.name, "groq");
        assert_eq!(config.provider.model, "openai/gpt-oss-120b");
        assert_eq!(config.agent.max_tool_iterations, 10);
        assert_eq!(config.knowledge.chunk_size, 1000);
        assert_eq!(config.knowledge.chunk_overlap, 200);
        assert_eq!(config.knowledge.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.knowledge.documents_dir, config.knowledge.documents_dir);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.knowledge.chunk_overlap = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_style_temperature_is_checked() {
        let mut config = AppConfig::default();
        config.styles.push(CustomStyle {
            id: "hype".into(),
            name: "Hype".into(),
            instruction: "Be loud.".into(),
            temperature: 3.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.name, "groq");
    }

    #[test]
    fn file_config_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
language = "tr"

[agent]
max_tool_iterations = 4
reasoning = true

[knowledge]
documents_dir = "/srv/pdfs"
top_k = 5

[[styles]]
id = "drill"
instruction = "Talk like a drill sergeant."
temperature = 0.9
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.language, Language::Tr);
        assert_eq!(config.agent.max_tool_iterations, 4);
        assert!(config.agent.reasoning);
        assert_eq!(config.knowledge.top_k, 5);
        assert_eq!(config.knowledge.chunk_size, 1000);
        assert_eq!(config.styles[0].id, "drill");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "language = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("GROQ_API_KEY", "gsk_groq"),
                ("OPENAI_API_KEY", "sk_openai"),
                ("FITCOACH_MODEL", "llama-3.3-70b-versatile"),
                ("FITCOACH_LANGUAGE", "tr"),
                ("FITCOACH_DOCUMENTS_DIR", "/data/docs"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk_groq"));
        assert_eq!(config.provider.model, "llama-3.3-70b-versatile");
        assert_eq!(config.language, Language::Tr);
        assert_eq!(config.knowledge.documents_dir, PathBuf::from("/data/docs"));
    }

    #[test]
    fn unknown_language_in_env_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("FITCOACH_LANGUAGE", "xx")]));
        assert!(matches!(err, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk_secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn persona_override_wins() {
        let mut config = AppConfig::default();
        assert!(config.persona_prompt().contains("fitness coach"));
        config.persona = Some("You are a marathon coach.".into());
        assert_eq!(config.persona_prompt(), "You are a marathon coach.");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openai/gpt-oss-120b"));
        assert!(toml_str.contains("data/fitness_pdfs"));
    }
}
