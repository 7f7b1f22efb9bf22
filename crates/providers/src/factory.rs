//! Provider construction from configuration.

use fitcoach_config::ProviderSettings;
use fitcoach_core::error::ProviderError;
use fitcoach_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::openai_compat::{
    GROQ_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatProvider,
};

/// Default base URL for a known provider name.
pub fn default_base_url(name: &str) -> Option<&'static str> {
    match name {
        "groq" => Some(GROQ_BASE_URL),
        "openai" => Some(OPENAI_BASE_URL),
        "openrouter" => Some(OPENROUTER_BASE_URL),
        "ollama" => Some(OLLAMA_BASE_URL),
        _ => None,
    }
}

/// Build the completion provider described by `settings`.
///
/// Every backend except Ollama needs a non-empty API key. Unknown provider
/// names are accepted when `base_url` points at an OpenAI-compatible endpoint.
pub fn build_provider(
    settings: &ProviderSettings,
    api_key: Option<&str>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = settings.name.to_ascii_lowercase();
    let base_url = settings
        .base_url
        .as_deref()
        .or_else(|| default_base_url(&name))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "unknown provider '{name}'; set provider.base_url to an OpenAI-compatible endpoint"
            ))
        })?;

    let api_key = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None if name == "ollama" => "ollama".to_string(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set FITCOACH_API_KEY or GROQ_API_KEY)"
            )));
        }
    };

    debug!(provider = %name, base_url, "Building provider");
    let provider = OpenAiCompatProvider::new(
        name,
        base_url,
        api_key,
        Duration::from_secs(settings.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_groq_by_default() {
        let provider = build_provider(&ProviderSettings::default(), Some("gsk_test")).unwrap();
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = build_provider(&ProviderSettings::default(), Some("  ")).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let settings = ProviderSettings {
            name: "ollama".into(),
            ..ProviderSettings::default()
        };
        assert!(build_provider(&settings, None).is_ok());
    }

    #[test]
    fn unknown_provider_needs_base_url() {
        let mut settings = ProviderSettings {
            name: "together".into(),
            ..ProviderSettings::default()
        };
        assert!(build_provider(&settings, Some("k")).is_err());

        settings.base_url = Some("https://api.together.xyz/v1".into());
        assert_eq!(build_provider(&settings, Some("k")).unwrap().name(), "together");
    }
}
