//! Subcommand implementations and the pieces they share.

pub mod ask;
pub mod chat;
pub mod onboard;
pub mod status;

use anyhow::{Context, bail};
use clap::Args;
use fitcoach_agent::{Coach, TurnOptions, TurnSnapshot};
use fitcoach_config::{AppConfig, Language, Locale};
use fitcoach_core::agent::{LoopState, TurnResult};

/// Per-turn flags shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct TurnFlags {
    /// Response style: concise, normal, creative, or a custom style id
    #[arg(long)]
    pub style: Option<String>,

    /// Show the coach's reasoning before the answer
    #[arg(long)]
    pub reasoning: bool,

    /// Answer language (en, tr)
    #[arg(long)]
    pub language: Option<Language>,
}

impl TurnFlags {
    pub fn options(&self, config: &AppConfig) -> TurnOptions {
        let mut options = TurnOptions::from_config(config);
        if let Some(style) = &self.style {
            options = options.with_style(style.clone());
        }
        if self.reasoning {
            options = options.with_reasoning(true);
        }
        if let Some(language) = self.language {
            options = options.with_language(language);
        }
        options
    }
}

/// Load the config and wire a coach, failing early without credentials.
pub fn load_coach() -> anyhow::Result<Coach> {
    let config = AppConfig::load().context("Failed to load config")?;

    if !config.has_api_key() && config.provider.name != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GROQ_API_KEY='gsk_...'       (default provider)");
        eprintln!("    export OPENAI_API_KEY='sk-...'      (for OpenAI)");
        eprintln!("    export FITCOACH_API_KEY='...'       (any provider)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        bail!("No API key found. See above for setup instructions.");
    }

    Ok(Coach::from_config(config))
}

/// Render a finished turn for the terminal.
pub fn render_result(result: &TurnResult, show_reasoning: bool) -> String {
    let mut out = String::new();
    if show_reasoning {
        if let Some(trace) = &result.reasoning_trace {
            out.push_str("💭 ");
            out.push_str(trace);
            out.push_str("\n\n");
        }
    }
    if let Some(error) = &result.error {
        if result.answer_text.is_empty() {
            out.push_str(&format!("[Error] {error}"));
            return out;
        }
    }
    out.push_str(&result.answer_text);
    out
}

/// Turns a snapshot stream into incremental terminal output.
///
/// Only answer text is printed while the model is generating; a trace in
/// progress shows the localized "thinking" notice once.
pub struct StreamPrinter {
    printed: String,
    thinking_shown: bool,
    locale: &'static Locale,
}

impl StreamPrinter {
    pub fn new(language: Language) -> Self {
        Self {
            printed: String::new(),
            thinking_shown: false,
            locale: Locale::for_language(language),
        }
    }

    /// Text to write for this snapshot, if any.
    pub fn update(&mut self, snapshot: &TurnSnapshot) -> Option<String> {
        if let Some(result) = &snapshot.result {
            return self.finish(result);
        }
        if snapshot.state != LoopState::AwaitingModel {
            return None;
        }

        if snapshot.reasoning.is_incomplete() && snapshot.reasoning.answer().is_empty() {
            if self.thinking_shown {
                return None;
            }
            self.thinking_shown = true;
            return Some(format!("{}\n", self.locale.thinking));
        }

        let answer = snapshot.reasoning.answer();
        if answer.is_empty() || answer == self.printed {
            return None;
        }
        let delta = match answer.strip_prefix(self.printed.as_str()) {
            Some(rest) => rest.to_string(),
            None if self.printed.is_empty() => answer.to_string(),
            None => format!("\n{answer}"),
        };
        self.printed = answer.to_string();
        Some(delta)
    }

    fn finish(&mut self, result: &TurnResult) -> Option<String> {
        let answer = render_result(result, false);
        let out = if self.printed.trim() == answer.trim() {
            "\n".to_string()
        } else if self.printed.is_empty() {
            format!("{answer}\n")
        } else {
            format!("\n{answer}\n")
        };
        self.printed = answer;
        Some(out)
    }
}
