//! Response styles and system prompt composition.

use fitcoach_config::{CustomStyle, Language, Locale};

pub const CONCISE: &str = "concise";
pub const NORMAL: &str = "normal";
pub const CREATIVE: &str = "creative";

/// Temperature used whenever structured reasoning is on.
pub const REASONING_TEMPERATURE: f32 = 0.2;

/// The built-in styles, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStyle {
    Concise,
    Normal,
    Creative,
}

impl BuiltinStyle {
    pub const ALL: [BuiltinStyle; 3] = [Self::Concise, Self::Normal, Self::Creative];

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            CONCISE => Some(Self::Concise),
            NORMAL => Some(Self::Normal),
            CREATIVE => Some(Self::Creative),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Concise => CONCISE,
            Self::Normal => NORMAL,
            Self::Creative => CREATIVE,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Self::Concise => 0.3,
            Self::Normal => 0.7,
            Self::Creative => 1.0,
        }
    }

    pub fn instruction(self, locale: &Locale) -> &'static str {
        match self {
            Self::Concise => locale.style_concise,
            Self::Normal => locale.style_normal,
            Self::Creative => locale.style_creative,
        }
    }
}

/// A system prompt and the temperature to send it with.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub system_prompt: String,
    pub temperature: f32,
}

/// Composes the persona with a style fragment and, optionally, the
/// structured-reasoning directive.
#[derive(Debug, Clone, Copy)]
pub struct StyleComposer {
    locale: &'static Locale,
}

impl StyleComposer {
    pub fn new(language: Language) -> Self {
        Self {
            locale: Locale::for_language(language),
        }
    }

    /// Built-in ids win over custom styles with the same id; unknown ids
    /// fall back to `normal`.
    pub fn compose(
        &self,
        base: &str,
        style_id: &str,
        custom_styles: &[CustomStyle],
        reasoning: bool,
    ) -> ComposedPrompt {
        let (instruction, temperature) = match BuiltinStyle::from_id(style_id) {
            Some(style) => (style.instruction(self.locale), style.temperature()),
            None => match custom_styles.iter().find(|s| s.id == style_id) {
                Some(custom) => (custom.instruction.as_str(), custom.temperature),
                None => {
                    tracing::debug!(style_id, "Unknown style, using normal");
                    let normal = BuiltinStyle::Normal;
                    (normal.instruction(self.locale), normal.temperature())
                }
            },
        };

        let mut system_prompt = format!("{}\n\n{}", base.trim_end(), instruction);
        let temperature = if reasoning {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(self.locale.reasoning_directive);
            REASONING_TEMPERATURE
        } else {
            temperature
        };

        ComposedPrompt {
            system_prompt,
            temperature,
        }
    }
}

/// Every selectable style id: built-ins first, then custom styles.
pub fn style_ids(custom_styles: &[CustomStyle]) -> Vec<&str> {
    BuiltinStyle::ALL
        .iter()
        .map(|s| s.id())
        .chain(
            custom_styles
                .iter()
                .map(|s| s.id.as_str())
                .filter(|id| BuiltinStyle::from_id(id).is_none()),
        )
        .collect()
}
