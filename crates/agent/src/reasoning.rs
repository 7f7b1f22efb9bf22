//! Structured reasoning: splitting a `<thinking>` trace from the answer.
//!
//! Only the first delimiter pair is interpreted. Text before the opening
//! tag belongs to the answer, a closing tag that precedes the opening one is
//! plain text, and a lone closing tag splits trace from answer at itself.

use serde::Serialize;

pub const THINKING_OPEN: &str = "<thinking>";
pub const THINKING_CLOSE: &str = "</thinking>";

/// How far the reasoning in a piece of model output has progressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReasoningView {
    /// No delimiters: everything is answer text.
    Plain { answer: String },

    /// The opening tag has been seen but not the closing one.
    Incomplete { trace: String, preamble: String },

    /// A full trace followed (or preceded) by answer text.
    Complete { trace: String, answer: String },
}

impl ReasoningView {
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::Plain { .. } => None,
            Self::Incomplete { trace, .. } | Self::Complete { trace, .. } => {
                Some(trace.as_str()).filter(|t| !t.is_empty())
            }
        }
    }

    /// Answer text recovered so far. Empty while reasoning is incomplete
    /// and nothing preceded the opening tag.
    pub fn answer(&self) -> &str {
        match self {
            Self::Plain { answer } | Self::Complete { answer, .. } => answer,
            Self::Incomplete { preamble, .. } => preamble,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}

pub fn parse(text: &str) -> ReasoningView {
    if let Some(open) = text.find(THINKING_OPEN) {
        let preamble = text[..open].trim();
        let rest = &text[open + THINKING_OPEN.len()..];
        return match rest.find(THINKING_CLOSE) {
            Some(close) => ReasoningView::Complete {
                trace: rest[..close].trim().to_string(),
                answer: join_answer(preamble, rest[close + THINKING_CLOSE.len()..].trim()),
            },
            None => ReasoningView::Incomplete {
                trace: rest.trim().to_string(),
                preamble: preamble.to_string(),
            },
        };
    }

    match text.find(THINKING_CLOSE) {
        Some(close) => ReasoningView::Complete {
            trace: text[..close].trim().to_string(),
            answer: text[close + THINKING_CLOSE.len()..].trim().to_string(),
        },
        None => ReasoningView::Plain {
            answer: text.trim().to_string(),
        },
    }
}

/// Final `(answer, trace)` for a completed model response. An empty answer
/// becomes `fallback`.
pub fn finalize(text: &str, fallback: &str) -> (String, Option<String>) {
    let view = parse(text);
    let trace = view.trace().map(str::to_string);
    let answer = match view.answer() {
        "" => fallback.to_string(),
        answer => answer.to_string(),
    };
    (answer, trace)
}

fn join_answer(preamble: &str, tail: &str) -> String {
    match (preamble.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (false, true) => preamble.to_string(),
        (false, false) => format!("{preamble}\n\n{tail}"),
    }
}
