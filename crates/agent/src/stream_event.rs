//! Streaming turn snapshots.
//!
//! A streamed turn yields a sequence of `TurnSnapshot`s: partial model text
//! while the provider is answering, a snapshot per tool dispatch, and a final
//! snapshot that carries the `TurnResult`.

use fitcoach_core::agent::{LoopState, TurnResult};

use crate::reasoning::{self, ReasoningView};

/// The observable state of a turn at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSnapshot {
    pub state: LoopState,

    /// Model text of the current provider call, accumulated so far.
    pub content: String,

    /// `content` split into reasoning trace and answer.
    pub reasoning: ReasoningView,

    /// Tools invoked earlier in this turn.
    pub tools_invoked: Vec<String>,

    /// Present only on the last snapshot.
    pub result: Option<TurnResult>,
}

impl TurnSnapshot {
    pub fn progress(state: LoopState, content: &str, tools_invoked: &[String]) -> Self {
        Self {
            state,
            content: content.to_string(),
            reasoning: reasoning::parse(content),
            tools_invoked: tools_invoked.to_vec(),
            result: None,
        }
    }

    pub fn finished(result: TurnResult) -> Self {
        Self {
            state: result.state(),
            content: result.answer_text.clone(),
            reasoning: reasoning::parse(&result.answer_text),
            tools_invoked: result.tools_invoked.clone(),
            result: Some(result),
        }
    }

    pub fn is_final(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_snapshot_parses_reasoning() {
        let snap = TurnSnapshot::progress(
            LoopState::AwaitingModel,
            "<thinking>checking the user's goal",
            &["fitness_knowledge".to_string()],
        );
        assert!(snap.reasoning.is_incomplete());
        assert_eq!(snap.tools_invoked, vec!["fitness_knowledge"]);
        assert!(!snap.is_final());
    }

    #[test]
    fn finished_snapshot_carries_result() {
        let result = TurnResult {
            answer_text: "Rest 48 hours between heavy sessions.".into(),
            reasoning_trace: None,
            tools_invoked: vec![],
            provider_calls: 1,
            aborted: false,
            error: None,
        };
        let snap = TurnSnapshot::finished(result.clone());
        assert_eq!(snap.state, LoopState::Done);
        assert!(snap.is_final());
        assert_eq!(snap.result, Some(result));
    }
}
