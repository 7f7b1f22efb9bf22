//! Agent configuration, loop state, and turn outcome types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ProviderError;
use crate::tool::ToolRegistry;

/// Per-invocation configuration for one agent turn.
#[derive(Clone)]
pub struct AgentConfig {
    /// Persona plus style (and reasoning directive), sent first on every call
    pub system_prompt: String,

    pub temperature: f32,

    /// Upper bound on provider calls within one turn
    pub max_iterations: u32,

    /// Tools the model may call; empty when retrieval is unavailable
    pub tools: Arc<ToolRegistry>,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            temperature,
            max_iterations: default_max_iterations(),
            tools: Arc::new(ToolRegistry::new()),
        }
    }

    /// Every turn makes at least one provider call, so 0 is raised to 1.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// The effective provider-call bound, never below 1.
    pub fn iteration_limit(&self) -> u32 {
        self.max_iterations.max(1)
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("system_prompt_len", &self.system_prompt.len())
            .field("temperature", &self.temperature)
            .field("max_iterations", &self.max_iterations)
            .field("tools", &self.tools.names())
            .finish()
    }
}

pub fn default_max_iterations() -> u32 {
    10
}

/// States of the per-turn agent state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the provider to answer the full sequence
    AwaitingModel,
    /// Executing the tool calls of the last assistant message
    DispatchingTools,
    /// Final answer produced
    Done,
    /// Stopped early by a provider failure or the iteration bound
    Aborted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Why a turn ended in `Aborted`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnError {
    #[error("provider call failed: {0}")]
    Provider(ProviderError),

    #[error("tool loop did not finish within {limit} model calls")]
    MaxIterationsExceeded { limit: u32 },
}

/// The outcome of one agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// The answer shown to the user (never contains the reasoning trace)
    pub answer_text: String,

    /// Reasoning trace, present only in structured-reasoning mode
    pub reasoning_trace: Option<String>,

    /// Tool names executed during the turn, in dispatch order
    pub tools_invoked: Vec<String>,

    /// Number of provider calls made
    pub provider_calls: u32,

    pub aborted: bool,

    pub error: Option<TurnError>,
}

impl TurnResult {
    pub fn state(&self) -> LoopState {
        if self.aborted {
            LoopState::Aborted
        } else {
            LoopState::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_iterations_still_allows_one_call() {
        let config = AgentConfig::new("You are a coach.", 0.7).with_max_iterations(0);
        assert_eq!(config.max_iterations, 1);

        let mut raw = AgentConfig::new("You are a coach.", 0.7);
        raw.max_iterations = 0;
        assert_eq!(raw.iteration_limit(), 1);
    }

    #[test]
    fn agent_config_defaults() {
        let config = AgentConfig::new("You are a coach.", 0.7);
        assert_eq!(config.max_iterations, 10);
        assert!(config.tools.is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(LoopState::Done.is_terminal());
        assert!(LoopState::Aborted.is_terminal());
        assert!(!LoopState::AwaitingModel.is_terminal());
        assert!(!LoopState::DispatchingTools.is_terminal());
    }

    #[test]
    fn turn_error_messages() {
        let err = TurnError::MaxIterationsExceeded { limit: 3 };
        assert!(err.to_string().contains('3'));
        let err = TurnError::Provider(ProviderError::Timeout("30s".into()));
        assert!(err.to_string().contains("30s"));
    }
}
