//! Agent layer for FitCoach.
//!
//! - [`loop_runner`] — the tool-calling state machine behind every turn
//! - [`reasoning`] — splitting `<thinking>` traces from answers
//! - [`style`] — response styles and system prompt composition
//! - [`session`] — thread ids and per-thread turn locks
//! - [`cache`] — keyed single-flight cache for prepared agents
//! - [`assistant`] — the [`Coach`] facade used by front ends

pub mod assistant;
pub mod cache;
pub mod loop_runner;
pub mod reasoning;
pub mod session;
pub mod stream_event;
pub mod style;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant::{
    Coach, CoachStatus, KnowledgeStatus, ProviderFactory, TurnOptions, default_factory,
    knowledge_base, provider_factory,
};
pub use cache::{AgentCache, AgentKey};
pub use loop_runner::{AgentLoop, ToolRound};
pub use reasoning::{ReasoningView, THINKING_CLOSE, THINKING_OPEN};
pub use session::{SessionManager, TurnGuard};
pub use stream_event::TurnSnapshot;
pub use style::{BuiltinStyle, ComposedPrompt, StyleComposer};
