//! # FitCoach Core
//!
//! Domain types, traits, and error definitions for the FitCoach
//! retrieval-augmented assistant. This crate has **no framework
//! dependencies**; it defines the model every other crate implements against.
//!
//! ## Layout
//!
//! Each collaborator of the agent loop is a trait here:
//! - [`Provider`] — the stateless language-model call
//! - [`Tool`] / [`ToolRegistry`] — callable capabilities exposed to the model
//! - [`ThreadStore`] — per-thread conversation checkpoints
//!
//! Implementations live in their own crates, so tests can swap in scripted
//! stand-ins.

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod thread;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, default_max_iterations, LoopState, TurnError, TurnResult};
pub use error::{Error, KnowledgeError, ProviderError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, ThreadId, ToolCallRequest};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, StreamChunk,
    Usage,
};
pub use thread::{Checkpoint, Thread, ThreadStore};
pub use tool::{Tool, ToolDefinition, ToolRegistry, ToolResult};
