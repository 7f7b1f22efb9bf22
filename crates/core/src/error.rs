//! Error types for the FitCoach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all FitCoach operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Conversation state errors ---
    #[error("Thread store error: {0}")]
    Store(#[from] StoreError),

    // --- Knowledge base errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The consumer of a streamed turn went away before the turn finished.
    #[error("Turn cancelled before completion")]
    Cancelled,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the completion provider. The agent loop never retries these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A tool result would be stored without the assistant call it answers.
    #[error("Tool result '{call_id}' has no matching tool call")]
    UnmatchedToolCall { call_id: String },

    /// An assistant tool call would be stored without its result.
    #[error("Tool call '{call_id}' has no matching tool result")]
    UnansweredToolCall { call_id: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnowledgeError {
    /// Ingestion produced zero chunks; callers treat this as "no retrieval".
    #[error("Knowledge store unavailable: no documents were ingested")]
    StoreUnavailable,

    #[error("Failed to load document {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}
