//! Domain event system — decoupled observation of agent activity.
//!
//! The agent loop and knowledge base publish events; the CLI (or anything
//! else) can subscribe without the publishers knowing about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user message entered the agent loop
    TurnStarted {
        thread_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The provider answered one call
    ResponseGenerated {
        thread_id: String,
        model: String,
        tokens_used: u32,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        thread_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A turn reached a terminal state
    TurnCompleted {
        thread_id: String,
        aborted: bool,
        provider_calls: u32,
        tools_invoked: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The knowledge index finished building
    KnowledgeBaseBuilt {
        documents: usize,
        chunks: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
