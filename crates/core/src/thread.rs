//! Thread (conversation session) state and the store that owns it.
//!
//! A thread is the persisted checkpoint of one conversation: the ordered
//! message sequence (never including the per-call system instruction) plus
//! bookkeeping needed to resume it on the next turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::{Message, ThreadId};

/// Resumption metadata stored alongside a thread's messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Number of completed appends (one per finished turn)
    pub turns: u64,

    /// When the thread was first seen
    pub created_at: DateTime<Utc>,

    /// When the last append happened
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            turns: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

/// A conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,

    /// Ordered messages, append-only between clears
    pub messages: Vec<Message>,

    pub checkpoint: Checkpoint,
}

impl Thread {
    /// Create an empty thread.
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            checkpoint: Checkpoint::new(),
        }
    }

    /// Append a fully formed turn. Fails without modifying the thread if the
    /// messages break tool-call pairing.
    pub fn extend(&mut self, messages: Vec<Message>) -> Result<(), StoreError> {
        validate_pairing(&messages)?;
        self.messages.extend(messages);
        self.checkpoint.turns += 1;
        self.checkpoint.updated_at = Utc::now();
        Ok(())
    }

    /// Drop all messages and reset the checkpoint, keeping the id.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.checkpoint = Checkpoint::new();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of user messages in the thread.
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::User { .. }))
            .count()
    }
}

/// Check that every tool result answers a call emitted earlier in `messages`
/// and every emitted call is answered before the next non-tool message.
pub fn validate_pairing(messages: &[Message]) -> Result<(), StoreError> {
    let mut pending: Vec<String> = Vec::new();

    for message in messages {
        match message {
            Message::Tool { tool_call_id, .. } => {
                match pending.iter().position(|id| id == tool_call_id) {
                    Some(idx) => {
                        pending.remove(idx);
                    }
                    None => {
                        return Err(StoreError::UnmatchedToolCall {
                            call_id: tool_call_id.clone(),
                        });
                    }
                }
            }
            other => {
                if let Some(call_id) = pending.first() {
                    return Err(StoreError::UnansweredToolCall {
                        call_id: call_id.clone(),
                    });
                }
                pending.extend(other.tool_calls().iter().map(|c| c.id.clone()));
            }
        }
    }

    match pending.first() {
        Some(call_id) => Err(StoreError::UnansweredToolCall {
            call_id: call_id.clone(),
        }),
        None => Ok(()),
    }
}

/// The conversation state store.
///
/// Implementations must make `append` atomic with respect to other calls on
/// the same thread id; it is the only mutator besides `clear`.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Get a snapshot of a thread. Unseen ids yield an empty thread.
    async fn get(&self, id: &ThreadId) -> Result<Thread, StoreError>;

    /// Append one turn's messages to a thread.
    async fn append(&self, id: &ThreadId, messages: Vec<Message>) -> Result<(), StoreError>;

    /// Reset a thread to empty without invalidating its id.
    async fn clear(&self, id: &ThreadId) -> Result<(), StoreError>;

    /// Ids of all threads the store has seen.
    async fn threads(&self) -> Result<Vec<ThreadId>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCallRequest;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: "fitness_knowledge".into(),
            arguments: serde_json::json!({"query": "protein"}),
        }
    }

    #[test]
    fn plain_turn_is_valid() {
        let msgs = vec![Message::user("hi"), Message::assistant("hello")];
        assert!(validate_pairing(&msgs).is_ok());
    }

    #[test]
    fn matched_tool_round_is_valid() {
        let msgs = vec![
            Message::user("protein?"),
            Message::assistant_with_calls("", vec![call("a"), call("b")]),
            Message::tool_result("a", "fitness_knowledge", "x"),
            Message::tool_result("b", "fitness_knowledge", "y"),
            Message::assistant("About 1.6 g/kg."),
        ];
        assert!(validate_pairing(&msgs).is_ok());
    }

    #[test]
    fn orphan_tool_result_is_rejected() {
        let msgs = vec![
            Message::user("protein?"),
            Message::tool_result("ghost", "fitness_knowledge", "x"),
        ];
        assert_eq!(
            validate_pairing(&msgs),
            Err(StoreError::UnmatchedToolCall {
                call_id: "ghost".into()
            })
        );
    }

    #[test]
    fn unanswered_call_is_rejected() {
        let msgs = vec![
            Message::user("protein?"),
            Message::assistant_with_calls("", vec![call("a")]),
        ];
        assert!(matches!(
            validate_pairing(&msgs),
            Err(StoreError::UnansweredToolCall { .. })
        ));
    }

    #[test]
    fn duplicate_result_is_rejected() {
        let msgs = vec![
            Message::assistant_with_calls("", vec![call("a")]),
            Message::tool_result("a", "fitness_knowledge", "x"),
            Message::tool_result("a", "fitness_knowledge", "x"),
        ];
        assert!(matches!(
            validate_pairing(&msgs),
            Err(StoreError::UnmatchedToolCall { .. })
        ));
    }

    #[test]
    fn extend_counts_turns_and_reset_clears() {
        let mut thread = Thread::new(ThreadId::from("t1"));
        thread
            .extend(vec![Message::user("hi"), Message::assistant("hello")])
            .unwrap();
        assert_eq!(thread.checkpoint.turns, 1);
        assert_eq!(thread.user_turns(), 1);

        thread.reset();
        assert!(thread.is_empty());
        assert_eq!(thread.checkpoint.turns, 0);
        assert_eq!(thread.id, ThreadId::from("t1"));
    }

    #[test]
    fn failed_extend_leaves_thread_untouched() {
        let mut thread = Thread::new(ThreadId::from("t1"));
        let err = thread.extend(vec![Message::tool_result("x", "t", "y")]);
        assert!(err.is_err());
        assert!(thread.is_empty());
        assert_eq!(thread.checkpoint.turns, 0);
    }
}
