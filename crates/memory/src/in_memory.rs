//! In-memory thread store — conversation state for the process lifetime.

use async_trait::async_trait;
use fitcoach_core::error::StoreError;
use fitcoach_core::message::{Message, ThreadId};
use fitcoach_core::thread::{Thread, ThreadStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Slot = Arc<Mutex<Thread>>;

/// Keeps every thread behind its own lock, so appends to one thread never
/// wait on another. The outer map lock is held only to find or insert a slot.
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<ThreadId, Slot>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, id: &ThreadId) -> Option<Slot> {
        self.threads.read().await.get(id).cloned()
    }

    async fn slot_or_insert(&self, id: &ThreadId) -> Slot {
        if let Some(slot) = self.slot(id).await {
            return slot;
        }
        let mut threads = self.threads.write().await;
        threads
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Thread::new(id.clone()))))
            .clone()
    }
}

impl Default for InMemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ThreadId) -> Result<Thread, StoreError> {
        match self.slot(id).await {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(Thread::new(id.clone())),
        }
    }

    async fn append(&self, id: &ThreadId, messages: Vec<Message>) -> Result<(), StoreError> {
        let slot = self.slot_or_insert(id).await;
        let mut thread = slot.lock().await;
        let count = messages.len();
        thread.extend(messages)?;
        debug!(
            thread_id = %id,
            appended = count,
            total = thread.messages.len(),
            turns = thread.checkpoint.turns,
            "Thread checkpoint updated"
        );
        Ok(())
    }

    async fn clear(&self, id: &ThreadId) -> Result<(), StoreError> {
        let slot = self.slot_or_insert(id).await;
        slot.lock().await.reset();
        debug!(thread_id = %id, "Thread cleared");
        Ok(())
    }

    async fn threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        let mut ids: Vec<ThreadId> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
