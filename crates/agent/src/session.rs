//! Thread sessions and per-thread turn locks.

use fitcoach_core::error::StoreError;
use fitcoach_core::message::{Message, ThreadId};
use fitcoach_core::thread::{Thread, ThreadStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Held for the duration of one turn on a thread.
pub type TurnGuard = OwnedMutexGuard<()>;

/// Issues thread ids and serializes turns per thread.
///
/// Turns on the same thread run one after another; different threads never
/// wait on each other beyond the brief lock-table lookup.
pub struct SessionManager {
    store: Arc<dyn ThreadStore>,
    turn_locks: Mutex<HashMap<ThreadId, Arc<Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self {
            store,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<dyn ThreadStore> {
        Arc::clone(&self.store)
    }

    pub fn new_thread(&self) -> ThreadId {
        let id = ThreadId::new();
        debug!(thread_id = %id, "New thread");
        id
    }

    /// Wait until no other turn is running on `id`, then claim it.
    pub async fn begin_turn(&self, id: &ThreadId) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    pub async fn thread(&self, id: &ThreadId) -> Result<Thread, StoreError> {
        self.store.get(id).await
    }

    pub async fn history(&self, id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        Ok(self.store.get(id).await?.messages)
    }

    /// Clear a thread's history. Waits for a running turn to finish first.
    pub async fn reset(&self, id: &ThreadId) -> Result<(), StoreError> {
        let _guard = self.begin_turn(id).await;
        self.store.clear(id).await
    }

    pub async fn threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        self.store.threads().await
    }
}
