//! Keyed single-flight cache for prepared agents.

use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// What a prepared agent depends on. The credential is kept only as a
/// SHA-256 digest.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AgentKey {
    credential: [u8; 32],
    persona: String,
    temperature_bits: u32,
    knowledge: bool,
}

impl AgentKey {
    pub fn new(credential: Option<&str>, persona: &str, temperature: f32) -> Self {
        Self {
            credential: digest(credential.unwrap_or_default()),
            persona: persona.to_string(),
            temperature_bits: temperature.to_bits(),
            knowledge: false,
        }
    }

    /// Whether the knowledge base was searchable when the agent was prepared.
    pub fn with_knowledge(mut self, available: bool) -> Self {
        self.knowledge = available;
        self
    }
}

fn digest(credential: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(credential.as_bytes()));
    out
}

impl std::fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKey")
            .field("credential", &"[digest]")
            .field("persona_len", &self.persona.len())
            .field("temperature", &f32::from_bits(self.temperature_bits))
            .field("knowledge", &self.knowledge)
            .finish()
    }
}

type Slot<V> = Option<(AgentKey, Arc<OnceCell<V>>)>;

/// Holds one value for the most recent key.
///
/// Concurrent callers with the same key share one initialization. A call
/// with a different key replaces the cached value. Failed initializations
/// are not cached.
pub struct AgentCache<V> {
    slot: Mutex<Slot<V>>,
    inits: AtomicUsize,
}

impl<V: Clone> AgentCache<V> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            inits: AtomicUsize::new(0),
        }
    }

    pub async fn get_or_try_init<F, Fut, E>(&self, key: AgentKey, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut slot = self.slot.lock().await;
            let hit = match slot.as_ref() {
                Some((cached, cell)) if *cached == key => Some(Arc::clone(cell)),
                _ => None,
            };
            match hit {
                Some(cell) => cell,
                None => {
                    if slot.is_some() {
                        debug!(key = ?key, "Agent key changed; invalidating cached agent");
                    }
                    let cell = Arc::new(OnceCell::new());
                    *slot = Some((key, Arc::clone(&cell)));
                    cell
                }
            }
        };

        let value = cell
            .get_or_try_init(|| async {
                self.inits.fetch_add(1, Ordering::SeqCst);
                init().await
            })
            .await?;
        Ok(value.clone())
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// How many initializations have started.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl<V: Clone> Default for AgentCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_same_key_initializes_once() {
        let cache = Arc::new(AgentCache::<u32>::new());
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache
                        .get_or_try_init(AgentKey::new(Some("gsk_1"), "coach", 0.7), || async {
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok::<_, String>(42)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(cache.init_count(), 1);
    }

    #[tokio::test]
    async fn changed_key_invalidates() {
        let cache = AgentCache::<String>::new();
        let init = |v: &'static str| move || async move { Ok::<_, String>(v.to_string()) };

        let a = AgentKey::new(Some("key-a"), "coach", 0.7);
        assert_eq!(cache.get_or_try_init(a.clone(), init("first")).await.unwrap(), "first");
        assert_eq!(cache.get_or_try_init(a.clone(), init("ignored")).await.unwrap(), "first");

        let b = AgentKey::new(Some("key-b"), "coach", 0.7);
        assert_eq!(cache.get_or_try_init(b, init("second")).await.unwrap(), "second");

        let c = AgentKey::new(Some("key-b"), "coach", 0.2);
        assert_eq!(cache.get_or_try_init(c, init("third")).await.unwrap(), "third");
        assert_eq!(cache.init_count(), 3);
    }

    #[tokio::test]
    async fn knowledge_availability_is_part_of_the_key() {
        let cache = AgentCache::<bool>::new();
        let without = AgentKey::new(Some("gsk_1"), "coach", 0.7);
        let with = without.clone().with_knowledge(true);
        assert_ne!(without, with);

        assert!(!cache.get_or_try_init(without, || async { Ok::<_, String>(false) }).await.unwrap());
        assert!(cache.get_or_try_init(with, || async { Ok::<_, String>(true) }).await.unwrap());
        assert_eq!(cache.init_count(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = AgentCache::<u32>::new();
        let key = AgentKey::new(None, "coach", 0.7);
        let err = cache
            .get_or_try_init(key.clone(), || async { Err::<u32, _>("no key") })
            .await;
        assert_eq!(err, Err("no key"));
        let ok = cache.get_or_try_init(key, || async { Ok::<_, &str>(7) }).await;
        assert_eq!(ok, Ok(7));
    }

    #[test]
    fn debug_hides_credential() {
        let key = AgentKey::new(Some("gsk_secret"), "coach", 0.7);
        assert!(!format!("{key:?}").contains("gsk_secret"));
        assert_ne!(key, AgentKey::new(Some("gsk_other"), "coach", 0.7));
    }
}
