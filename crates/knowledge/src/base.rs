//! Lazily built, process-wide knowledge base.

use async_trait::async_trait;
use chrono::Utc;
use fitcoach_core::error::KnowledgeError;
use fitcoach_core::event::{DomainEvent, EventBus};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::document::DocumentSource;
use crate::embedding::Embedder;
use crate::splitter::RecursiveSplitter;
use crate::store::{KnowledgeStore, ScoredChunk};

/// "Given a query, return the top-k chunks."
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, KnowledgeError>;
}

/// Owns the ingestion pipeline and the index it produces.
///
/// The index is built on first use. Concurrent callers during the build all
/// wait for the same in-flight build; a failed build is not remembered, so
/// the next caller tries again. A build that finds no documents succeeds
/// with an empty index, which searches report as `StoreUnavailable`.
pub struct KnowledgeBase {
    source: Arc<dyn DocumentSource>,
    splitter: RecursiveSplitter,
    embedder: Arc<dyn Embedder>,
    store: OnceCell<Arc<KnowledgeStore>>,
    builds: AtomicUsize,
    events: Option<Arc<EventBus>>,
}

impl KnowledgeBase {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        splitter: RecursiveSplitter,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            source,
            splitter,
            embedder,
            store: OnceCell::new(),
            builds: AtomicUsize::new(0),
            events: None,
        }
    }

    /// Publish `KnowledgeBaseBuilt` on this bus when the index is ready.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// The index, building it if this is the first call.
    pub async fn store(&self) -> Result<Arc<KnowledgeStore>, KnowledgeError> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let result = self.build().await;
                if let Err(e) = &result {
                    warn!(source = %self.source.describe(), error = %e, "Knowledge build failed");
                }
                result
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// Whether the index has been built and has at least one chunk.
    ///
    /// Builds the index if needed; build failures count as unavailable.
    pub async fn is_available(&self) -> bool {
        matches!(self.store().await, Ok(store) if !store.is_empty())
    }

    /// The index if it has already been built, without triggering a build.
    pub fn built(&self) -> Option<Arc<KnowledgeStore>> {
        self.store.get().cloned()
    }

    /// How many builds have actually run (successful or not).
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    async fn build(&self) -> Result<Arc<KnowledgeStore>, KnowledgeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        info!(source = %self.source.describe(), "Building knowledge index");

        let documents = self.source.load().await?;
        let document_count = documents.len();
        let store =
            KnowledgeStore::build(documents, &self.splitter, Arc::clone(&self.embedder)).await?;

        if store.is_empty() {
            warn!(source = %self.source.describe(), "No documents ingested; retrieval disabled");
        }

        if let Some(events) = &self.events {
            events.publish(DomainEvent::KnowledgeBaseBuilt {
                documents: document_count,
                chunks: store.len(),
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
        }

        Ok(Arc::new(store))
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        self.store().await?.search(query, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, StaticDocuments};
    use crate::embedding::HashingEmbedder;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// A source that is slow, counts loads, and can fail once.
    struct SlowSource {
        loads: AtomicUsize,
        fail_first: AtomicBool,
        inner: StaticDocuments,
    }

    impl SlowSource {
        fn new(fail_first: bool) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail_first: AtomicBool::new(fail_first),
                inner: StaticDocuments::from_texts([
                    ("protein.txt", "Protein supports muscle repair."),
                    ("cardio.txt", "Cardio improves endurance."),
                ]),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for SlowSource {
        fn describe(&self) -> String {
            "slow".into()
        }

        async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail_first.swap(false, Ordering::SeqCst) {
                return Err(KnowledgeError::Load {
                    path: "slow".into(),
                    reason: "disk busy".into(),
                });
            }
            self.inner.load().await
        }
    }

    fn base(source: Arc<dyn DocumentSource>) -> KnowledgeBase {
        KnowledgeBase::new(
            source,
            RecursiveSplitter::default(),
            Arc::new(HashingEmbedder::default()),
        )
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_build() {
        let source = Arc::new(SlowSource::new(false));
        let kb = Arc::new(base(source.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let kb = Arc::clone(&kb);
                tokio::spawn(async move { kb.store().await.map(|s| s.len()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 2);
        }
        assert_eq!(kb.build_count(), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_is_retried() {
        let kb = base(Arc::new(SlowSource::new(true)));
        assert!(kb.store().await.is_err());
        assert!(kb.built().is_none());

        let store = kb.store().await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(kb.build_count(), 2);
    }

    #[tokio::test]
    async fn empty_corpus_builds_once_and_is_unavailable() {
        let kb = base(Arc::new(StaticDocuments::default()));
        assert!(!kb.is_available().await);
        assert_eq!(
            kb.retrieve("protein", 3).await.unwrap_err(),
            KnowledgeError::StoreUnavailable
        );
        assert_eq!(kb.build_count(), 1);
    }

    #[tokio::test]
    async fn retrieve_searches_the_built_index() {
        let events = Arc::new(EventBus::new(8));
        let mut rx = events.subscribe();
        let kb = base(Arc::new(SlowSource::new(false))).with_events(events);

        let hits = kb.retrieve("muscle repair protein", 1).await.unwrap();
        assert_eq!(hits[0].chunk.source.path, "protein.txt");

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::KnowledgeBaseBuilt { chunks: 2, .. }
        ));
    }
}
