//! The immutable chunk index.

use fitcoach_core::error::KnowledgeError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::document::{Document, SourceLocator};
use crate::embedding::Embedder;
use crate::splitter::RecursiveSplitter;
use crate::vector;

/// One indexed slice of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeChunk {
    pub text: String,
    pub source: SourceLocator,
    pub embedding: Vec<f32>,

    /// Position in ingestion order; breaks score ties
    pub ordinal: usize,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<KnowledgeChunk>,
    pub score: f32,
}

/// Read-only index built once from a corpus.
pub struct KnowledgeStore {
    chunks: Vec<Arc<KnowledgeChunk>>,
    documents: usize,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeStore {
    /// Chunk and embed `documents` into a new index.
    pub async fn build(
        documents: Vec<Document>,
        splitter: &RecursiveSplitter,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, KnowledgeError> {
        let distinct_sources: HashSet<&str> =
            documents.iter().map(|d| d.source.path.as_str()).collect();
        let document_count = distinct_sources.len();

        let mut pieces: Vec<(String, SourceLocator)> = Vec::new();
        for doc in &documents {
            for text in splitter.split(&doc.text) {
                pieces.push((text, doc.source.clone()));
            }
        }

        let texts: Vec<String> = pieces.iter().map(|(t, _)| t.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&texts).await?
        };
        if embeddings.len() != texts.len() {
            return Err(KnowledgeError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let chunks: Vec<Arc<KnowledgeChunk>> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ordinal, ((text, source), embedding))| {
                Arc::new(KnowledgeChunk {
                    text,
                    source,
                    embedding,
                    ordinal,
                })
            })
            .collect();

        info!(
            documents = document_count,
            chunks = chunks.len(),
            embedder = embedder.name(),
            "Knowledge index built"
        );

        Ok(Self {
            chunks,
            documents: document_count,
            embedder,
        })
    }

    /// Number of distinct source files.
    pub fn document_count(&self) -> usize {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Arc<KnowledgeChunk>] {
        &self.chunks
    }

    /// Top `k` chunks by cosine similarity to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        if k == 0 {
            return Err(KnowledgeError::InvalidQuery("k must be at least 1".into()));
        }
        if query.trim().is_empty() {
            return Err(KnowledgeError::InvalidQuery("query is empty".into()));
        }
        if self.chunks.is_empty() {
            return Err(KnowledgeError::StoreUnavailable);
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let ranked = vector::top_k(
            &query_vector,
            self.chunks.iter().map(|c| c.embedding.as_slice()),
            k,
        );

        debug!(query, k, hits = ranked.len(), "Knowledge search");

        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                chunk: Arc::clone(&self.chunks[idx]),
                score,
            })
            .collect())
    }
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("documents", &self.documents)
            .field("chunks", &self.chunks.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}
