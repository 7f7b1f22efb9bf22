//! Knowledge store for FitCoach.
//!
//! Pipeline, run once per process:
//! - [`DocumentSource`] — load documents (directory of PDFs/text, or in-memory)
//! - [`RecursiveSplitter`] — split them into overlapping chunks
//! - [`Embedder`] — turn chunks and queries into vectors
//! - [`KnowledgeStore`] — immutable index answering top-k cosine searches
//!
//! [`KnowledgeBase`] owns the pipeline and guarantees the index is built at
//! most once, even when many callers ask for it concurrently.

pub mod base;
pub mod document;
pub mod embedding;
pub mod splitter;
pub mod store;
pub mod vector;

pub use base::{KnowledgeBase, Retriever};
pub use document::{DirectoryLoader, Document, DocumentSource, SourceLocator, StaticDocuments};
pub use embedding::{Embedder, HashingEmbedder, ProviderEmbedder};
pub use splitter::RecursiveSplitter;
pub use store::{KnowledgeChunk, KnowledgeStore, ScoredChunk};
