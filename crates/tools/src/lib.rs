//! Tool implementations for FitCoach.
//!
//! The coach exposes a single tool to the model, `fitness_knowledge`,
//! backed by the knowledge base. The registry stays open for more.

pub mod knowledge_search;

pub use knowledge_search::{FITNESS_KNOWLEDGE, KnowledgeSearchTool};

use fitcoach_config::Locale;
use fitcoach_core::tool::ToolRegistry;
use fitcoach_knowledge::Retriever;
use std::sync::Arc;

/// Build the coach's tool registry.
///
/// Without a retriever (no knowledge available) the registry is empty and
/// the model answers from its own knowledge.
pub fn coach_registry(
    retriever: Option<Arc<dyn Retriever>>,
    top_k: usize,
    locale: &'static Locale,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    if let Some(retriever) = retriever {
        registry.register(Box::new(
            KnowledgeSearchTool::new(retriever, locale).with_top_k(top_k),
        ));
    }
    registry
}
