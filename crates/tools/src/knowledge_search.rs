//! Fitness knowledge search — the retrieval tool.
//!
//! Looks up the top-k chunks for the model's query and returns them as one
//! numbered text block. Missing knowledge never fails the call: the model
//! gets a readable explanation instead and can answer from what it knows.

use async_trait::async_trait;
use fitcoach_config::Locale;
use fitcoach_core::error::{KnowledgeError, ToolError};
use fitcoach_core::tool::{Tool, ToolResult};
use fitcoach_knowledge::{Retriever, ScoredChunk};
use std::sync::Arc;
use tracing::{debug, warn};

/// The tool name the model uses.
pub const FITNESS_KNOWLEDGE: &str = "fitness_knowledge";

/// Placed between chunks in the tool output.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

pub struct KnowledgeSearchTool {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    locale: &'static Locale,
}

impl KnowledgeSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>, locale: &'static Locale) -> Self {
        Self {
            retriever,
            top_k: 3,
            locale,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    fn format_hits(&self, hits: &[ScoredChunk]) -> String {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "[{}] {}: {}\n{}",
                    i + 1,
                    self.locale.source_label,
                    hit.chunk.source,
                    hit.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR)
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        FITNESS_KNOWLEDGE
    }

    fn description(&self) -> &str {
        self.locale.retriever_description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": self.locale.query_description
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        match self.retriever.retrieve(query, self.top_k).await {
            Ok(hits) if hits.is_empty() => Ok(ToolResult::ok(self.locale.no_results)),
            Ok(hits) => {
                debug!(query, hits = hits.len(), "Knowledge search hit");
                Ok(ToolResult::ok(self.format_hits(&hits)))
            }
            Err(KnowledgeError::StoreUnavailable) => Ok(ToolResult::ok(self.locale.no_results)),
            Err(e) => {
                warn!(query, error = %e, "Knowledge search failed");
                Ok(ToolResult::failed(format!(
                    "{} ({e})",
                    self.locale.no_results
                )))
            }
        }
    }
}
