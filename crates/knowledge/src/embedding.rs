//! Embedders turn text into fixed-size vectors for similarity search.

use async_trait::async_trait;
use fitcoach_core::error::KnowledgeError;
use fitcoach_core::provider::{EmbeddingRequest, Provider};
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// A short name for logs and status output.
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;

    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KnowledgeError::Embedding("embedder returned no vector".into()))
    }
}

/// Deterministic, offline embedder using signed feature hashing.
///
/// Each lowercased word and each character trigram of a word is hashed into
/// one of `dimensions` buckets; the vector is L2-normalized. Texts sharing
/// vocabulary (including inflections like "squat"/"squats") score high.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

const TRIGRAM_WEIGHT: f32 = 0.5;

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in tokenize(text) {
            self.add_feature(&mut vector, &word, 1.0);

            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for trigram in padded.windows(3) {
                let gram: String = trigram.iter().collect();
                self.add_feature(&mut vector, &gram, TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Uses a completion provider's embeddings endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    batch_size: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            batch_size: 64,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                })
                .await
                .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;

            if response.embeddings.len() != batch.len() {
                return Err(KnowledgeError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            vectors.extend(response.embeddings);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;
    use fitcoach_core::error::ProviderError;
    use fitcoach_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    #[test]
    fn hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("Protein after workouts");
        let b = embedder.embed_text("protein AFTER workouts");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_text("how many squats");
        let related = embedder.embed_text("Squats strengthen the quadriceps and glutes.");
        let unrelated = embedder.embed_text("Drink water and sleep eight hours.");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(8).embed_text("  ...  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    struct FakeEmbeddings;

    #[async_trait]
    impl Provider for FakeEmbeddings {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("no chat".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: request
                    .inputs
                    .iter()
                    .map(|t| vec![t.len() as f32, 1.0])
                    .collect(),
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn provider_embedder_batches_in_order() {
        let embedder = ProviderEmbedder::new(Arc::new(FakeEmbeddings), "embed-small").with_batch_size(2);
        let texts: Vec<String> = ["a", "bb", "ccc"].iter().map(|s| s.to_string()).collect();
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[2][0], 3.0);
    }
}
