//! External collaborator traits: embedding and completion services.
//!
//! An async trait the pipeline depends on abstractly, with mock
//! implementations for tests and HTTP-backed implementations
//! (`http_services.rs`) for production.

use async_trait::async_trait;

use crate::error::EngineResult;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> EngineResult<String>;
}

/// Deterministic mock embedder for tests: hashes tokens into a fixed-width
/// vector so semantically similar short strings produce similar vectors
/// without depending on a real model.
pub struct MockEmbeddingService {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, word) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hash: u64 = 1469598103934665603;
            for b in word.bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let slot = (hash as usize) % self.dimension;
            vector[slot] += 1.0 / (i as f32 + 1.0);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

/// Mock completion service used in tests and as a degraded-mode fallback
/// when no real completion backend is configured.
pub struct MockCompletionService;

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        prompt: &str,
        _model: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> EngineResult<String> {
        Ok(format!("[mock answer for prompt of {} chars]", prompt.len()))
    }
}
