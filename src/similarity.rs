//! Exact k-NN cosine similarity over an L2-normalized embedding matrix.
//!
//! Embeddings are normalized once at build time so cosine similarity reduces
//! to a dot product at query time.

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityIndex {
    dim: usize,
    // row-major, L2-normalized
    vectors: Vec<f32>,
}

impl SimilarityIndex {
    pub fn build(embeddings: Vec<Vec<f32>>) -> Self {
        let dim = embeddings.first().map(|v| v.len()).unwrap_or(0);
        let mut vectors = Vec::with_capacity(embeddings.len() * dim);
        for embedding in embeddings {
            let norm = (embedding.iter().map(|x| x * x).sum::<f32>()).sqrt();
            if norm > 1e-12 {
                vectors.extend(embedding.iter().map(|x| x / norm));
            } else {
                vectors.extend(embedding.iter());
            }
        }
        Self { dim, vectors }
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn row(&self, index: ChunkIndex) -> &[f32] {
        let start = index as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Cosine similarity between a (not necessarily normalized) query vector
    /// and the stored row at `index`.
    pub fn similarity_to_query(&self, query: &[f32], index: ChunkIndex) -> f32 {
        let row = self.row(index);
        let query_norm = (query.iter().map(|x| x * x).sum::<f32>()).sqrt();
        if query_norm < 1e-12 {
            return 0.0;
        }
        let dot: f32 = row.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
        dot / query_norm
    }

    pub fn similarity_between(&self, a: ChunkIndex, b: ChunkIndex) -> f32 {
        let row_a = self.row(a);
        let row_b = self.row(b);
        row_a.iter().zip(row_b.iter()).map(|(x, y)| x * y).sum()
    }

    /// Returns the top-k most similar chunk indices to `query`, sorted
    /// descending by score. Exact, not approximate — acceptable at the
    /// corpus scale this engine targets.
    pub fn find_similar(&self, query: &[f32], top_k: usize) -> Vec<(ChunkIndex, f32)> {
        let mut scored: Vec<(ChunkIndex, f32)> = (0..self.len() as u32)
            .map(|idx| (idx, self.similarity_to_query(query, idx)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Like `find_similar`, but scores only `candidates` instead of the
    /// whole index — used when a year or category prefilter has already
    /// narrowed the search space, so a full N-length score vector is never
    /// materialized.
    pub fn find_similar_filtered(
        &self,
        query: &[f32],
        top_k: usize,
        candidates: &[ChunkIndex],
    ) -> Vec<(ChunkIndex, f32)> {
        let mut scored: Vec<(ChunkIndex, f32)> = candidates
            .iter()
            .map(|&idx| (idx, self.similarity_to_query(query, idx)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    pub fn find_similar_to_node(&self, node: ChunkIndex, top_k: usize) -> Vec<(ChunkIndex, f32)> {
        let row = self.row(node).to_vec();
        let mut scored: Vec<(ChunkIndex, f32)> = (0..self.len() as u32)
            .filter(|&idx| idx != node)
            .map(|idx| (idx, self.similarity_between(node, idx)))
            .collect();
        let _ = row;
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
