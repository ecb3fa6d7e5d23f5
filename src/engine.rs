//! Construction of the shared, immutable query-time structures.
//!
//! `KnowledgeEngine::build` runs once after ingestion and embedding: it
//! builds the similarity index, discovers and types edges, detects
//! communities, computes structural roles, and (optionally) summarizes
//! communities. The result is held behind an `Arc` for the lifetime of the
//! process — every query borrows it read-only, never mutates it.

use std::sync::Arc;

use crate::bm25::Bm25Index;
use crate::chunk::Chunk;
use crate::community::{build_communities, detect_communities_adaptive};
use crate::community_summary::{assign_hub_ids, summarize_communities};
use crate::config::EngineConfig;
use crate::edges::discover_edges;
use crate::error::{EngineError, EngineResult};
use crate::graph::KnowledgeGraph;
use crate::hubs_bridges::{betweenness_centrality, classify_roles, pagerank};
use crate::services::CompletionService;
use crate::similarity::SimilarityIndex;

/// Everything a query needs that doesn't change between queries: the chunk
/// corpus, its dense and sparse indices, and the knowledge graph built over
/// it (edges, communities, structural roles).
pub struct KnowledgeEngine {
    pub chunks: Vec<Chunk>,
    pub similarity: SimilarityIndex,
    pub bm25: Bm25Index,
    pub graph: KnowledgeGraph,
    pub config: EngineConfig,
}

impl KnowledgeEngine {
    /// Builds the engine from ingested chunks and their pre-computed
    /// embeddings (embedding inference itself is out of scope here — see
    /// `EmbeddingService`). `embeddings[i]` must correspond to `chunks[i]`.
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>, config: EngineConfig) -> EngineResult<Self> {
        if chunks.len() != embeddings.len() {
            return Err(EngineError::invariant(
                "chunk count and embedding count must match",
            ));
        }
        for embedding in &embeddings {
            if !embedding.is_empty() && embedding.len() != config.embedding_dimension {
                return Err(EngineError::invariant(
                    "embedding dimension does not match configured embedding_dimension",
                ));
            }
        }

        let mut chunks = chunks;
        for (i, embedding) in embeddings.iter().enumerate() {
            if !embedding.is_empty() {
                chunks[i].embedding_index = Some(i as u32);
            }
        }

        let similarity = SimilarityIndex::build(embeddings);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let bm25 = Bm25Index::build(&texts);

        let edges = discover_edges(&chunks, &similarity, &config);
        let mut graph = KnowledgeGraph::new(chunks.len(), edges);

        let raw_assignment = detect_communities_adaptive(&graph, &config);
        let (assignment, communities) = build_communities(&graph, &chunks, &raw_assignment, &config);
        graph.set_communities(assignment, communities);

        let betweenness = betweenness_centrality(&graph);
        let node_pagerank = pagerank(&graph);
        let roles = classify_roles(&graph, &betweenness, &config);
        graph.set_structural_roles(roles.roles, roles.is_bridge, betweenness);
        graph.set_pagerank(node_pagerank);

        let mut communities = std::mem::take(&mut graph.communities);
        assign_hub_ids(&mut communities, &graph);
        graph.communities = communities;

        Ok(Self { chunks, similarity, bm25, graph, config })
    }

    /// Populates (or refreshes, where the content hash changed) every
    /// community's summary via the completion service. Separate from
    /// `build` since summarization is async and LLM-backed, while
    /// everything else in construction is pure computation.
    pub async fn summarize_communities(&mut self, completion: &dyn CompletionService) {
        summarize_communities(&mut self.graph.communities, &self.chunks, completion, &self.config).await;
    }
}

pub type SharedEngine = Arc<KnowledgeEngine>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockCompletionService;

    fn sample_chunks() -> (Vec<Chunk>, Vec<Vec<f32>>) {
        let chunks = vec![
            Chunk::new("d1", "rust ownership rules explained", "learning", 0).with_years(vec![2021]),
            Chunk::new("d1", "borrowing follows from ownership", "learning", 1).with_ordinal(1, 2),
            Chunk::new("d2", "a recipe for pasta dinner", "personal", 2),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![0.95, 0.05], vec![0.0, 1.0]];
        (chunks, embeddings)
    }

    #[test]
    fn build_produces_a_graph_with_matching_node_count() {
        let (chunks, embeddings) = sample_chunks();
        let config = EngineConfig::default();
        let engine = KnowledgeEngine::build(chunks, embeddings, config).unwrap();
        assert_eq!(engine.graph.node_count, 3);
    }

    #[test]
    fn mismatched_chunk_and_embedding_counts_is_an_error() {
        let (chunks, mut embeddings) = sample_chunks();
        embeddings.pop();
        let config = EngineConfig::default();
        assert!(KnowledgeEngine::build(chunks, embeddings, config).is_err());
    }

    #[tokio::test]
    async fn summarize_communities_runs_without_panicking() {
        let (chunks, embeddings) = sample_chunks();
        let mut config = EngineConfig::default();
        config.min_community_size = 1;
        let mut engine = KnowledgeEngine::build(chunks, embeddings, config).unwrap();
        engine.summarize_communities(&MockCompletionService).await;
    }
}
