//! Top-level retrieval orchestrator: prefilter, hybrid score, graph
//! expansion, and chronological reordering for temporal queries.

use tracing::debug;

use crate::bm25::Bm25Index;
use crate::chunk::{Chunk, ChunkIndex};
use crate::config::EngineConfig;
use crate::graph::{EdgeType, KnowledgeGraph};
use crate::hybrid_retriever::HybridRetriever;
use crate::prefilter::prefilter_candidates;
use crate::query::QueryPlan;
use crate::retrieval_types::{RetrievalConfidence, RetrievalResult, ScoredChunk};
use crate::similarity::SimilarityIndex;

pub struct RetrievalEngine<'a> {
    pub chunks: &'a [Chunk],
    pub similarity: &'a SimilarityIndex,
    pub bm25: &'a Bm25Index,
    pub graph: &'a KnowledgeGraph,
    pub config: &'a EngineConfig,
}

impl<'a> RetrievalEngine<'a> {
    pub fn retrieve(&self, query_embedding: &[f32], plan: &QueryPlan, now_day: i64) -> RetrievalResult {
        let candidates = prefilter_candidates(self.chunks, plan, self.config);
        debug!(n_candidates = candidates.len(), "prefiltered candidate set");

        let retriever = HybridRetriever {
            chunks: self.chunks,
            similarity: self.similarity,
            bm25: self.bm25,
            config: self.config,
        };

        let mut result = retriever.retrieve(query_embedding, plan, &candidates, now_day);

        if result.chunks.len() < plan.min_docs && candidates.len() < self.chunks.len() {
            debug!("prefiltered result too sparse, falling back to full corpus search");
            let all: Vec<ChunkIndex> = (0..self.chunks.len() as u32).collect();
            result = retriever.retrieve(query_embedding, plan, &all, now_day);
        }

        if self.config.community_aware_retrieval && !result.chunks.is_empty() {
            self.apply_community_boost(&mut result);
        }

        if self.config.enable_graph_expansion && !result.chunks.is_empty() {
            self.expand_with_graph(&mut result, query_embedding, plan);
        }

        if plan.chronological_order {
            self.apply_chronological_order(&mut result);
        }

        result
    }

    /// Pulls in neighbors of the top-5 retrieved chunks via admitted edge
    /// types, rescoring each candidate against the query before admitting it
    /// at a discount — a neighbor is corroborating context, not a direct
    /// match, so it never outranks a directly retrieved chunk.
    fn expand_with_graph(
        &self,
        result: &mut RetrievalResult,
        query_embedding: &[f32],
        plan: &QueryPlan,
    ) {
        let admitted_types: Vec<EdgeType> = self
            .config
            .graph_expansion_edge_types
            .iter()
            .filter_map(|s| EdgeType::parse(s))
            .collect();
        if admitted_types.is_empty() {
            return;
        }

        let already_present: std::collections::HashSet<ChunkIndex> =
            result.chunks.iter().map(|c| c.chunk_index).collect();

        let top_candidates: Vec<ChunkIndex> = result
            .chunks
            .iter()
            .take(5)
            .map(|c| c.chunk_index)
            .collect();

        let mut expanded = Vec::new();
        for &node in &top_candidates {
            let neighbors = self.graph.neighbors_by_types(node, &admitted_types);
            for (neighbor, _edge) in neighbors.into_iter().take(self.config.graph_expansion_max_neighbors) {
                if already_present.contains(&neighbor) || expanded.iter().any(|s: &ScoredChunk| s.chunk_index == neighbor) {
                    continue;
                }
                let dense_score = self.similarity.similarity_to_query(query_embedding, neighbor);
                if dense_score < self.config.graph_expansion_min_score {
                    continue;
                }
                let chunk = &self.chunks[neighbor as usize];
                let year_matched = plan
                    .filters
                    .year
                    .as_ref()
                    .map(|yf| yf.years.iter().any(|&y| chunk.matches_year(y)))
                    .unwrap_or(false);
                let category_matched = plan
                    .filters
                    .category
                    .as_ref()
                    .map(|cat| &chunk.category == cat)
                    .unwrap_or(false);
                let discounted = dense_score * self.config.graph_expansion_discount;
                expanded.push(ScoredChunk {
                    chunk_index: neighbor,
                    dense_score,
                    sparse_score: 0.0,
                    combined_score: discounted,
                    final_score: discounted,
                    year_boost: 0.0,
                    category_boost: 0.0,
                    year_matched,
                    category_matched,
                    temporal_weight: 1.0,
                    trust_score: crate::hybrid_retriever::compute_trust_score(chunk, self.config),
                    from_graph_expansion: true,
                    rank: 0,
                });
            }
        }

        result.expanded_via_graph = expanded.len();
        result.chunks.extend(expanded);
        result
            .chunks
            .sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
        result.chunks.truncate(plan.max_docs);
        result.assign_ranks();

        if matches!(result.confidence, RetrievalConfidence::NoResults) && !result.chunks.is_empty() {
            result.confidence = RetrievalConfidence::LowMatch;
        }
    }

    /// Boosts chunks that share the top result's community (the query's
    /// apparent topical neighborhood) and chunks flagged as structural
    /// bridges, on the theory that a bridge node is more likely to connect
    /// the query's topic to useful adjacent context. A no-op relative
    /// ordering when no community/role structure has been computed yet,
    /// since every chunk then shares community 0 and no bridge flags.
    fn apply_community_boost(&self, result: &mut RetrievalResult) {
        if self.graph.node_count == 0 {
            return;
        }
        let top_community = self.graph.community_of(result.chunks[0].chunk_index);
        for chunk in result.chunks.iter_mut() {
            let mut multiplier = 1.0f32;
            if self.graph.community_of(chunk.chunk_index) == top_community {
                multiplier += self.config.community_boost;
            }
            if self.graph.is_bridge(chunk.chunk_index) {
                multiplier += self.config.bridge_boost;
            }
            chunk.final_score *= multiplier;
        }
        result
            .chunks
            .sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
        result.assign_ranks();
    }

    fn apply_chronological_order(&self, result: &mut RetrievalResult) {
        result.chunks.sort_by_key(|c| self.chunks[c.chunk_index as usize].created_at_day);
        result.assign_ranks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use crate::query::ExtractedFilters;

    fn plan() -> QueryPlan {
        QueryPlan {
            raw_query: "q".to_string(),
            query_type: crate::query::QueryType::Specific,
            intent: crate::query::QueryIntent::Factual,
            difficulty: crate::query::QueryDifficulty::Easy,
            classification_confidence: 0.8,
            complexity_score: 0.1,
            filters: ExtractedFilters::default(),
            expansion_terms: vec![],
            min_docs: 1,
            max_docs: 10,
            year_prefilter_range: 0,
            chronological_order: false,
        }
    }

    #[test]
    fn empty_corpus_yields_no_results() {
        let chunks: Vec<Chunk> = vec![];
        let similarity = SimilarityIndex::build(vec![]);
        let bm25 = Bm25Index::build(&[]);
        let graph = KnowledgeGraph::new(0, vec![]);
        let config = EngineConfig::default();
        let engine = RetrievalEngine {
            chunks: &chunks,
            similarity: &similarity,
            bm25: &bm25,
            graph: &graph,
            config: &config,
        };
        let result = engine.retrieve(&[1.0, 0.0], &plan(), 0);
        assert!(result.is_empty());
        assert_eq!(result.confidence, crate::retrieval_types::RetrievalConfidence::NoResults);
    }

    #[test]
    fn graph_expansion_adds_discounted_neighbor() {
        let chunks = vec![
            Chunk::new("d1", "rust ownership", "learning", 0),
            Chunk::new("d2", "related neighbor chunk", "learning", 0),
        ];
        let similarity = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![0.9, 0.1]]);
        let bm25 = Bm25Index::build(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
        let edges = vec![Edge {
            source: 0,
            target: 1,
            edge_type: EdgeType::Supports,
            weight: 0.9,
            origin: crate::graph::EdgeOrigin::Knn,
            similarity: 0.9,
        }];
        let graph = KnowledgeGraph::new(2, edges);
        let config = EngineConfig::default();
        let engine = RetrievalEngine {
            chunks: &chunks,
            similarity: &similarity,
            bm25: &bm25,
            graph: &graph,
            config: &config,
        };
        let mut p = plan();
        p.max_docs = 5;
        let result = engine.retrieve(&[1.0, 0.0], &p, 0);
        assert!(result.chunks.iter().any(|c| c.chunk_index == 1));
    }
}
