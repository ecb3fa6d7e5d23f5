//! Hybrid dense+sparse retrieval: score fusion, temporal decay, trust
//! scoring, and boosting. This is the scoring core of the retrieval engine;
//! `retrieval_engine.rs` wraps it with prefiltering, graph expansion, and
//! chronological ordering.

use std::collections::HashMap;

use crate::bm25::Bm25Index;
use crate::chunk::{Chunk, ChunkIndex};
use crate::config::{EngineConfig, ScoringMode};
use crate::query::{QueryPlan, QueryType};
use crate::retrieval_types::{RetrievalConfidence, RetrievalResult, ScoredChunk};
use crate::similarity::SimilarityIndex;

const MID_YEAR_DAY: i64 = 182; // July 1st, used when a chunk has no exact timestamp

fn source_reliability(category: &str) -> f32 {
    match category {
        "learning" => 0.9,
        "ai_ml" => 0.9,
        "personal" => 0.85,
        "technical" => 0.85,
        "ideas" => 0.8,
        "philosophy" => 0.8,
        "saved" => 0.75,
        _ => 0.7,
    }
}

/// `T = user_confirmation_weight * user_confirmation + source_reliability_weight * reliability`
pub fn compute_trust_score(chunk: &Chunk, config: &EngineConfig) -> f32 {
    // Absent an explicit confirmation signal, default to 0.5 rather than 0.0
    // or 1.0 — an un-reviewed chunk is neither trusted nor distrusted.
    let confirmation = if chunk.user_confirmed { 1.0 } else { 0.5 };
    let reliability = source_reliability(&chunk.category);
    config.user_confirmation_weight * confirmation + config.source_reliability_weight * reliability
}

/// `exp(-lambda * delta_days)`, clamped to 1.0 for chunks in the future
/// relative to `now_day` and floored at 0.01 so old chunks never vanish
/// entirely from ranking.
pub fn compute_temporal_decay(chunk_day: i64, now_day: i64, config: &EngineConfig) -> f64 {
    if !config.enable_temporal_decay {
        return 1.0;
    }
    let delta = (now_day - chunk_day).max(0) as f64;
    let decay = (-config.temporal_decay_rate * delta).exp();
    decay.max(0.01).min(1.0)
}

pub fn chunk_day_or_mid_year(chunk: &Chunk) -> i64 {
    if chunk.created_at_day == 0 {
        MID_YEAR_DAY
    } else {
        chunk.created_at_day
    }
}

fn blended_weights(query_type: QueryType, _config: &EngineConfig) -> (f32, f32) {
    match query_type {
        QueryType::Specific => (0.5, 0.5),
        QueryType::Synthesis | QueryType::Exploratory => (0.7, 0.3),
        QueryType::Temporal => (0.55, 0.45),
        QueryType::Comparison => (0.6, 0.4),
    }
}

fn rrf_k(n_candidates: usize, config: &EngineConfig) -> u32 {
    if config.adaptive_rrf_k {
        ((n_candidates as f64 * config.rrf_k_ratio).round() as u32).max(10)
    } else {
        config.rrf_k_constant
    }
}

fn ranks_desc(scores: &[(ChunkIndex, f32)]) -> HashMap<ChunkIndex, usize> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, (idx, _))| (idx, rank + 1))
        .collect()
}

struct FusedScore {
    chunk_index: ChunkIndex,
    dense: f32,
    sparse: f32,
    combined: f32,
}

fn fuse_blended(
    dense: &[(ChunkIndex, f32)],
    sparse: &[(ChunkIndex, f32)],
    query_type: QueryType,
    config: &EngineConfig,
) -> Vec<FusedScore> {
    let (w_dense, w_sparse) = blended_weights(query_type, config);
    let sparse_map: HashMap<ChunkIndex, f32> = sparse.iter().cloned().collect();

    dense
        .iter()
        .map(|&(idx, dense_score)| {
            let sparse_score = *sparse_map.get(&idx).unwrap_or(&0.0);
            FusedScore {
                chunk_index: idx,
                dense: dense_score,
                sparse: sparse_score,
                combined: w_dense * dense_score + w_sparse * sparse_score,
            }
        })
        .collect()
}

fn fuse_rrf(
    dense: &[(ChunkIndex, f32)],
    sparse: &[(ChunkIndex, f32)],
    config: &EngineConfig,
) -> Vec<FusedScore> {
    let k = rrf_k(dense.len().max(sparse.len()), config) as f32;
    let dense_ranks = ranks_desc(dense);
    let sparse_ranks = ranks_desc(sparse);
    let dense_map: HashMap<ChunkIndex, f32> = dense.iter().cloned().collect();
    let sparse_map: HashMap<ChunkIndex, f32> = sparse.iter().cloned().collect();

    let mut all_indices: Vec<ChunkIndex> = dense_ranks.keys().cloned().collect();
    for idx in sparse_ranks.keys() {
        if !dense_ranks.contains_key(idx) {
            all_indices.push(*idx);
        }
    }

    all_indices
        .into_iter()
        .map(|idx| {
            let dense_rank = *dense_ranks.get(&idx).unwrap_or(&(dense.len() + 1000));
            let sparse_rank = *sparse_ranks.get(&idx).unwrap_or(&(sparse.len() + 1000));
            let rrf_score = config.dense_weight / (k + dense_rank as f32)
                + config.sparse_weight / (k + sparse_rank as f32);
            FusedScore {
                chunk_index: idx,
                dense: *dense_map.get(&idx).unwrap_or(&0.0),
                sparse: *sparse_map.get(&idx).unwrap_or(&0.0),
                combined: rrf_score,
            }
        })
        .collect()
}

struct Boosted {
    fused: FusedScore,
    year_boost: f32,
    category_boost: f32,
    year_matched: bool,
    category_matched: bool,
}

/// Boosting is gated on a minimum dense relevance so low-signal matches
/// aren't inflated by year/category coincidence alone. Blended mode applies
/// boosts multiplicatively; RRF mode applies them additively since RRF
/// scores are already on a very different scale than cosine similarity.
fn apply_boosting(
    fused: Vec<FusedScore>,
    chunks: &[Chunk],
    plan: &QueryPlan,
    config: &EngineConfig,
) -> Vec<Boosted> {
    fused
        .into_iter()
        .map(|mut item| {
            let chunk = &chunks[item.chunk_index as usize];

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

            if item.dense < config.semantic_relevance_threshold {
                return Boosted {
                    fused: item,
                    year_boost: 0.0,
                    category_boost: 0.0,
                    year_matched,
                    category_matched,
                };
            }

            let year_boost = if year_matched { config.year_match_boost } else { 0.0 };
            let category_boost = if category_matched { config.category_match_boost } else { 0.0 };

            if year_boost > 0.0 || category_boost > 0.0 {
                item.combined = match config.scoring_mode {
                    ScoringMode::Blended => item.combined * (1.0 + year_boost) * (1.0 + category_boost),
                    ScoringMode::Rrf => item.combined + year_boost + category_boost,
                };
            }

            Boosted { fused: item, year_boost, category_boost, year_matched, category_matched }
        })
        .collect()
}

fn determine_confidence(
    results: &[ScoredChunk],
    year_filter_present: bool,
    config: &EngineConfig,
) -> RetrievalConfidence {
    if results.is_empty() {
        return RetrievalConfidence::NoResults;
    }
    let year_matched = results.iter().filter(|r| r.year_matched).count();

    if year_filter_present {
        // The filter is satisfied the moment at least one candidate matches
        // the requested year — confidence here communicates whether the
        // constraint was met at all, not what fraction of results honor it.
        if year_matched >= config.min_year_matched_for_confidence {
            return RetrievalConfidence::YearMatched;
        }
        return RetrievalConfidence::PartialMatch;
    }

    if results.len() >= config.min_results_for_good_confidence {
        RetrievalConfidence::GoodMatch
    } else {
        RetrievalConfidence::LowMatch
    }
}

pub struct HybridRetriever<'a> {
    pub chunks: &'a [Chunk],
    pub similarity: &'a SimilarityIndex,
    pub bm25: &'a Bm25Index,
    pub config: &'a EngineConfig,
}

impl<'a> HybridRetriever<'a> {
    pub fn retrieve(
        &self,
        query_embedding: &[f32],
        plan: &QueryPlan,
        candidates: &[ChunkIndex],
        now_day: i64,
    ) -> RetrievalResult {
        let strategy_name = match self.config.scoring_mode {
            ScoringMode::Blended => "blended",
            ScoringMode::Rrf => "rrf",
        }
        .to_string();

        if candidates.is_empty() {
            return RetrievalResult {
                query: plan.raw_query.clone(),
                strategy_name,
                chunks: Vec::new(),
                total_candidates_considered: 0,
                retrieval_time_ms: 0,
                filters_applied: plan.filters.clone(),
                confidence: RetrievalConfidence::NoResults,
                used_year_prefilter: false,
                expanded_via_graph: 0,
            };
        }

        let dense: Vec<(ChunkIndex, f32)> = self
            .similarity
            .find_similar_filtered(query_embedding, candidates.len(), candidates)
            .into_iter()
            .map(|(idx, score)| (idx, score.max(0.0)))
            .collect();

        // BM25 intentionally runs over the full corpus, not the year-restricted
        // candidate set: a keyword hit outside the prefilter window shouldn't be
        // invisible to fusion just because the dense side was narrowed.
        let expanded_query = plan.expanded_query();
        let sparse_all = self.bm25.score_all_normalized(&expanded_query);
        let sparse: Vec<(ChunkIndex, f32)> = candidates
            .iter()
            .map(|&idx| (idx, sparse_all[idx as usize]))
            .collect();

        let fused = match self.config.scoring_mode {
            ScoringMode::Blended => fuse_blended(&dense, &sparse, plan.query_type, self.config),
            ScoringMode::Rrf => fuse_rrf(&dense, &sparse, self.config),
        };

        let mut boosted = apply_boosting(fused, self.chunks, plan, self.config);

        let mut scored: Vec<ScoredChunk> = boosted
            .drain(..)
            .map(|b| {
                let chunk = &self.chunks[b.fused.chunk_index as usize];
                let trust_score = compute_trust_score(chunk, self.config);
                let mut final_score = b.fused.combined;

                if self.config.enable_trust_filtering && trust_score < self.config.trust_threshold {
                    final_score *= 0.5;
                }

                let temporal_weight =
                    compute_temporal_decay(chunk_day_or_mid_year(chunk), now_day, self.config);
                final_score *= temporal_weight as f32;

                ScoredChunk {
                    chunk_index: b.fused.chunk_index,
                    dense_score: b.fused.dense,
                    sparse_score: b.fused.sparse,
                    combined_score: b.fused.combined,
                    final_score,
                    year_boost: b.year_boost,
                    category_boost: b.category_boost,
                    year_matched: b.year_matched,
                    category_matched: b.category_matched,
                    temporal_weight,
                    trust_score,
                    from_graph_expansion: false,
                    rank: 0,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));

        let year_filter_present = plan.filters.year.is_some();

        // Year-matched results sort first when a year filter is active, so
        // truncation to max_docs never drops an exact match in favor of a
        // higher-scoring but year-mismatched chunk.
        if year_filter_present {
            scored.sort_by(|a, b| b.year_matched.cmp(&a.year_matched).then(
                b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal),
            ));
        }

        scored.truncate(plan.max_docs);

        let confidence = determine_confidence(&scored, year_filter_present, self.config);

        let mut result = RetrievalResult {
            query: plan.raw_query.clone(),
            strategy_name,
            chunks: scored,
            total_candidates_considered: candidates.len(),
            retrieval_time_ms: 0,
            filters_applied: plan.filters.clone(),
            confidence,
            used_year_prefilter: candidates.len() < self.chunks.len(),
            expanded_via_graph: 0,
        };
        result.assign_ranks();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ExtractedFilters;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("d1", "rust ownership and borrowing rules", "learning", 182)
                .with_years(vec![2021]),
            Chunk::new("d2", "cooking pasta dinner recipe", "personal", 182),
        ]
    }

    fn sample_plan() -> QueryPlan {
        QueryPlan {
            raw_query: "rust ownership".to_string(),
            query_type: QueryType::Specific,
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
    fn retrieves_relevant_chunk_first() {
        let chunks = sample_chunks();
        let similarity = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let bm25 = Bm25Index::build(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
        let config = EngineConfig::default();
        let retriever = HybridRetriever { chunks: &chunks, similarity: &similarity, bm25: &bm25, config: &config };

        let plan = sample_plan();
        let result = retriever.retrieve(&[1.0, 0.0], &plan, &[0, 1], 182);
        assert_eq!(result.chunks[0].chunk_index, 0);
        assert_eq!(result.chunks[0].rank, 1);
    }

    #[test]
    fn temporal_decay_never_reaches_zero() {
        let config = EngineConfig::default();
        let decay = compute_temporal_decay(0, 100_000, &config);
        assert!(decay >= 0.01);
    }

    #[test]
    fn future_chunk_decay_is_clamped_to_one() {
        let config = EngineConfig::default();
        let decay = compute_temporal_decay(500, 100, &config);
        assert_eq!(decay, 1.0);
    }

    #[test]
    fn single_year_match_is_enough_for_year_matched_confidence() {
        let chunks = vec![
            Chunk::new("d1", "rust ownership", "learning", 182).with_years(vec![2021]),
            Chunk::new("d2", "rust ownership too", "learning", 182).with_years(vec![1999]),
        ];
        let similarity = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0]]);
        let bm25 = Bm25Index::build(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
        let config = EngineConfig::default();
        let retriever = HybridRetriever { chunks: &chunks, similarity: &similarity, bm25: &bm25, config: &config };
        let mut plan = sample_plan();
        plan.filters.year = Some(crate::query::YearFilter { years: vec![2021], strict: false, is_range: false });
        let result = retriever.retrieve(&[1.0, 0.0], &plan, &[0, 1], 182);
        assert_eq!(result.confidence, RetrievalConfidence::YearMatched);
    }

    #[test]
    fn blended_boosting_composes_year_and_category_boosts_multiplicatively() {
        let chunks = vec![Chunk::new("d1", "rust ownership", "learning", 182).with_years(vec![2021])];
        let config = EngineConfig::default();
        let mut plan = sample_plan();
        plan.filters.year = Some(crate::query::YearFilter { years: vec![2021], strict: false, is_range: false });
        plan.filters.category = Some("learning".to_string());

        let fused = vec![FusedScore { chunk_index: 0, dense: 0.8, sparse: 0.0, combined: 1.0 }];
        let boosted = apply_boosting(fused, &chunks, &plan, &config);

        let expected = 1.0 * (1.0 + config.year_match_boost) * (1.0 + config.category_match_boost);
        assert_eq!(boosted[0].fused.combined, expected);
    }

    #[test]
    fn rrf_boosting_is_additive_without_extra_scaling() {
        let chunks = vec![Chunk::new("d1", "rust ownership", "learning", 182).with_years(vec![2021])];
        let mut config = EngineConfig::default();
        config.scoring_mode = crate::config::ScoringMode::Rrf;
        let mut plan = sample_plan();
        plan.filters.year = Some(crate::query::YearFilter { years: vec![2021], strict: false, is_range: false });
        plan.filters.category = Some("learning".to_string());

        let fused = vec![FusedScore { chunk_index: 0, dense: 0.8, sparse: 0.0, combined: 1.0 }];
        let boosted = apply_boosting(fused, &chunks, &plan, &config);

        let expected = 1.0 + config.year_match_boost + config.category_match_boost;
        assert_eq!(boosted[0].fused.combined, expected);
    }

    #[test]
    fn unsatisfied_year_filter_is_partial_match_not_good_match() {
        let chunks = vec![
            Chunk::new("d1", "rust ownership", "learning", 182).with_years(vec![1999]),
            Chunk::new("d2", "rust ownership too", "learning", 182).with_years(vec![1998]),
            Chunk::new("d3", "rust ownership three", "learning", 182).with_years(vec![1997]),
        ];
        let similarity = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let bm25 = Bm25Index::build(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
        let config = EngineConfig::default();
        let retriever = HybridRetriever { chunks: &chunks, similarity: &similarity, bm25: &bm25, config: &config };
        let mut plan = sample_plan();
        plan.filters.year = Some(crate::query::YearFilter { years: vec![2021], strict: false, is_range: false });
        let result = retriever.retrieve(&[1.0, 0.0], &plan, &[0, 1, 2], 182);
        assert_eq!(result.confidence, RetrievalConfidence::PartialMatch);
    }
}
