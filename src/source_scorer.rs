//! Scores and filters retrieved chunks down to the sources worth putting in
//! front of the LLM: a weighted blend of relevance, year/category match, and
//! diversity, with content-hash dedup.

use std::collections::HashSet;

use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::query::QueryPlan;
use crate::retrieval_types::ScoredChunk;

#[derive(Debug, Clone)]
pub struct ScoredSource {
    pub chunk_index: u32,
    pub importance: f32,
}

pub struct SourceScoringResult {
    pub sources: Vec<ScoredSource>,
    pub dropped_duplicates: usize,
    pub dropped_below_threshold: usize,
}

pub struct SourceImportanceScorer<'a> {
    pub config: &'a EngineConfig,
}

impl<'a> SourceImportanceScorer<'a> {
    pub fn score_and_filter(
        &self,
        chunks: &[Chunk],
        results: &[ScoredChunk],
        plan: &QueryPlan,
    ) -> SourceScoringResult {
        let mut seen_hashes: HashSet<String> = HashSet::new();
        let mut seen_docs: HashSet<String> = HashSet::new();
        let mut scored = Vec::new();
        let mut dropped_duplicates = 0;

        for result in results {
            let chunk = &chunks[result.chunk_index as usize];
            let normalized = normalize_prefix(&chunk.text);
            let content_key = crate::chunk::content_hash(&normalized);

            if seen_hashes.contains(&content_key) {
                dropped_duplicates += 1;
                continue;
            }

            let diversity = if seen_hashes.is_empty() {
                1.0
            } else if seen_docs.contains(&chunk.doc_id) {
                0.5
            } else {
                1.0
            };

            seen_hashes.insert(content_key);
            seen_docs.insert(chunk.doc_id.clone());

            let relevance = result.final_score.clamp(0.0, 1.0);
            let year_match_score = year_match_score(chunk, plan);
            let category_match_score = category_match_score(chunk, plan);

            let importance = self.config.relevance_weight * relevance
                + self.config.year_match_weight * year_match_score
                + self.config.category_match_weight * category_match_score
                + self.config.diversity_weight * diversity;

            scored.push(ScoredSource { chunk_index: result.chunk_index, importance });
        }

        let before_threshold = scored.len();
        scored.retain(|s| s.importance >= self.config.source_importance_threshold);
        let dropped_below_threshold = before_threshold - scored.len();

        scored.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.max_context_sources);

        SourceScoringResult { sources: scored, dropped_duplicates, dropped_below_threshold }
    }
}

/// 1.0 exact year match, 0.7 within the router's expansion window, 0.5
/// otherwise, 1.0 when no year filter constrains the query at all.
fn year_match_score(chunk: &Chunk, plan: &QueryPlan) -> f32 {
    let Some(year_filter) = &plan.filters.year else {
        return 1.0;
    };
    if year_filter.years.iter().any(|&y| chunk.matches_year(y)) {
        return 1.0;
    }
    let range = plan.year_prefilter_range;
    if range > 0 {
        let in_expansion = year_filter
            .years
            .iter()
            .any(|&y| chunk.matches_year_range(y - range, y + range));
        if in_expansion {
            return 0.7;
        }
    }
    0.5
}

/// 1.0 exact category match, 0.7 otherwise, 1.0 when no category filter is
/// active. There's no intermediate "related category" tier here since
/// category filters are a single value, not a list.
fn category_match_score(chunk: &Chunk, plan: &QueryPlan) -> f32 {
    let Some(category) = &plan.filters.category else {
        return 1.0;
    };
    if &chunk.category == category {
        1.0
    } else {
        0.7
    }
}

fn normalize_prefix(text: &str) -> String {
    text.chars()
        .take(200)
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn result(idx: u32, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk_index: idx,
            dense_score: score,
            sparse_score: 0.0,
            combined_score: score,
            final_score: score,
            year_boost: 0.0,
            category_boost: 0.0,
            year_matched: false,
            category_matched: false,
            temporal_weight: 1.0,
            trust_score: 0.8,
            from_graph_expansion: false,
            rank: 0,
        }
    }

    #[test]
    fn exact_duplicate_text_is_dropped() {
        let chunks = vec![
            Chunk::new("d1", "same content here", "ideas", 0),
            Chunk::new("d2", "same content here", "ideas", 0),
        ];
        let results = vec![result(0, 0.9), result(1, 0.8)];
        let config = EngineConfig::default();
        let scorer = SourceImportanceScorer { config: &config };
        let scoring = scorer.score_and_filter(&chunks, &results, &plan());
        assert_eq!(scoring.dropped_duplicates, 1);
        assert_eq!(scoring.sources.len(), 1);
    }

    #[test]
    fn low_relevance_sources_are_dropped() {
        let chunks = vec![Chunk::new("d1", "text", "ideas", 0)];
        let results = vec![result(0, 0.01)];
        let config = EngineConfig::default();
        let scorer = SourceImportanceScorer { config: &config };
        let scoring = scorer.score_and_filter(&chunks, &results, &plan());
        assert_eq!(scoring.dropped_below_threshold, 1);
    }
}
