//! Detects gaps in retrieved coverage: years requested but absent or
//! irrelevant, categories requested but underrepresented, and synthesis
//! queries whose retrieved set doesn't cover enough of the corpus to
//! support a broad answer.

use std::collections::HashSet;

use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::query::{QueryPlan, QueryType};
use crate::retrieval_types::ScoredChunk;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Gap {
    /// Year requested but no chunk in the whole corpus mentions it.
    YearAbsentFromCorpus(i32),
    /// Year requested, chunks exist, but none scored above the relevance
    /// floor — present in the corpus but not meaningfully relevant.
    YearPresentButIrrelevant(i32),
    CategoryUnderrepresented(String),
    SynthesisCoverageTooNarrow { covered_ratio: f64 },
}

/// Years requested but absent from the corpus entirely (as opposed to
/// present but weakly relevant), for the answer layer's user-facing
/// "missing years" list. For synthesis queries — which have no single
/// requested year — this instead returns every corpus year not represented
/// in the retrieved set, since "missing" there means "not covered" rather
/// than "not requested".
pub fn missing_years(gaps: &[Gap], chunks: &[Chunk], results: &[ScoredChunk], plan: &QueryPlan) -> Vec<i32> {
    if plan.query_type == QueryType::Synthesis {
        let covered: HashSet<i32> = results
            .iter()
            .flat_map(|r| chunks[r.chunk_index as usize].years.iter().copied())
            .collect();
        let mut years: Vec<i32> = chunks
            .iter()
            .flat_map(|c| c.years.iter().copied())
            .filter(|y| !covered.contains(y))
            .collect();
        years.sort_unstable();
        years.dedup();
        return years;
    }

    let mut years: Vec<i32> = gaps
        .iter()
        .filter_map(|g| match g {
            Gap::YearAbsentFromCorpus(y) => Some(*y),
            _ => None,
        })
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

pub struct GapDetector<'a> {
    pub config: &'a EngineConfig,
}

impl<'a> GapDetector<'a> {
    pub fn detect(
        &self,
        chunks: &[Chunk],
        results: &[ScoredChunk],
        plan: &QueryPlan,
    ) -> Vec<Gap> {
        if !self.config.enable_gap_detection {
            return Vec::new();
        }

        let mut gaps = Vec::new();
        gaps.extend(self.detect_year_gaps(chunks, results, plan));
        gaps.extend(self.detect_category_gaps(results, plan));
        gaps.extend(self.detect_synthesis_gaps(chunks, results, plan));
        gaps
    }

    fn detect_year_gaps(
        &self,
        chunks: &[Chunk],
        results: &[ScoredChunk],
        plan: &QueryPlan,
    ) -> Vec<Gap> {
        let Some(year_filter) = &plan.filters.year else {
            return Vec::new();
        };

        let mut gaps = Vec::new();
        for &year in &year_filter.years {
            let present_in_corpus = chunks.iter().any(|c| c.matches_year(year));
            if !present_in_corpus {
                gaps.push(Gap::YearAbsentFromCorpus(year));
                continue;
            }

            let relevant = results.iter().any(|r| {
                r.year_matched && r.dense_score >= self.config.gap_min_relevance_threshold
            });
            if !relevant {
                gaps.push(Gap::YearPresentButIrrelevant(year));
            }
        }
        gaps
    }

    fn detect_category_gaps(&self, results: &[ScoredChunk], plan: &QueryPlan) -> Vec<Gap> {
        let Some(category) = &plan.filters.category else {
            return Vec::new();
        };
        if results.is_empty() {
            return vec![Gap::CategoryUnderrepresented(category.clone())];
        }
        Vec::new()
    }

    fn detect_synthesis_gaps(
        &self,
        chunks: &[Chunk],
        results: &[ScoredChunk],
        plan: &QueryPlan,
    ) -> Vec<Gap> {
        if !matches!(plan.query_type, QueryType::Synthesis | QueryType::Exploratory) {
            return Vec::new();
        }
        if chunks.is_empty() {
            return Vec::new();
        }

        let covered_docs: HashSet<&str> = results
            .iter()
            .map(|r| chunks[r.chunk_index as usize].doc_id.as_str())
            .collect();
        let total_docs: HashSet<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();

        let covered_ratio = covered_docs.len() as f64 / total_docs.len().max(1) as f64;
        if covered_ratio < self.config.min_coverage_ratio {
            return vec![Gap::SynthesisCoverageTooNarrow { covered_ratio }];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ExtractedFilters;
    use crate::query::YearFilter;

    fn base_plan() -> QueryPlan {
        QueryPlan {
            raw_query: "q".to_string(),
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
    fn reports_year_absent_from_corpus() {
        let chunks = vec![Chunk::new("d1", "text", "ideas", 0).with_years(vec![2020])];
        let mut plan = base_plan();
        plan.filters.year = Some(YearFilter { years: vec![1999], strict: false, is_range: false });
        let config = EngineConfig::default();
        let detector = GapDetector { config: &config };
        let gaps = detector.detect(&chunks, &[], &plan);
        assert!(gaps.contains(&Gap::YearAbsentFromCorpus(1999)));
    }

    fn scored(chunk_index: u32) -> ScoredChunk {
        ScoredChunk {
            chunk_index,
            dense_score: 0.9,
            sparse_score: 0.0,
            combined_score: 0.9,
            final_score: 0.9,
            year_boost: 0.0,
            category_boost: 0.0,
            year_matched: false,
            category_matched: false,
            temporal_weight: 1.0,
            trust_score: 1.0,
            from_graph_expansion: false,
            rank: 1,
        }
    }

    #[test]
    fn missing_years_for_synthesis_lists_uncovered_corpus_years() {
        let chunks = vec![
            Chunk::new("d1", "text a", "ideas", 0).with_years(vec![2020]),
            Chunk::new("d2", "text b", "ideas", 1).with_years(vec![2021]),
            Chunk::new("d3", "text c", "ideas", 2).with_years(vec![2022]),
        ];
        let mut plan = base_plan();
        plan.query_type = QueryType::Synthesis;
        let results = vec![scored(0)];
        let years = missing_years(&[], &chunks, &results, &plan);
        assert_eq!(years, vec![2021, 2022]);
    }

    #[test]
    fn missing_years_for_non_synthesis_uses_gap_list() {
        let chunks = vec![Chunk::new("d1", "text", "ideas", 0).with_years(vec![2020])];
        let plan = base_plan();
        let gaps = vec![Gap::YearAbsentFromCorpus(1999)];
        let years = missing_years(&gaps, &chunks, &[], &plan);
        assert_eq!(years, vec![1999]);
    }
}
