//! Year prefiltering: narrows the candidate set to chunks whose years
//! plausibly satisfy the query's year filter before scoring runs, falling
//! back to the full corpus when too few candidates survive.

use crate::chunk::{Chunk, ChunkIndex};
use crate::config::EngineConfig;
use crate::query::{QueryPlan, QueryType, YearFilter};

pub fn prefilter_candidates(
    chunks: &[Chunk],
    plan: &QueryPlan,
    config: &EngineConfig,
) -> Vec<ChunkIndex> {
    let Some(year_filter) = &plan.filters.year else {
        return (0..chunks.len() as u32).collect();
    };
    if !config.use_year_prefilter {
        return (0..chunks.len() as u32).collect();
    }

    let candidates = year_candidates(chunks, year_filter, plan);

    if candidates.len() < plan.min_docs {
        return (0..chunks.len() as u32).collect();
    }

    candidates
}

fn year_candidates(chunks: &[Chunk], year_filter: &YearFilter, plan: &QueryPlan) -> Vec<ChunkIndex> {
    // Comparison queries over a year range only admit the boundary years —
    // the user wants to contrast the endpoints, not everything in between.
    if plan.query_type == QueryType::Comparison && year_filter.is_range {
        let boundaries = [
            *year_filter.years.first().unwrap(),
            *year_filter.years.last().unwrap(),
        ];
        return chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| boundaries.iter().any(|&y| c.matches_year(y)))
            .map(|(idx, _)| idx as u32)
            .collect();
    }

    if year_filter.is_range {
        let start = *year_filter.years.first().unwrap();
        let end = *year_filter.years.last().unwrap();
        return chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches_year_range(start, end))
            .map(|(idx, _)| idx as u32)
            .collect();
    }

    let year = year_filter.years[0];
    let range = plan.year_prefilter_range;
    chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| c.matches_year_range(year - range, year + range))
        .map(|(idx, _)| idx as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ExtractedFilters;

    fn plan_with_year(year: i32, query_type: QueryType) -> QueryPlan {
        QueryPlan {
            raw_query: "q".to_string(),
            query_type,
            intent: crate::query::QueryIntent::Factual,
            difficulty: crate::query::QueryDifficulty::Easy,
            classification_confidence: 0.8,
            complexity_score: 0.1,
            filters: ExtractedFilters {
                year: Some(YearFilter { years: vec![year], strict: false, is_range: false }),
                category: None,
                entities: vec![],
            },
            expansion_terms: vec![],
            min_docs: 1,
            max_docs: 10,
            year_prefilter_range: 2,
            chronological_order: false,
        }
    }

    #[test]
    fn falls_back_to_full_corpus_when_too_few_candidates() {
        let chunks = vec![Chunk::new("d1", "text", "ideas", 0).with_years(vec![1995])];
        let plan = {
            let mut p = plan_with_year(2020, QueryType::Specific);
            p.min_docs = 5;
            p
        };
        let config = EngineConfig::default();
        let candidates = prefilter_candidates(&chunks, &plan, &config);
        assert_eq!(candidates.len(), chunks.len());
    }

    #[test]
    fn narrows_to_year_window_when_enough_candidates() {
        let chunks = vec![
            Chunk::new("d1", "a", "ideas", 0).with_years(vec![2020]),
            Chunk::new("d2", "b", "ideas", 0).with_years(vec![2020]),
            Chunk::new("d3", "c", "ideas", 0).with_years(vec![1999]),
        ];
        let mut plan = plan_with_year(2020, QueryType::Specific);
        plan.min_docs = 2;
        let config = EngineConfig::default();
        let candidates = prefilter_candidates(&chunks, &plan, &config);
        assert_eq!(candidates, vec![0, 1]);
    }
}
