//! Maps query type + difficulty to a `(min_docs, max_docs)` retrieval
//! window, plus the year-prefilter range to apply when a year filter is
//! present.

use crate::config::EngineConfig;
use crate::query::{QueryDifficulty, QueryType};

pub struct RoutingDecision {
    pub min_docs: usize,
    pub max_docs: usize,
    pub year_prefilter_range: i32,
}

/// Routing table: (query_type, difficulty) -> (min, max). Entries absent
/// from the table fall back to the configured specific-query defaults.
pub fn route(
    query_type: QueryType,
    difficulty: QueryDifficulty,
    has_year_filter: bool,
    config: &EngineConfig,
) -> RoutingDecision {
    use QueryDifficulty::*;
    use QueryType::*;

    let (min_docs, max_docs) = match (query_type, difficulty) {
        (Specific, Easy) => (3, 5),
        (Specific, Medium) => (5, 8),
        (Specific, Hard) => (config.specific_min_docs, config.specific_max_docs),

        (Temporal, Easy) => (5, 8),
        (Temporal, Medium) => (8, 12),
        (Temporal, Hard) => (10, 15),

        (Synthesis, Easy) => (6, 10),
        (Synthesis, Medium) => (config.synthesis_min_docs, config.synthesis_max_docs),
        (Synthesis, Hard) => (10, 15),

        (Comparison, Easy) => (6, 10),
        (Comparison, Medium) => (config.comparison_min_docs, config.comparison_max_docs),
        (Comparison, Hard) => (10, 15),

        (Exploratory, Easy) => (5, 8),
        (Exploratory, Medium) => (8, 12),
        (Exploratory, Hard) => (10, 15),
    };

    let year_prefilter_range = if has_year_filter {
        config.year_expansion_range
    } else {
        0
    };

    RoutingDecision { min_docs, max_docs, year_prefilter_range }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_easy_is_narrow() {
        let config = EngineConfig::default();
        let decision = route(QueryType::Specific, QueryDifficulty::Easy, false, &config);
        assert_eq!((decision.min_docs, decision.max_docs), (3, 5));
    }

    #[test]
    fn year_filter_applies_prefilter_range() {
        let config = EngineConfig::default();
        let decision = route(QueryType::Temporal, QueryDifficulty::Medium, true, &config);
        assert_eq!(decision.year_prefilter_range, config.year_expansion_range);
    }

    #[test]
    fn no_year_filter_means_zero_range() {
        let config = EngineConfig::default();
        let decision = route(QueryType::Specific, QueryDifficulty::Easy, false, &config);
        assert_eq!(decision.year_prefilter_range, 0);
    }
}
