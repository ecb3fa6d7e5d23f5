//! Orchestrates classification, difficulty scoring, filter extraction, and
//! expansion into a single `QueryPlan`.

use crate::classification::{classify_intent, classify_query_type_scored, wants_chronological_order};
use crate::config::EngineConfig;
use crate::difficulty::{classify_difficulty, compute_complexity_score};
use crate::filters::extract_filters;
use crate::query::{QueryPlan, QueryType};
use crate::routing::route;
use crate::services::CompletionService;

pub struct QueryAnalyzer<'a> {
    config: &'a EngineConfig,
}

impl<'a> QueryAnalyzer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub async fn analyze(
        &self,
        query: &str,
        completion: &dyn CompletionService,
    ) -> QueryPlan {
        let (query_type, classification_confidence) = classify_query_type_scored(query);
        let intent = classify_intent(query);
        let mut filters = extract_filters(query);

        // Category filters are too narrow for queries that deliberately want
        // breadth: drop them for synthesis/exploratory/comparison so the
        // retrieval window isn't pre-pruned below what the query intends.
        if matches!(
            query_type,
            QueryType::Synthesis | QueryType::Exploratory | QueryType::Comparison
        ) {
            filters.category = None;
        }

        let expansion_terms =
            crate::expansion::expand_query(query, query_type, completion, self.config).await;

        let complexity_score =
            compute_complexity_score(query, query_type, &filters, expansion_terms.len());
        let difficulty = classify_difficulty(complexity_score);

        let has_year_filter = filters.year.is_some();
        let decision = route(query_type, difficulty, has_year_filter, self.config);

        let chronological_order =
            query_type == QueryType::Temporal && wants_chronological_order(query);

        QueryPlan {
            raw_query: query.to_string(),
            query_type,
            intent,
            difficulty,
            classification_confidence,
            complexity_score,
            filters,
            expansion_terms,
            min_docs: decision.min_docs,
            max_docs: decision.max_docs,
            year_prefilter_range: decision.year_prefilter_range,
            chronological_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockCompletionService;

    #[tokio::test]
    async fn analyze_drops_category_for_synthesis_queries() {
        let config = EngineConfig::default();
        let analyzer = QueryAnalyzer::new(&config);
        let plan = analyzer
            .analyze(
                "give me a comprehensive overview of my learning journal entries",
                &MockCompletionService,
            )
            .await;
        assert_eq!(plan.query_type, QueryType::Synthesis);
        assert!(plan.filters.category.is_none());
    }

    #[tokio::test]
    async fn analyze_sets_routing_window() {
        let config = EngineConfig::default();
        let analyzer = QueryAnalyzer::new(&config);
        let plan = analyzer.analyze("my thoughts on rust", &MockCompletionService).await;
        assert!(plan.min_docs > 0);
        assert!(plan.max_docs >= plan.min_docs);
    }
}
