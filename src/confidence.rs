//! Confidence assessor: turns a `RetrievalConfidence` tag into a user-facing
//! message, reproducing the retriever's own decision tree (see
//! `hybrid_retriever::determine_confidence`) so the message and the tag can
//! never disagree.

use crate::query::QueryPlan;
use crate::retrieval_types::{RetrievalConfidence, RetrievalResult};

/// Builds the user-facing explanation for a retrieval result's confidence
/// tag. The tag itself is for programmatic consumers; this message is what
/// gets surfaced to a person.
pub fn confidence_message(result: &RetrievalResult, plan: &QueryPlan) -> String {
    let year_label = plan
        .filters
        .year
        .as_ref()
        .map(|yf| {
            yf.years
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    match result.confidence {
        RetrievalConfidence::YearMatched => {
            let n = result.year_matched_count();
            format!("High confidence: {n} source(s) from {year_label} found")
        }
        RetrievalConfidence::PartialMatch => {
            if plan.filters.year.is_some() {
                format!(
                    "Partial match: no sources from {year_label} found; results include other years"
                )
            } else {
                "Partial match: results only partially address the query".to_string()
            }
        }
        RetrievalConfidence::GoodMatch => {
            format!("High confidence: {} relevant source(s) found", result.chunks.len())
        }
        RetrievalConfidence::LowMatch => {
            format!("Low confidence: only {} relevant source(s) found", result.chunks.len())
        }
        RetrievalConfidence::NoResults => {
            "No confidence: no relevant sources were found for this query".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ExtractedFilters, QueryDifficulty, QueryIntent, QueryType, YearFilter};
    use crate::retrieval_types::ScoredChunk;

    fn plan_with_year(year: i32) -> QueryPlan {
        QueryPlan {
            raw_query: "q".to_string(),
            query_type: QueryType::Temporal,
            intent: QueryIntent::Factual,
            difficulty: QueryDifficulty::Easy,
            classification_confidence: 0.8,
            complexity_score: 0.1,
            filters: ExtractedFilters {
                year: Some(YearFilter { years: vec![year], strict: true, is_range: false }),
                category: None,
                entities: vec![],
            },
            expansion_terms: vec![],
            min_docs: 1,
            max_docs: 10,
            year_prefilter_range: 0,
            chronological_order: false,
        }
    }

    fn chunk_result(year_matched: bool) -> ScoredChunk {
        ScoredChunk {
            chunk_index: 0,
            dense_score: 0.8,
            sparse_score: 0.0,
            combined_score: 0.8,
            final_score: 0.8,
            year_boost: 0.0,
            category_boost: 0.0,
            year_matched,
            category_matched: false,
            temporal_weight: 1.0,
            trust_score: 0.8,
            from_graph_expansion: false,
            rank: 1,
        }
    }

    #[test]
    fn year_matched_message_names_the_year() {
        let plan = plan_with_year(2021);
        let result = RetrievalResult {
            query: "q".to_string(),
            strategy_name: "hybrid".to_string(),
            chunks: vec![chunk_result(true)],
            total_candidates_considered: 1,
            retrieval_time_ms: 0,
            filters_applied: plan.filters.clone(),
            confidence: RetrievalConfidence::YearMatched,
            used_year_prefilter: true,
            expanded_via_graph: 0,
        };
        let message = confidence_message(&result, &plan);
        assert!(message.contains("2021"));
        assert!(message.starts_with("High confidence"));
    }

    #[test]
    fn partial_match_acknowledges_missing_year() {
        let plan = plan_with_year(2030);
        let result = RetrievalResult {
            query: "q".to_string(),
            strategy_name: "hybrid".to_string(),
            chunks: vec![chunk_result(false)],
            total_candidates_considered: 1,
            retrieval_time_ms: 0,
            filters_applied: plan.filters.clone(),
            confidence: RetrievalConfidence::PartialMatch,
            used_year_prefilter: true,
            expanded_via_graph: 0,
        };
        let message = confidence_message(&result, &plan);
        assert!(message.contains("2030"));
        assert!(message.starts_with("Partial match"));
    }
}
