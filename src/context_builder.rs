//! Assembles the final LLM context string from scored sources.
//!
//! Year-matched chunks are included unconditionally regardless of the
//! length budget — only non-year-matched chunks are subject to truncation.
//! Narrative-style queries (overview/summarize/etc.) prepend any available
//! community summaries before the chunk text.

use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::graph::KnowledgeGraph;
use crate::query::QueryPlan;
use crate::source_scorer::ScoredSource;

const NARRATIVE_CUES: &[&str] = &[
    "overview", "summarize", "describe", "explain", "who am i", "what do i know",
    "tell me about", "bird", "big picture", "across", "themes", "patterns", "synthesis",
    "comprehensive",
];

pub fn is_narrative_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    NARRATIVE_CUES.iter().any(|cue| lower.contains(cue))
}

pub struct BuiltContext {
    pub text: String,
    /// Maps the `[N]` index used in the context back to the chunk index, so
    /// the citation layer can validate references against real chunks.
    pub citation_map: Vec<u32>,
    /// 1-based indices whose chunk matched the active year filter. Equal to
    /// the full index range when no year filter is active.
    pub year_matched_indices: Vec<usize>,
    pub truncated_count: usize,
}

pub fn build_context(
    chunks: &[Chunk],
    graph: &KnowledgeGraph,
    sources: &[ScoredSource],
    plan: &QueryPlan,
    config: &EngineConfig,
) -> BuiltContext {
    let mut sections = Vec::new();
    let mut citation_map = Vec::new();
    let mut used_length = 0usize;
    let mut truncated_count = 0;

    let narrative = is_narrative_query(&plan.raw_query)
        || matches!(plan.query_type, crate::query::QueryType::Synthesis | crate::query::QueryType::Exploratory)
        || plan.intent == crate::query::QueryIntent::Explanatory;

    if config.include_community_summaries && narrative {
        let mut seen_communities = std::collections::HashSet::new();
        for source in sources {
            let community_id = graph.community_of(source.chunk_index);
            if community_id == u32::MAX || !seen_communities.insert(community_id) {
                continue;
            }
            if let Some(community) = graph.communities.iter().find(|c| c.id == community_id) {
                if let Some(summary) = &community.summary {
                    sections.push(format!("Community context: {}", summary.text));
                    used_length += summary.text.len();
                }
            }
        }
    }

    let year_filter_active = plan.filters.year.is_some();

    let mut ordered: Vec<&ScoredSource> = sources.iter().collect();
    if year_filter_active {
        ordered.sort_by_key(|s| {
            let chunk = &chunks[s.chunk_index as usize];
            let matched = plan
                .filters
                .year
                .as_ref()
                .map(|yf| yf.years.iter().any(|&y| chunk.matches_year(y)))
                .unwrap_or(false);
            std::cmp::Reverse(matched)
        });
    }

    let mut year_matched_indices = Vec::new();

    for source in ordered {
        let chunk = &chunks[source.chunk_index as usize];
        let year_matched = plan
            .filters
            .year
            .as_ref()
            .map(|yf| yf.years.iter().any(|&y| chunk.matches_year(y)))
            .unwrap_or(false);

        // Year-matched chunks are exempt from the length budget: dropping an
        // exact year match to save space would silently violate the query's
        // explicit constraint.
        if !year_matched && used_length + chunk.text.len() > config.max_context_length {
            truncated_count += 1;
            continue;
        }

        let index = citation_map.len() + 1;
        let year_str = chunk.years.first().map(|y| y.to_string()).unwrap_or_else(|| "unknown".to_string());
        sections.push(format!(
            "[{}] Source: {} | Year: {} | Category: {}\n{}",
            index, chunk.doc_id, year_str, chunk.category, chunk.text
        ));
        citation_map.push(source.chunk_index);
        if year_matched {
            year_matched_indices.push(index);
        }
        used_length += chunk.text.len();
    }

    if !year_filter_active {
        year_matched_indices = (1..=citation_map.len()).collect();
    }

    BuiltContext { text: sections.join("\n\n"), citation_map, year_matched_indices, truncated_count }
}

/// Indices valid for `[N]` citation in the built context — anything outside
/// this range is a hallucinated citation. All included indices are valid
/// unless year-strict mode is active with a year filter set, in which case
/// only the year-matched subset qualifies.
pub fn valid_citation_indices(context: &BuiltContext, plan: &QueryPlan, config: &EngineConfig) -> Vec<usize> {
    if config.year_strict_mode && plan.filters.year.is_some() {
        context.year_matched_indices.clone()
    } else {
        (1..=context.citation_map.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ExtractedFilters, YearFilter};

    fn plan_with_query(query: &str) -> QueryPlan {
        QueryPlan {
            raw_query: query.to_string(),
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
    fn year_matched_chunk_is_never_truncated() {
        let long_text = "x".repeat(10_000);
        let chunks = vec![Chunk::new("d1", long_text, "ideas", 0).with_years(vec![2020])];
        let graph = KnowledgeGraph::new(1, vec![]);
        let sources = vec![ScoredSource { chunk_index: 0, importance: 0.9 }];
        let mut plan = plan_with_query("what happened in 2020");
        plan.filters.year = Some(YearFilter { years: vec![2020], strict: false, is_range: false });
        let mut config = EngineConfig::default();
        config.max_context_length = 10;
        let built = build_context(&chunks, &graph, &sources, &plan, &config);
        assert_eq!(built.citation_map.len(), 1);
        assert_eq!(built.truncated_count, 0);
    }

    #[test]
    fn narrative_query_is_detected() {
        assert!(is_narrative_query("give me an overview of my ideas"));
        assert!(!is_narrative_query("what did I write about rust"));
    }
}
