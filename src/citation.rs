//! Citation generation, linking, and validation.
//!
//! Generation turns context-builder output into user-facing `Citation`
//! records; linking scans the generated answer text for `[N]` references and
//! decorates each citation with where it was actually used; validation
//! checks those references against the context's index map.

use std::collections::HashSet;

use crate::answer::Citation;
use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::context_builder::{valid_citation_indices, BuiltContext};
use crate::query::QueryPlan;
use crate::source_scorer::ScoredSource;

/// Generates one citation per chunk actually included in the built context,
/// in the same order as `context.citation_map`.
pub fn generate_citations(
    chunks: &[Chunk],
    sources: &[ScoredSource],
    context: &BuiltContext,
    plan: &QueryPlan,
    config: &EngineConfig,
) -> Vec<Citation> {
    let importance_by_chunk: std::collections::HashMap<u32, f32> =
        sources.iter().map(|s| (s.chunk_index, s.importance)).collect();

    context
        .citation_map
        .iter()
        .enumerate()
        .map(|(i, &chunk_index)| {
            let index = i + 1;
            let chunk = &chunks[chunk_index as usize];
            let year_matched = context.year_matched_indices.contains(&index);
            Citation {
                index,
                chunk_id: chunk.id.clone(),
                doc_id: chunk.doc_id.clone(),
                category: chunk.category.clone(),
                title: chunk.title.clone(),
                year: chunk.years.first().copied(),
                year_match: year_matched,
                relevance_score: importance_by_chunk.get(&chunk_index).copied().unwrap_or(0.0),
                excerpt: make_excerpt(&chunk.text, config.max_excerpt_length),
                highlight_id: format!("cite-{index}"),
                usage_positions: Vec::new(),
                usage_contexts: Vec::new(),
            }
        })
        .collect()
}

/// Truncates to `max_len`, preferring to cut at the last sentence boundary
/// within the last half of the excerpt; otherwise hard-cuts with an
/// ellipsis.
fn make_excerpt(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let window = &text[..max_len];
    let half = max_len / 2;
    let boundary = window
        .char_indices()
        .rev()
        .take_while(|&(i, _)| i >= half)
        .find(|&(_, c)| c == '.' || c == '?' || c == '!')
        .map(|(i, c)| i + c.len_utf8());

    match boundary {
        Some(end) => window[..end].to_string(),
        None => format!("{}...", window.trim_end()),
    }
}

/// Scans `answer_text` for `[N]` tokens and decorates the matching citation
/// with its usage positions (byte offsets of the token itself) and usage
/// contexts (the enclosing sentence, bounded by `.?!`).
pub fn link_citations(answer_text: &str, mut citations: Vec<Citation>) -> Vec<Citation> {
    for (start, n) in find_citation_tokens(answer_text) {
        let Some(citation) = citations.iter_mut().find(|c| c.index == n) else {
            continue;
        };
        citation.usage_positions.push(start);
        citation.usage_contexts.push(enclosing_sentence(answer_text, start));
    }
    citations
}

/// Returns `(byte_offset_of_token_start, N)` for every `[N]` token found.
fn find_citation_tokens(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some(close) = text[i..].find(']') {
                let inner = &text[i + 1..i + close];
                if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(n) = inner.parse::<usize>() {
                        found.push((i, n));
                    }
                }
                i += close + 1;
                continue;
            }
        }
        i += 1;
    }
    found
}

fn enclosing_sentence(text: &str, byte_offset: usize) -> String {
    let start = text[..byte_offset]
        .rfind(['.', '?', '!'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = text[byte_offset..]
        .find(['.', '?', '!'])
        .map(|i| byte_offset + i + 1)
        .unwrap_or(text.len());
    text[start..end].trim().to_string()
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CoverageReport {
    pub cited_source_count: usize,
    pub invalid_citations: Vec<usize>,
    pub wrong_year_citations: Vec<usize>,
    pub unused_sources: Vec<usize>,
    pub citation_rate: f64,
    pub all_valid: bool,
}

/// Validates every `[N]` reference in `answer_text` against the context's
/// index map. Truncation violations (an index outside the included range)
/// invalidate the answer; wrong-year citations (year-strict mode only) are
/// reported but non-fatal.
pub fn validate_citations(
    answer_text: &str,
    context: &BuiltContext,
    plan: &QueryPlan,
    config: &EngineConfig,
) -> CoverageReport {
    let included: HashSet<usize> = (1..=context.citation_map.len()).collect();
    let valid_year_indices: HashSet<usize> = valid_citation_indices(context, plan, config).into_iter().collect();

    let cited: HashSet<usize> = find_citation_tokens(answer_text).into_iter().map(|(_, n)| n).collect();

    let mut invalid_citations: Vec<usize> = cited.iter().filter(|n| !included.contains(n)).copied().collect();
    invalid_citations.sort_unstable();

    let mut wrong_year_citations: Vec<usize> = if config.year_strict_mode && plan.filters.year.is_some() {
        cited
            .iter()
            .filter(|n| included.contains(n) && !valid_year_indices.contains(n))
            .copied()
            .collect()
    } else {
        Vec::new()
    };
    wrong_year_citations.sort_unstable();

    let mut unused_sources: Vec<usize> = included.iter().filter(|n| !cited.contains(n)).copied().collect();
    unused_sources.sort_unstable();

    let cited_source_count = cited.intersection(&included).count();
    let citation_rate = if included.is_empty() {
        0.0
    } else {
        cited_source_count as f64 / included.len() as f64
    };

    CoverageReport {
        cited_source_count,
        all_valid: invalid_citations.is_empty(),
        invalid_citations,
        wrong_year_citations,
        unused_sources,
        citation_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ExtractedFilters, QueryDifficulty, QueryIntent, QueryType, YearFilter};

    fn plan_with_year(year: i32) -> QueryPlan {
        QueryPlan {
            raw_query: "q".to_string(),
            query_type: QueryType::Specific,
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

    fn context_with_two_entries() -> BuiltContext {
        BuiltContext {
            text: "[1] Source: d1 | Year: 2020 | Category: ideas\nfirst chunk.\n\n[2] Source: d2 | Year: 2019 | Category: ideas\nsecond chunk.".to_string(),
            citation_map: vec![0, 1],
            year_matched_indices: vec![1],
            truncated_count: 0,
        }
    }

    #[test]
    fn citation_outside_context_range_is_truncation_violation() {
        let plan = plan_with_year(2020);
        let config = EngineConfig::default();
        let context = context_with_two_entries();
        let report = validate_citations("This references [7] which does not exist.", &context, &plan, &config);
        assert!(!report.all_valid);
        assert_eq!(report.invalid_citations, vec![7]);
    }

    #[test]
    fn wrong_year_citation_is_warning_not_fatal() {
        let plan = plan_with_year(2020);
        let config = EngineConfig::default();
        let context = context_with_two_entries();
        let report = validate_citations("See [1] and [2] for details.", &context, &plan, &config);
        assert!(report.all_valid);
        assert_eq!(report.wrong_year_citations, vec![2]);
    }

    #[test]
    fn excerpt_cuts_at_sentence_boundary_when_present() {
        let text = "First sentence ends here. Second sentence is much longer and keeps going on and on.";
        let excerpt = make_excerpt(text, 40);
        assert!(excerpt.ends_with('.'));
        assert!(excerpt.len() <= 40);
    }

    #[test]
    fn link_citations_records_usage_position_and_context() {
        let chunks = vec![Chunk::new("d1", "first chunk text", "ideas", 0).with_years(vec![2020])];
        let sources = vec![ScoredSource { chunk_index: 0, importance: 0.9 }];
        let context = BuiltContext {
            text: "[1] Source: d1 | Year: 2020 | Category: ideas\nfirst chunk text".to_string(),
            citation_map: vec![0],
            year_matched_indices: vec![1],
            truncated_count: 0,
        };
        let plan = plan_with_year(2020);
        let config = EngineConfig::default();
        let citations = generate_citations(&chunks, &sources, &context, &plan, &config);
        let linked = link_citations("The idea appeared in 2020 [1]. Nothing else followed.", citations);
        assert_eq!(linked[0].usage_positions.len(), 1);
        assert!(linked[0].usage_contexts[0].contains("appeared in 2020"));
        assert_eq!(linked[0].highlight_id, "cite-1");
    }
}
