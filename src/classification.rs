//! Query-type classification: specific / temporal / synthesis / comparison /
//! exploratory, decided by keyword cues with a fixed priority order.

use regex::Regex;
use std::sync::OnceLock;

use crate::query::{QueryIntent, QueryType};

const COMPARISON_CUES: &[&str] = &[
    "compare", "versus", " vs ", "difference between", "similar to", "contrast",
];
const SYNTHESIS_CUES: &[&str] = &[
    "overview", "summarize", "summary", "across", "themes", "patterns", "synthesis",
    "comprehensive", "big picture",
];
const EXPLORATORY_CUES: &[&str] = &[
    "what do i know", "tell me about", "explore", "anything about", "related to",
];
const CHRONOLOGICAL_CUES: &[&str] = &[
    "evolve", "evolution", "progress", "progression", "change", "changed", "develop",
    "development", "grow", "growth", "trajectory", "over time", "timeline", "journey",
    "transformation",
];

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(19|20)\d{2}\b").unwrap())
}

pub fn has_temporal_cue(query: &str) -> bool {
    let lower = query.to_lowercase();
    year_regex().is_match(&lower) || CHRONOLOGICAL_CUES.iter().any(|cue| lower.contains(cue))
}

/// Insertion order used to break ties in the pattern-sum vote below: a query
/// that ties between comparison and temporal cues (e.g. "compare my notes
/// from 2020 and 2021") reads as a comparison first.
const TYPE_ORDER: &[QueryType] = &[
    QueryType::Comparison,
    QueryType::Temporal,
    QueryType::Synthesis,
    QueryType::Exploratory,
    QueryType::Specific,
];

fn type_score(query_type: QueryType, lower: &str) -> usize {
    match query_type {
        QueryType::Specific => 0,
        QueryType::Temporal => {
            cue_count(lower, CHRONOLOGICAL_CUES) + if year_regex().is_match(lower) { 1 } else { 0 }
        }
        QueryType::Synthesis => cue_count(lower, SYNTHESIS_CUES),
        QueryType::Comparison => cue_count(lower, COMPARISON_CUES),
        QueryType::Exploratory => cue_count(lower, EXPLORATORY_CUES),
    }
}

/// Sums cue hits per type and returns the argmax plus a confidence in
/// `[0, 1]` — the winner's share of total cue hits across all types. Ties
/// are broken by `TYPE_ORDER`; a query with zero hits everywhere defaults to
/// `(Specific, 0.5)`.
pub fn classify_query_type_scored(query: &str) -> (QueryType, f32) {
    let lower = query.to_lowercase();
    let scores: Vec<(QueryType, usize)> = TYPE_ORDER
        .iter()
        .map(|&t| (t, type_score(t, &lower)))
        .collect();

    let total: usize = scores.iter().map(|(_, s)| s).sum();
    if total == 0 {
        return (QueryType::Specific, 0.5);
    }

    // `Iterator::max_by_key` returns the *last* maximal element on ties;
    // insertion-order tie-breaking needs the first, so track it by hand.
    let mut winner = scores[0].0;
    let mut winner_score = scores[0].1;
    for (t, score) in scores.into_iter().skip(1) {
        if score > winner_score {
            winner = t;
            winner_score = score;
        }
    }

    (winner, winner_score as f32 / total as f32)
}

pub fn classify_query_type(query: &str) -> QueryType {
    classify_query_type_scored(query).0
}

/// Whether a temporal query additionally asks for chronological ordering of
/// results rather than pure relevance ordering.
pub fn wants_chronological_order(query: &str) -> bool {
    let lower = query.to_lowercase();
    CHRONOLOGICAL_CUES.iter().any(|cue| lower.contains(cue))
}

const EVALUATIVE_CUES: &[&str] = &[
    "should i", "worth it", "good idea", "bad idea", "better", "worse", "pros and cons",
    "evaluate", "assess", "opinion", "think about",
];
const PROCEDURAL_CUES: &[&str] = &[
    "how do i", "how to", "steps to", "process for", "procedure", "instructions",
];
const COMPARATIVE_CUES: &[&str] = &[
    "compare", "versus", " vs ", "difference between", "similar to", "contrast", "better than",
];
const EXPLANATORY_CUES: &[&str] = &[
    "why", "explain", "overview", "summarize", "what do i know", "tell me about", "describe",
];

fn cue_count(text: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|cue| text.contains(*cue)).count()
}

/// Pattern-sum intent classification: counts matching cues per category and
/// returns the argmax, defaulting to `Factual` when nothing matches or all
/// counts tie at zero.
pub fn classify_intent(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    let scored = [
        (QueryIntent::Evaluative, cue_count(&lower, EVALUATIVE_CUES)),
        (QueryIntent::Procedural, cue_count(&lower, PROCEDURAL_CUES)),
        (QueryIntent::Comparative, cue_count(&lower, COMPARATIVE_CUES)),
        (QueryIntent::Explanatory, cue_count(&lower, EXPLANATORY_CUES)),
    ];
    scored
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(intent, _)| intent)
        .unwrap_or(QueryIntent::Factual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_beats_temporal_when_both_present() {
        assert_eq!(
            classify_query_type("compare my notes from 2020 and 2021"),
            QueryType::Comparison
        );
    }

    #[test]
    fn bare_year_is_temporal() {
        assert_eq!(classify_query_type("what happened in 2019"), QueryType::Temporal);
    }

    #[test]
    fn synthesis_cue_detected() {
        assert_eq!(
            classify_query_type("give me an overview of my learning"),
            QueryType::Synthesis
        );
    }

    #[test]
    fn default_is_specific() {
        assert_eq!(classify_query_type("my thoughts on rust ownership"), QueryType::Specific);
    }

    #[test]
    fn procedural_cue_detected() {
        assert_eq!(classify_intent("how do i set up a rust project"), QueryIntent::Procedural);
    }

    #[test]
    fn no_cues_defaults_to_factual() {
        assert_eq!(classify_intent("my thoughts on rust ownership"), QueryIntent::Factual);
    }
}
