//! Query difficulty classification: a single complexity score folded into
//! three bands, used by the router to widen or narrow document limits.

use crate::query::{ExtractedFilters, QueryDifficulty, QueryType};

const EASY_THRESHOLD: f32 = 0.3;
const HARD_THRESHOLD: f32 = 0.6;

pub fn classify_difficulty(score: f32) -> QueryDifficulty {
    if score < EASY_THRESHOLD {
        QueryDifficulty::Easy
    } else if score <= HARD_THRESHOLD {
        QueryDifficulty::Medium
    } else {
        QueryDifficulty::Hard
    }
}

/// Computes the complexity score in `[0.0, 1.0]` from query length, presence
/// of filters, entity count, and query type. `expansion_term_count` is
/// accepted for call-site symmetry with the analyzer pipeline but does not
/// factor into the score.
pub fn compute_complexity_score(
    query: &str,
    query_type: QueryType,
    filters: &ExtractedFilters,
    _expansion_term_count: usize,
) -> f32 {
    let mut score = 0.0f32;

    let word_count = query.split_whitespace().count();
    if word_count > 20 {
        score += 0.2;
    } else if word_count > 10 {
        score += 0.1;
    }

    if filters.year.is_some() {
        score += 0.15;
    }
    if filters.category.is_some() {
        score += 0.15;
    }
    if !filters.entities.is_empty() {
        score += 0.1;
    }

    score += match query_type {
        QueryType::Specific => 0.1,
        QueryType::Exploratory => 0.2,
        QueryType::Temporal => 0.25,
        QueryType::Comparison => 0.3,
        QueryType::Synthesis => 0.35,
    };

    score.clamp(0.0, 1.0)
}
