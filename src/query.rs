//! Query-analysis data model shared by the classifier, router, filter
//! extractor, and expander.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum QueryType {
    Specific,
    Temporal,
    Synthesis,
    Comparison,
    Exploratory,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Specific => "specific",
            QueryType::Temporal => "temporal",
            QueryType::Synthesis => "synthesis",
            QueryType::Comparison => "comparison",
            QueryType::Exploratory => "exploratory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryDifficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryIntent {
    Factual,
    Explanatory,
    Evaluative,
    Procedural,
    Comparative,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Factual => "factual",
            QueryIntent::Explanatory => "explanatory",
            QueryIntent::Evaluative => "evaluative",
            QueryIntent::Procedural => "procedural",
            QueryIntent::Comparative => "comparative",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearFilter {
    pub years: Vec<i32>,
    /// Whether the phrasing requires an exact year match (e.g. "only from 2021")
    /// rather than treating the year as a soft preference.
    pub strict: bool,
    pub is_range: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFilters {
    pub year: Option<YearFilter>,
    pub category: Option<String>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub raw_query: String,
    pub query_type: QueryType,
    pub intent: QueryIntent,
    pub difficulty: QueryDifficulty,
    /// Winner's share of total cue-pattern hits across all query types, in
    /// `[0, 1]`; 0.5 when no pattern fired and the type defaulted to Specific.
    pub classification_confidence: f32,
    pub complexity_score: f32,
    pub filters: ExtractedFilters,
    pub expansion_terms: Vec<String>,
    pub min_docs: usize,
    pub max_docs: usize,
    pub year_prefilter_range: i32,
    pub chronological_order: bool,
}

impl QueryPlan {
    pub fn expanded_query(&self) -> String {
        if self.expansion_terms.is_empty() {
            self.raw_query.clone()
        } else {
            format!("{} {}", self.raw_query, self.expansion_terms.join(" "))
        }
    }

    /// Applies caller-supplied filter/result-count overrides from the HTTP
    /// boundary on top of whatever the analyzer inferred from query text.
    /// An explicit override always wins over inference.
    pub fn apply_overrides(&mut self, overrides: &QueryOverrides) {
        if let Some(year) = overrides.year_filter {
            self.filters.year = Some(YearFilter { years: vec![year], strict: true, is_range: false });
        }
        if let Some(category) = &overrides.category_filter {
            self.filters.category = Some(category.clone());
        }
        if let Some(max_results) = overrides.max_results {
            self.max_docs = max_results;
            self.min_docs = self.min_docs.min(max_results);
        }
    }
}

/// Filter/result-count overrides supplied directly by an HTTP caller,
/// taking precedence over whatever the text-based analyzer infers.
#[derive(Debug, Clone, Default)]
pub struct QueryOverrides {
    pub year_filter: Option<i32>,
    pub category_filter: Option<String>,
    pub max_results: Option<usize>,
}
