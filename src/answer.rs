//! Output types for the generation layer: citations and the final answer.

use serde::{Deserialize, Serialize};

use crate::gap_detector::Gap;
use crate::query::QueryType;
use crate::retrieval_types::RetrievalConfidence;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub index: usize,
    pub chunk_id: String,
    pub doc_id: String,
    pub category: String,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub year_match: bool,
    pub relevance_score: f32,
    pub excerpt: String,
    /// Stable id for highlighting this citation in a rendered answer.
    pub highlight_id: String,
    /// Byte offsets of every `[N]` occurrence found during linking.
    pub usage_positions: Vec<usize>,
    /// The sentence enclosing each usage, same order as `usage_positions`.
    pub usage_contexts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerQuality {
    High,
    Medium,
    Low,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationValidation {
    pub is_valid: bool,
    pub cited_indices: Vec<usize>,
    pub truncation_violations: Vec<usize>,
    pub wrong_year_warnings: Vec<usize>,
    pub unused_sources: Vec<usize>,
    pub citation_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query_type: QueryType,
    pub year_filter: Option<Vec<i32>>,
    pub category_filter: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub model_used: String,
    pub prompt_tokens_estimate: usize,
    pub retrieval_time_ms: u64,
    pub generation_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedAnswer {
    pub query: String,
    pub text: String,
    pub citations: Vec<Citation>,
    pub confidence: RetrievalConfidence,
    pub confidence_message: String,
    pub quality: AnswerQuality,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub citation_validation: CitationValidation,
    pub query_metadata: QueryMetadata,
    pub generation_stats: GenerationStats,
    pub coverage_gaps: Vec<Gap>,
    pub num_sources: usize,
    pub years_covered: Vec<i32>,
    pub categories_covered: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
