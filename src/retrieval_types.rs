//! Shared result types produced by the hybrid retrieval engine and consumed
//! by the thinking layer.

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkIndex;
use crate::query::ExtractedFilters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalConfidence {
    YearMatched,
    GoodMatch,
    PartialMatch,
    LowMatch,
    NoResults,
}

impl RetrievalConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalConfidence::YearMatched => "year_matched",
            RetrievalConfidence::GoodMatch => "good_match",
            RetrievalConfidence::PartialMatch => "partial_match",
            RetrievalConfidence::LowMatch => "low_match",
            RetrievalConfidence::NoResults => "no_results",
        }
    }
}

/// A chunk plus every score the retriever computed for it. `combined_score`
/// is the post-fusion, pre-boost score; `final_score` folds in boosting,
/// temporal decay, and trust penalization, and is what ordering and
/// truncation actually use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_index: ChunkIndex,
    pub dense_score: f32,
    pub sparse_score: f32,
    pub combined_score: f32,
    pub final_score: f32,
    pub year_boost: f32,
    pub category_boost: f32,
    pub year_matched: bool,
    pub category_matched: bool,
    pub temporal_weight: f64,
    pub trust_score: f32,
    pub from_graph_expansion: bool,
    /// 1-based rank, assigned after final ordering. 0 until assigned.
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub strategy_name: String,
    pub chunks: Vec<ScoredChunk>,
    pub total_candidates_considered: usize,
    pub retrieval_time_ms: u64,
    pub filters_applied: ExtractedFilters,
    pub confidence: RetrievalConfidence,
    pub used_year_prefilter: bool,
    pub expanded_via_graph: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn year_matched_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.year_matched).count()
    }

    /// Assigns 1-based ranks to the chunks in their current order.
    pub fn assign_ranks(&mut self) {
        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            chunk.rank = i + 1;
        }
    }
}
