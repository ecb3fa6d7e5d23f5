//! Central configuration for the query-time knowledge engine.
//!
//! Every field can be overridden by an `ORIONGRAPH_<FIELD>` environment variable
//! (uppercased field name), applied by hand per field since Rust has no
//! dataclass-style field reflection.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMode {
    Blended,
    Rrf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // ---- Knowledge graph construction ----
    pub embedding_dimension: usize,
    pub semantic_similarity_threshold: f32,
    pub cross_domain_threshold: f32,
    pub max_total_edges: usize,
    pub top_k_neighbors: usize,

    // ---- Knowledge structures ----
    pub louvain_resolution: f64,
    pub min_community_size: usize,
    pub hub_threshold_percentile: f64,
    pub bridge_min_communities: usize,
    pub bridge_betweenness_threshold: f64,
    pub adaptive_resolution: bool,
    pub target_min_communities: usize,
    pub target_max_communities: usize,
    pub louvain_min_resolution: f64,
    pub louvain_max_resolution: f64,
    pub louvain_max_iterations: usize,
    pub community_summary_enabled: bool,
    pub summary_max_chunks: usize,
    pub summary_max_length: usize,

    // ---- Query analysis ----
    pub enable_query_expansion: bool,
    pub max_expansion_terms: usize,
    pub year_expansion_range: i32,

    // ---- Retrieval engine ----
    pub scoring_mode: ScoringMode,
    pub rrf_k_constant: u32,
    pub adaptive_rrf_k: bool,
    pub rrf_k_ratio: f64,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub dense_alpha: f32,
    pub sparse_beta: f32,
    pub use_year_prefilter: bool,
    pub year_match_boost: f32,
    pub category_match_boost: f32,
    pub semantic_relevance_threshold: f32,

    pub enable_graph_expansion: bool,
    pub graph_expansion_max_neighbors: usize,
    pub graph_expansion_edge_types: Vec<String>,
    pub graph_expansion_min_score: f32,
    pub graph_expansion_discount: f32,

    pub specific_min_docs: usize,
    pub specific_max_docs: usize,
    pub synthesis_min_docs: usize,
    pub synthesis_max_docs: usize,
    pub comparison_min_docs: usize,
    pub comparison_max_docs: usize,

    pub community_aware_retrieval: bool,
    pub community_boost: f32,
    pub bridge_boost: f32,
    pub include_community_summaries: bool,

    pub temporal_decay_rate: f64,
    pub enable_temporal_decay: bool,
    pub trust_threshold: f32,
    pub enable_trust_filtering: bool,
    pub user_confirmation_weight: f32,
    pub source_reliability_weight: f32,

    // ---- Thinking layer ----
    pub enable_gap_detection: bool,
    pub gap_threshold: f64,
    pub min_coverage_ratio: f64,
    pub gap_min_relevance_threshold: f32,

    pub source_importance_threshold: f32,
    pub max_context_sources: usize,
    pub relevance_weight: f32,
    pub year_match_weight: f32,
    pub category_match_weight: f32,
    pub diversity_weight: f32,

    pub max_context_length: usize,

    // ---- Answer generation ----
    pub answer_temperature: f32,
    pub max_tokens: u32,
    pub year_strict_mode: bool,
    pub min_year_matched_for_confidence: usize,
    pub min_results_for_good_confidence: usize,
    pub model_selection_enabled: bool,
    pub complex_model: String,
    pub simple_model: String,
    pub max_excerpt_length: usize,

    // ---- API ----
    pub api_host: String,
    pub api_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 384,
            semantic_similarity_threshold: 0.45,
            cross_domain_threshold: 0.40,
            max_total_edges: 3000,
            top_k_neighbors: 5,

            louvain_resolution: 0.20,
            min_community_size: 3,
            hub_threshold_percentile: 0.9,
            bridge_min_communities: 3,
            bridge_betweenness_threshold: 0.1,
            adaptive_resolution: true,
            target_min_communities: 5,
            target_max_communities: 15,
            louvain_min_resolution: 0.1,
            louvain_max_resolution: 2.0,
            louvain_max_iterations: 10,
            community_summary_enabled: true,
            summary_max_chunks: 10,
            summary_max_length: 500,

            enable_query_expansion: true,
            max_expansion_terms: 3,
            year_expansion_range: 2,

            scoring_mode: ScoringMode::Blended,
            rrf_k_constant: 60,
            adaptive_rrf_k: true,
            rrf_k_ratio: 0.1,
            dense_weight: 1.0,
            sparse_weight: 0.5,
            dense_alpha: 0.6,
            sparse_beta: 0.4,
            use_year_prefilter: true,
            year_match_boost: 0.5,
            category_match_boost: 0.2,
            semantic_relevance_threshold: 0.3,

            enable_graph_expansion: true,
            graph_expansion_max_neighbors: 3,
            graph_expansion_edge_types: vec![
                "causes".to_string(),
                "contradicts".to_string(),
                "supports".to_string(),
            ],
            graph_expansion_min_score: 0.25,
            graph_expansion_discount: 0.9,

            specific_min_docs: 5,
            specific_max_docs: 10,
            synthesis_min_docs: 8,
            synthesis_max_docs: 12,
            comparison_min_docs: 6,
            comparison_max_docs: 15,

            community_aware_retrieval: true,
            community_boost: 0.3,
            bridge_boost: 0.4,
            include_community_summaries: true,

            temporal_decay_rate: 0.05,
            enable_temporal_decay: true,
            trust_threshold: 0.7,
            enable_trust_filtering: true,
            user_confirmation_weight: 0.6,
            source_reliability_weight: 0.4,

            enable_gap_detection: true,
            gap_threshold: 0.3,
            min_coverage_ratio: 0.3,
            gap_min_relevance_threshold: 0.3,

            source_importance_threshold: 0.4,
            max_context_sources: 8,
            relevance_weight: 0.4,
            year_match_weight: 0.25,
            category_match_weight: 0.15,
            diversity_weight: 0.2,

            max_context_length: 8000,

            answer_temperature: 0.3,
            max_tokens: 2000,
            year_strict_mode: true,
            min_year_matched_for_confidence: 1,
            min_results_for_good_confidence: 3,
            model_selection_enabled: true,
            complex_model: "gemini-3-flash-preview".to_string(),
            simple_model: "gemini-flash-latest".to_string(),
            max_excerpt_length: 200,

            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
        }
    }
}

macro_rules! override_from_env {
    ($self:ident, $field:ident, $parse:expr) => {
        if let Ok(raw) = env::var(concat!("ORIONGRAPH_", stringify!($field))) {
            #[allow(clippy::redundant_closure_call)]
            if let Some(value) = $parse(&raw) {
                $self.$field = value;
            }
        }
    };
}

impl EngineConfig {
    /// Applies `ORIONGRAPH_<FIELD>` overrides for the tunables most commonly
    /// adjusted per-deployment; the full configuration struct is still
    /// constructible directly for anything this loader does not cover.
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env!(self, semantic_similarity_threshold, |s: &str| s
            .parse::<f32>()
            .ok());
        override_from_env!(self, cross_domain_threshold, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, max_total_edges, |s: &str| s.parse::<usize>().ok());
        override_from_env!(self, top_k_neighbors, |s: &str| s.parse::<usize>().ok());
        override_from_env!(self, louvain_resolution, |s: &str| s.parse::<f64>().ok());
        override_from_env!(self, adaptive_resolution, |s: &str| parse_bool(s));
        override_from_env!(self, rrf_k_constant, |s: &str| s.parse::<u32>().ok());
        override_from_env!(self, adaptive_rrf_k, |s: &str| parse_bool(s));
        override_from_env!(self, dense_alpha, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, sparse_beta, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, use_year_prefilter, |s: &str| parse_bool(s));
        override_from_env!(self, year_match_boost, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, category_match_boost, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, semantic_relevance_threshold, |s: &str| s
            .parse::<f32>()
            .ok());
        override_from_env!(self, enable_graph_expansion, |s: &str| parse_bool(s));
        override_from_env!(self, temporal_decay_rate, |s: &str| s.parse::<f64>().ok());
        override_from_env!(self, enable_temporal_decay, |s: &str| parse_bool(s));
        override_from_env!(self, trust_threshold, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, enable_trust_filtering, |s: &str| parse_bool(s));
        override_from_env!(self, source_importance_threshold, |s: &str| s
            .parse::<f32>()
            .ok());
        override_from_env!(self, max_context_sources, |s: &str| s.parse::<usize>().ok());
        override_from_env!(self, max_context_length, |s: &str| s.parse::<usize>().ok());
        override_from_env!(self, answer_temperature, |s: &str| s.parse::<f32>().ok());
        override_from_env!(self, max_tokens, |s: &str| s.parse::<u32>().ok());
        override_from_env!(self, year_strict_mode, |s: &str| parse_bool(s));
        override_from_env!(self, model_selection_enabled, |s: &str| parse_bool(s));
        override_from_env!(self, api_port, |s: &str| s.parse::<u16>().ok());

        if let Ok(v) = env::var("ORIONGRAPH_SCORING_MODE") {
            self.scoring_mode = match v.to_lowercase().as_str() {
                "rrf" => ScoringMode::Rrf,
                _ => ScoringMode::Blended,
            };
        }
        if let Ok(v) = env::var("ORIONGRAPH_API_HOST") {
            self.api_host = v;
        }
        if let Ok(v) = env::var("ORIONGRAPH_COMPLEX_MODEL") {
            self.complex_model = v;
        }
        if let Ok(v) = env::var("ORIONGRAPH_SIMPLE_MODEL") {
            self.simple_model = v;
        }

        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.semantic_similarity_threshold) {
            return Err(EngineError::configuration(
                "semantic_similarity_threshold must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.cross_domain_threshold) {
            return Err(EngineError::configuration(
                "cross_domain_threshold must be between 0 and 1",
            ));
        }
        if self.rrf_k_constant == 0 {
            return Err(EngineError::configuration("rrf_k_constant must be positive"));
        }
        if !(0.0..=1.0).contains(&self.dense_alpha) {
            return Err(EngineError::configuration("dense_alpha must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.sparse_beta) {
            return Err(EngineError::configuration("sparse_beta must be between 0 and 1"));
        }
        if self.rrf_k_ratio <= 0.0 {
            return Err(EngineError::configuration("rrf_k_ratio must be positive"));
        }
        if !(0.0..=2.0).contains(&self.answer_temperature) {
            return Err(EngineError::configuration(
                "answer_temperature must be between 0 and 2",
            ));
        }
        if self.max_tokens == 0 {
            return Err(EngineError::configuration("max_tokens must be positive"));
        }
        if self.embedding_dimension == 0 {
            return Err(EngineError::configuration("embedding_dimension must be positive"));
        }
        Ok(())
    }

    pub fn loaded() -> EngineResult<Self> {
        let config = Self::default().with_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    Some(matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
}
