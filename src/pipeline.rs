//! Orchestrates a single query end to end: analyze, retrieve, find gaps,
//! score sources, build context, generate, cite, and assess confidence.
//!
//! This is the only place that sequences the other modules; everything else
//! in the crate is a pure function or a narrow collaborator of one stage.
//! No error from any stage is allowed to propagate past [`answer_query`] —
//! a failure becomes a `Failed`-quality `EnhancedAnswer` with `error` set,
//! never a panic or a bubbled `Result`.

use tracing::warn;

use crate::answer::{
    AnswerQuality, CitationValidation, EnhancedAnswer, GenerationStats, QueryMetadata,
};
use crate::citation::{generate_citations, link_citations, validate_citations};
use crate::confidence::confidence_message;
use crate::context_builder::build_context;
use crate::engine::KnowledgeEngine;
use crate::gap_detector::{missing_years, GapDetector};
use crate::query::{QueryOverrides, QueryPlan, QueryType};
use crate::query_analyzer::QueryAnalyzer;
use crate::retrieval_engine::RetrievalEngine;
use crate::retrieval_types::RetrievalConfidence;
use crate::services::{CompletionService, EmbeddingService};
use crate::source_scorer::SourceImportanceScorer;

/// Counts how many of the five named signals hold. Mirrors the source
/// system's model selector rather than any single hard rule, so a
/// hard-but-specific query and an easy-but-low-confidence query don't both
/// default to the expensive model on one signal alone.
fn signal_count(plan: &QueryPlan, confidence: RetrievalConfidence, total_candidates_considered: usize) -> usize {
    let mut signals = 0;
    if matches!(plan.query_type, QueryType::Synthesis | QueryType::Comparison) {
        signals += 1;
    }
    if matches!(
        confidence,
        RetrievalConfidence::PartialMatch | RetrievalConfidence::LowMatch | RetrievalConfidence::NoResults
    ) {
        signals += 1;
    }
    if plan.complexity_score >= 0.7 {
        signals += 1;
    }
    if plan.expansion_terms.len() > 5 {
        signals += 1;
    }
    if plan.query_type == QueryType::Temporal && total_candidates_considered < plan.min_docs {
        signals += 1;
    }
    signals
}

/// Picks the complex model when at least two of the five signals hold, the
/// simple model otherwise; always the simple model when selection is
/// disabled.
fn model_for(
    config: &crate::config::EngineConfig,
    plan: &QueryPlan,
    confidence: RetrievalConfidence,
    total_candidates_considered: usize,
) -> String {
    if !config.model_selection_enabled {
        return config.simple_model.clone();
    }
    if signal_count(plan, confidence, total_candidates_considered) >= 2 {
        config.complex_model.clone()
    } else {
        config.simple_model.clone()
    }
}

/// Builds the prompt handed to the completion service. Mirrors the source
/// system's `PromptBuilder`/`YearStrictPromptBuilder` split: year-strict
/// mode with an active filter swaps in a prompt that either enumerates the
/// valid indices to prefer, or — when none of the retrieved sources match —
/// instructs the model to say so rather than answer from other years.
trait PromptBuilder {
    fn build(&self, query: &str, context: &str) -> String;
}

struct StandardPromptBuilder;

impl PromptBuilder for StandardPromptBuilder {
    fn build(&self, query: &str, context: &str) -> String {
        format!(
            "Answer the following question using only the provided sources. Cite every claim using the [N] source markers from the context below.\n\nQuestion: {query}\n\nSources:\n{context}"
        )
    }
}

struct YearStrictPromptBuilder<'a> {
    valid_indices: &'a [usize],
}

impl<'a> PromptBuilder for YearStrictPromptBuilder<'a> {
    fn build(&self, query: &str, context: &str) -> String {
        let rule = if self.valid_indices.is_empty() {
            "None of the retrieved sources are from the requested year. Say so plainly and do not cite any source as if it answered the year-specific question.".to_string()
        } else {
            let list = self.valid_indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
            format!(
                "Only sources [{list}] match the requested year. Cite only from that set when answering the year-specific part of the question; you may reference other sources for general context but must say they are from a different year."
            )
        };
        format!("Answer the following question using only the provided sources. {rule}\n\nQuestion: {query}\n\nSources:\n{context}")
    }
}

fn build_prompt(query: &str, context: &str, plan: &QueryPlan, valid_indices: &[usize], config: &crate::config::EngineConfig) -> String {
    if config.year_strict_mode && plan.filters.year.is_some() {
        YearStrictPromptBuilder { valid_indices }.build(query, context)
    } else {
        StandardPromptBuilder.build(query, context)
    }
}

/// Days since the Unix epoch, for temporal-decay scoring against `Chunk::created_at_day`.
fn current_day() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| (d.as_secs() / 86_400) as i64)
        .unwrap_or(0)
}

fn failed_answer(query: &str, error: impl Into<String>) -> EnhancedAnswer {
    EnhancedAnswer {
        query: query.to_string(),
        text: String::new(),
        citations: Vec::new(),
        confidence: RetrievalConfidence::NoResults,
        confidence_message: "No confidence: the query could not be answered".to_string(),
        quality: AnswerQuality::Failed,
        model_used: String::new(),
        warning: None,
        citation_validation: CitationValidation {
            is_valid: true,
            cited_indices: Vec::new(),
            truncation_violations: Vec::new(),
            wrong_year_warnings: Vec::new(),
            unused_sources: Vec::new(),
            citation_rate: 0.0,
        },
        query_metadata: QueryMetadata {
            query_type: QueryType::Specific,
            year_filter: None,
            category_filter: None,
        },
        generation_stats: GenerationStats::default(),
        coverage_gaps: Vec::new(),
        num_sources: 0,
        years_covered: Vec::new(),
        categories_covered: Vec::new(),
        error: Some(error.into()),
    }
}

/// Runs the full query pipeline against an already-built engine.
pub async fn answer_query(
    engine: &KnowledgeEngine,
    query: &str,
    embedding: &dyn EmbeddingService,
    completion: &dyn CompletionService,
) -> EnhancedAnswer {
    answer_query_with_overrides(engine, query, embedding, completion, &QueryOverrides::default()).await
}

/// Same as [`answer_query`], but lets an HTTP caller pin the year/category
/// filter or cap the result count instead of relying solely on what the
/// analyzer infers from the query text.
pub async fn answer_query_with_overrides(
    engine: &KnowledgeEngine,
    query: &str,
    embedding: &dyn EmbeddingService,
    completion: &dyn CompletionService,
    overrides: &QueryOverrides,
) -> EnhancedAnswer {
    let start = std::time::Instant::now();

    let mut plan = QueryAnalyzer::new(&engine.config).analyze(query, completion).await;
    plan.apply_overrides(overrides);

    let query_embedding = match embedding.embed(&plan.expanded_query()).await {
        Ok(vector) => vector,
        Err(e) => {
            warn!(error = %e, "query embedding failed, aborting pipeline");
            return failed_answer(query, format!("embedding failed: {e}"));
        }
    };

    let retrieval_engine = RetrievalEngine {
        chunks: &engine.chunks,
        similarity: &engine.similarity,
        bm25: &engine.bm25,
        graph: &engine.graph,
        config: &engine.config,
    };
    let retrieval = retrieval_engine.retrieve(&query_embedding, &plan, current_day());
    let retrieval_time_ms = start.elapsed().as_millis() as u64;

    let gap_detector = GapDetector { config: &engine.config };
    let gaps = gap_detector.detect(&engine.chunks, &retrieval.chunks, &plan);

    let scorer = SourceImportanceScorer { config: &engine.config };
    let scoring = scorer.score_and_filter(&engine.chunks, &retrieval.chunks, &plan);

    let context = build_context(&engine.chunks, &engine.graph, &scoring.sources, &plan, &engine.config);
    let valid_indices = crate::context_builder::valid_citation_indices(&context, &plan, &engine.config);

    if context.citation_map.is_empty() {
        let mut answer = failed_answer(query, "no sources survived retrieval and scoring");
        answer.confidence = retrieval.confidence;
        answer.confidence_message = confidence_message(&retrieval, &plan);
        answer.coverage_gaps = gaps;
        answer.generation_stats.retrieval_time_ms = retrieval_time_ms;
        return answer;
    }

    let model = model_for(&engine.config, &plan, retrieval.confidence, retrieval.total_candidates_considered);
    let prompt = build_prompt(query, &context.text, &plan, &valid_indices, &engine.config);
    let prompt_tokens_estimate = prompt.len() / 4;

    let generation_start = std::time::Instant::now();
    let generated = match completion
        .complete(&prompt, &model, engine.config.answer_temperature, engine.config.max_tokens)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "answer generation failed");
            let mut answer = failed_answer(query, format!("generation failed: {e}"));
            answer.generation_stats.retrieval_time_ms = retrieval_time_ms;
            return answer;
        }
    };
    let generation_time_ms = generation_start.elapsed().as_millis() as u64;

    let citations = generate_citations(&engine.chunks, &scoring.sources, &context, &plan, &engine.config);
    let citations = link_citations(&generated, citations);
    let coverage = validate_citations(&generated, &context, &plan, &engine.config);

    let years_covered: Vec<i32> = {
        let mut years: Vec<i32> = context
            .citation_map
            .iter()
            .flat_map(|&idx| engine.chunks[idx as usize].years.clone())
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    };
    let categories_covered: Vec<String> = {
        let mut categories: Vec<String> = context
            .citation_map
            .iter()
            .map(|&idx| engine.chunks[idx as usize].category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    };

    let warning = if !coverage.wrong_year_citations.is_empty() {
        Some(format!(
            "The answer cites {} source(s) that don't match the requested year.",
            coverage.wrong_year_citations.len()
        ))
    } else if !missing_years(&gaps, &engine.chunks, &retrieval.chunks, &plan).is_empty() {
        Some("Some requested years have no matching content in the corpus.".to_string())
    } else {
        None
    };

    let quality = if !coverage.all_valid {
        AnswerQuality::Failed
    } else if matches!(retrieval.confidence, RetrievalConfidence::YearMatched | RetrievalConfidence::GoodMatch)
        && coverage.wrong_year_citations.is_empty()
    {
        AnswerQuality::High
    } else if matches!(retrieval.confidence, RetrievalConfidence::PartialMatch) {
        AnswerQuality::Medium
    } else {
        AnswerQuality::Low
    };

    EnhancedAnswer {
        query: query.to_string(),
        text: generated,
        citations,
        confidence: retrieval.confidence,
        confidence_message: confidence_message(&retrieval, &plan),
        quality,
        model_used: model.clone(),
        warning,
        citation_validation: CitationValidation {
            is_valid: coverage.all_valid,
            cited_indices: (1..=context.citation_map.len())
                .filter(|n| !coverage.unused_sources.contains(n))
                .collect(),
            truncation_violations: coverage.invalid_citations,
            wrong_year_warnings: coverage.wrong_year_citations,
            unused_sources: coverage.unused_sources,
            citation_rate: coverage.citation_rate,
        },
        query_metadata: QueryMetadata {
            query_type: plan.query_type,
            year_filter: plan.filters.year.as_ref().map(|yf| yf.years.clone()),
            category_filter: plan.filters.category.clone(),
        },
        generation_stats: GenerationStats {
            model_used: model.clone(),
            prompt_tokens_estimate,
            retrieval_time_ms,
            generation_time_ms,
        },
        coverage_gaps: gaps,
        num_sources: context.citation_map.len(),
        years_covered,
        categories_covered,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::config::EngineConfig;
    use crate::services::{MockCompletionService, MockEmbeddingService};

    async fn build_engine() -> KnowledgeEngine {
        let chunks = vec![
            Chunk::new("d1", "I learned about rust ownership in 2021", "learning", 0).with_years(vec![2021]),
            Chunk::new("d2", "a recipe for pasta dinner", "personal", 1),
        ];
        let mut config = EngineConfig::default();
        config.min_community_size = 1;
        config.embedding_dimension = 16;
        let embedder = MockEmbeddingService { dimension: 16 };
        let mut embeddings = Vec::new();
        for c in &chunks {
            embeddings.push(embedder.embed(&c.text).await.unwrap());
        }
        KnowledgeEngine::build(chunks, embeddings, config).unwrap()
    }

    #[tokio::test]
    async fn answer_query_produces_a_non_failed_answer_for_a_matching_query() {
        let engine = build_engine().await;
        let embedder = MockEmbeddingService { dimension: 16 };
        let answer = answer_query(&engine, "what did I learn about rust in 2021", &embedder, &MockCompletionService).await;
        assert!(answer.error.is_none());
        assert!(!answer.citations.is_empty() || answer.num_sources > 0);
    }

    #[tokio::test]
    async fn answer_query_never_panics_on_a_query_with_no_matches() {
        let engine = build_engine().await;
        let embedder = MockEmbeddingService { dimension: 16 };
        let answer = answer_query(&engine, "tell me about quantum computing in 1850", &embedder, &MockCompletionService).await;
        assert!(answer.quality == AnswerQuality::Failed || answer.error.is_none());
    }

    #[tokio::test]
    async fn explicit_year_override_pins_the_filter_even_without_year_text() {
        let engine = build_engine().await;
        let embedder = MockEmbeddingService { dimension: 16 };
        let overrides = QueryOverrides { year_filter: Some(2021), category_filter: None, max_results: None };
        let answer = answer_query_with_overrides(
            &engine,
            "what did I learn about ownership",
            &embedder,
            &MockCompletionService,
            &overrides,
        )
        .await;
        assert_eq!(answer.query_metadata.year_filter, Some(vec![2021]));
    }
}
