//! Query expansion: widens sparse-retrieval recall with a fixed AI/ML domain
//! synonym dictionary, optionally topped up with a handful of LLM-generated
//! related concepts. The dictionary lookup is local and infallible; the LLM
//! call is optional and degrades to no extra terms on any backend failure
//! rather than failing the query.

use tracing::warn;

use crate::config::EngineConfig;
use crate::query::QueryType;
use crate::services::CompletionService;

/// AI/ML domain vocabulary for this deployment. Replaceable per deployment —
/// swap the table for whatever domain the corpus actually covers.
const SYNONYM_DICTIONARY: &[(&str, &[&str])] = &[
    ("ml", &["machine learning"]),
    ("ai", &["artificial intelligence"]),
    ("llm", &["large language model"]),
    ("nlp", &["natural language processing"]),
    ("model", &["architecture", "network"]),
    ("training", &["fine-tuning", "optimization"]),
    ("embedding", &["vector representation", "encoding"]),
    ("embeddings", &["vector representations", "encodings"]),
    ("transformer", &["attention model", "self-attention"]),
    ("neural", &["deep learning"]),
    ("inference", &["prediction", "generation"]),
    ("dataset", &["corpus", "training data"]),
    ("accuracy", &["performance", "precision"]),
    ("classification", &["categorization"]),
    ("clustering", &["grouping"]),
    ("regression", &["prediction"]),
    ("agent", &["autonomous system"]),
    ("rag", &["retrieval augmented generation"]),
    ("prompt", &["instruction", "query template"]),
    ("fine-tuning", &["fine-tune", "training"]),
    ("hallucination", &["confabulation", "fabrication"]),
    ("token", &["subword", "word piece"]),
    ("latency", &["response time"]),
    ("benchmark", &["evaluation", "leaderboard"]),
];

fn dictionary_terms(query: &str, max_terms: usize) -> Vec<String> {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();

    let mut terms = Vec::new();
    for word in &words {
        if let Some((_, synonyms)) = SYNONYM_DICTIONARY.iter().find(|(key, _)| key == word) {
            for syn in *synonyms {
                if !terms.contains(&syn.to_string()) && !lower.contains(syn) {
                    terms.push(syn.to_string());
                }
                if terms.len() >= max_terms {
                    return terms;
                }
            }
        }
    }
    terms
}

pub async fn expand_query(
    query: &str,
    query_type: QueryType,
    completion: &dyn CompletionService,
    config: &EngineConfig,
) -> Vec<String> {
    if !config.enable_query_expansion {
        return Vec::new();
    }

    let mut terms = dictionary_terms(query, config.max_expansion_terms);
    if terms.len() >= config.max_expansion_terms {
        terms.truncate(config.max_expansion_terms);
        return terms;
    }

    let prompt = format!(
        "Given the {} query \"{}\", list up to 3 short related search terms, \
         comma separated, no explanation.",
        query_type.as_str(),
        query,
    );

    match completion
        .complete(&prompt, &config.simple_model, 0.2, 64)
        .await
    {
        Ok(response) => {
            for term in parse_terms(&response, 3) {
                if terms.len() >= config.max_expansion_terms {
                    break;
                }
                if !terms.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
                    terms.push(term);
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "query expansion failed, continuing with dictionary terms only");
        }
    }

    terms
}

fn parse_terms(response: &str, max_terms: usize) -> Vec<String> {
    response
        .split(|c| c == ',' || c == '\n')
        .map(|term| term.trim().trim_matches('"').to_string())
        .filter(|term| !term.is_empty())
        .take(max_terms)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_terms() {
        let terms = parse_terms("rust, ownership, borrowing", 3);
        assert_eq!(terms, vec!["rust", "ownership", "borrowing"]);
    }

    #[test]
    fn truncates_to_max_terms() {
        let terms = parse_terms("a, b, c, d, e", 2);
        assert_eq!(terms, vec!["a", "b"]);
    }

    #[test]
    fn dictionary_finds_known_acronyms() {
        let terms = dictionary_terms("how does an llm handle nlp tasks", 5);
        assert!(terms.contains(&"large language model".to_string()));
        assert!(terms.contains(&"natural language processing".to_string()));
    }

    #[test]
    fn dictionary_respects_term_cap() {
        let terms = dictionary_terms("ai ml llm nlp transformer", 2);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn dictionary_skips_terms_already_in_query() {
        let terms = dictionary_terms("ml and machine learning basics", 5);
        assert!(!terms.contains(&"machine learning".to_string()));
    }
}
