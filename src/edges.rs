//! Edge discovery and typing between semantically similar chunk pairs.
//!
//! Candidate pairs come from the similarity index (see `similarity.rs`);
//! `discover_edges` decides which pairs are admitted at all, and
//! `classify_edge` decides which `EdgeType` an admitted pair gets via an
//! ordered evaluation. First matching rule wins.

use std::collections::HashMap;

use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::graph::{Edge, EdgeOrigin, EdgeType};
use crate::similarity::SimilarityIndex;

/// Fixed weight given to the unconditional same-document adjacency edge,
/// independent of embedding similarity.
const SEQUENTIAL_EDGE_WEIGHT: f32 = 0.9;

const CONTRADICTION_CUES: &[&str] = &[
    "however",
    "although",
    "on the other hand",
    "but",
    "despite",
    "in contrast",
    "conversely",
    "nevertheless",
    "yet",
];

const CAUSAL_CUES: &[&str] = &[
    "therefore",
    "led to",
    "caused",
    "as a result",
    "because of this",
    "consequently",
    "due to",
];

const SUPPORT_CUES: &[&str] = &[
    "confirms",
    "agrees",
    "evidence",
    "validates",
    "supports",
    "corroborates",
    "reinforces",
];

const TEMPORAL_CUES: &[&str] = &[
    "subsequently",
    "years later",
    "since then",
    "later on",
    "afterward",
    "in the following year",
];

fn contains_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| text.contains(cue))
}

/// True iff a pair clears the similarity bar for an edge at all: the
/// in-category bar when source and target share a category, the (usually
/// lower) cross-domain bar otherwise.
pub fn admit_pair(a: &Chunk, b: &Chunk, similarity: f32, config: &EngineConfig) -> bool {
    if a.category == b.category {
        similarity >= config.semantic_similarity_threshold
    } else {
        similarity >= config.cross_domain_threshold
    }
}

/// Classifies the relation between two chunks that have already been
/// admitted by `admit_pair`. Same-document sequence (`a` immediately
/// precedes `b` in document order) is checked first since it's a structural
/// fact, not a heuristic; cue-based relations follow in priority order, with
/// cross_domain/same_topic as the structural fallback when no cue fires.
pub fn classify_edge(a: &Chunk, b: &Chunk, similarity: f32, config: &EngineConfig) -> EdgeType {
    if a.doc_id == b.doc_id && b.ordinal > a.ordinal {
        return EdgeType::Elaborates;
    }

    let combined = format!("{} {}", a.text.to_lowercase(), b.text.to_lowercase());

    if contains_any(&combined, CONTRADICTION_CUES) {
        EdgeType::Contradicts
    } else if contains_any(&combined, CAUSAL_CUES) {
        EdgeType::Causes
    } else if contains_any(&combined, SUPPORT_CUES) {
        EdgeType::Supports
    } else if contains_any(&combined, TEMPORAL_CUES) {
        EdgeType::TemporalSequence
    } else if a.category != b.category && similarity >= config.cross_domain_threshold {
        EdgeType::CrossDomain
    } else if a.doc_id == b.doc_id {
        EdgeType::Elaborates
    } else {
        EdgeType::SameTopic
    }
}

pub fn build_edge(source: u32, target: u32, edge_type: EdgeType, similarity: f32) -> Edge {
    Edge { source, target, edge_type, weight: similarity, origin: EdgeOrigin::Knn, similarity }
}

/// Builds the full edge set for a corpus: for each chunk, the top
/// `top_k_neighbors` most similar other chunks that clear `admit_pair`, plus
/// an unconditional edge between every adjacent-ordinal pair within the same
/// document. A pair is never linked twice — on collision the higher
/// similarity wins, with sequential edges using their fixed weight as their
/// similarity for that comparison. Capped at `max_total_edges` by descending
/// weight.
pub fn discover_edges(chunks: &[Chunk], similarity: &SimilarityIndex, config: &EngineConfig) -> Vec<Edge> {
    let mut admitted: HashMap<(u32, u32), Edge> = HashMap::new();

    let mut admit = |edge: Edge| {
        let key = if edge.source < edge.target {
            (edge.source, edge.target)
        } else {
            (edge.target, edge.source)
        };
        match admitted.get(&key) {
            Some(existing) if existing.similarity >= edge.similarity => {}
            _ => {
                admitted.insert(key, edge);
            }
        }
    };

    for (i, chunk) in chunks.iter().enumerate() {
        let node = i as u32;
        let neighbors = similarity.find_similar_to_node(node, config.top_k_neighbors);
        for (neighbor, score) in neighbors {
            let other = &chunks[neighbor as usize];
            if !admit_pair(chunk, other, score, config) {
                continue;
            }
            let edge_type = classify_edge(chunk, other, score, config);
            admit(build_edge(node, neighbor, edge_type, score));
        }
    }

    let mut by_doc: HashMap<&str, Vec<u32>> = HashMap::new();
    for (i, chunk) in chunks.iter().enumerate() {
        by_doc.entry(chunk.doc_id.as_str()).or_default().push(i as u32);
    }
    for indices in by_doc.values() {
        let mut sorted = indices.clone();
        sorted.sort_by_key(|&idx| chunks[idx as usize].ordinal);
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if chunks[b as usize].ordinal == chunks[a as usize].ordinal + 1 {
                admit(Edge {
                    source: a,
                    target: b,
                    edge_type: EdgeType::Sequential,
                    weight: SEQUENTIAL_EDGE_WEIGHT,
                    origin: EdgeOrigin::Sequential,
                    similarity: SEQUENTIAL_EDGE_WEIGHT,
                });
            }
        }
    }

    let mut edges: Vec<Edge> = admitted.into_values().collect();
    edges.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    edges.truncate(config.max_total_edges);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, category: &str, doc_id: &str) -> Chunk {
        Chunk::new(doc_id, text, category, 0)
    }

    #[test]
    fn contradiction_cue_wins_over_fallback() {
        let config = EngineConfig::default();
        let a = chunk("I used to believe X", "ideas", "d1");
        let b = chunk("however, I now think otherwise", "ideas", "d2");
        assert_eq!(classify_edge(&a, &b, 0.9, &config), EdgeType::Contradicts);
    }

    #[test]
    fn below_threshold_pair_is_not_admitted() {
        let config = EngineConfig::default();
        let a = chunk("unrelated text", "ideas", "d1");
        let b = chunk("also unrelated", "ideas", "d2");
        assert!(!admit_pair(&a, &b, 0.01, &config));
    }

    #[test]
    fn same_doc_no_cue_falls_back_to_elaborates() {
        let config = EngineConfig::default();
        let a = chunk("part one of the idea", "ideas", "d1");
        let b = chunk("part two continues the idea", "ideas", "d1");
        assert_eq!(classify_edge(&a, &b, 0.9, &config), EdgeType::Elaborates);
    }

    #[test]
    fn later_ordinal_same_doc_is_elaborates_even_with_contradiction_cue() {
        let config = EngineConfig::default();
        let a = chunk("I used to believe X", "ideas", "d1").with_ordinal(0, 2);
        let b = chunk("however, I now think otherwise", "ideas", "d1").with_ordinal(1, 2);
        assert_eq!(classify_edge(&a, &b, 0.9, &config), EdgeType::Elaborates);
    }

    #[test]
    fn cross_category_below_cross_domain_threshold_is_not_admitted() {
        let config = EngineConfig::default();
        let a = chunk("some text", "ideas", "d1");
        let b = chunk("other text", "learning", "d2");
        assert!(!admit_pair(&a, &b, 0.1, &config));
    }

    #[test]
    fn discover_edges_dedups_and_caps_total() {
        let chunks = vec![
            chunk("alpha beta gamma", "ideas", "d1"),
            chunk("alpha beta delta", "ideas", "d2"),
            chunk("totally unrelated filler", "personal", "d3"),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![0.95, 0.05], vec![0.0, 1.0]];
        let similarity = SimilarityIndex::build(embeddings);
        let mut config = EngineConfig::default();
        config.semantic_similarity_threshold = 0.5;
        config.cross_domain_threshold = 0.5;
        let edges = discover_edges(&chunks, &similarity, &config);
        assert!(edges.iter().any(|e| (e.source, e.target) == (0, 1) || (e.source, e.target) == (1, 0)));
        for edge in &edges {
            assert_ne!((edge.source, edge.target), (1, 0));
        }
    }
}
