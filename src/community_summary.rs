//! Community summarization: abstractive via the completion service, with an
//! extractive fallback, gated by a content hash so an unchanged community
//! never regenerates its summary.

use tracing::warn;

use crate::chunk::Chunk;
use crate::chunk::content_hash;
use crate::config::EngineConfig;
use crate::graph::{Community, CommunitySummary, KnowledgeGraph, NodeRole};
use crate::services::CompletionService;

/// Populates `hub_ids` on every community from the graph's structural role
/// assignment. Must run after hub/bridge detection, which runs after
/// community detection in the build pipeline.
pub fn assign_hub_ids(communities: &mut [Community], graph: &KnowledgeGraph) {
    for community in communities.iter_mut() {
        community.hub_ids = community
            .members
            .iter()
            .filter(|&&m| graph.role_of(m) == NodeRole::Hub)
            .copied()
            .collect();
    }
}

/// Content hash over the sorted member ids and each member's text prefix —
/// stable across rebuilds that don't change membership or content, so a
/// cached summary can be reused rather than regenerated on every query.
pub fn compute_content_hash(community: &Community, chunks: &[Chunk]) -> String {
    let mut members = community.members.clone();
    members.sort_unstable();
    let mut buf = String::new();
    for &m in &members {
        buf.push_str(&m.to_string());
        buf.push('|');
        if let Some(chunk) = chunks.get(m as usize) {
            buf.push_str(&chunk.text.chars().take(64).collect::<String>());
        }
        buf.push('\n');
    }
    content_hash(&buf)
}

fn select_chunks_for_summary<'a>(
    community: &Community,
    chunks: &'a [Chunk],
    max_chunks: usize,
) -> Vec<&'a Chunk> {
    let mut ordered: Vec<u32> = community.hub_ids.clone();
    for &member in &community.members {
        if !ordered.contains(&member) {
            ordered.push(member);
        }
    }
    ordered
        .into_iter()
        .take(max_chunks)
        .filter_map(|idx| chunks.get(idx as usize))
        .collect()
}

fn extractive_summary(selected: &[&Chunk]) -> String {
    selected
        .iter()
        .filter_map(|chunk| first_sentence(&chunk.text))
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_sentence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed.find(['.', '?', '!']).map(|i| i + 1).unwrap_or(trimmed.len());
    Some(trimmed[..end].to_string())
}

/// Generates (or reuses, if the content hash is unchanged) a summary for
/// every community above the minimum size. Falls back to the extractive
/// method on any completion-service failure — a missing or degraded LLM
/// backend must never block retrieval.
pub async fn summarize_communities(
    communities: &mut [Community],
    chunks: &[Chunk],
    completion: &dyn CompletionService,
    config: &EngineConfig,
) {
    if !config.community_summary_enabled {
        return;
    }

    for community in communities.iter_mut() {
        let hash = compute_content_hash(community, chunks);
        if community.content_hash.as_deref() == Some(hash.as_str()) && community.summary.is_some() {
            continue;
        }

        let selected = select_chunks_for_summary(community, chunks, config.summary_max_chunks);
        if selected.is_empty() {
            continue;
        }

        let joined = selected
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        let prompt = format!(
            "Summarize the common theme across these related notes in at most {} tokens:\n\n{}",
            config.summary_max_length, joined
        );

        let summary = match completion
            .complete(&prompt, &config.simple_model, 0.2, config.summary_max_length as u32)
            .await
        {
            Ok(text) if !text.trim().is_empty() => CommunitySummary { text, is_abstractive: true },
            Ok(_) => CommunitySummary { text: extractive_summary(&selected), is_abstractive: false },
            Err(err) => {
                warn!(error = %err, community = community.id, "community summary generation failed, using extractive fallback");
                CommunitySummary { text: extractive_summary(&selected), is_abstractive: false }
            }
        };

        community.summary = Some(summary);
        community.content_hash = Some(hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockCompletionService;

    fn sample_community() -> (Community, Vec<Chunk>) {
        let chunks = vec![
            Chunk::new("d1", "Rust ownership rules. More detail follows.", "learning", 0),
            Chunk::new("d2", "Borrowing and lifetimes explained here.", "learning", 0),
        ];
        let community = Community {
            id: 0,
            members: vec![0, 1],
            dominant_category: Some("learning".to_string()),
            dominant_years: vec![],
            category_distribution: Default::default(),
            year_distribution: Default::default(),
            density: 1.0,
            hub_ids: vec![],
            summary: None,
            content_hash: None,
        };
        (community, chunks)
    }

    #[tokio::test]
    async fn generates_abstractive_summary_from_mock_completion() {
        let (mut community, chunks) = sample_community();
        let config = EngineConfig::default();
        summarize_communities(std::slice::from_mut(&mut community), &chunks, &MockCompletionService, &config)
            .await;
        assert!(community.summary.is_some());
        assert!(community.content_hash.is_some());
    }

    #[test]
    fn unchanged_content_hash_is_stable() {
        let (community, chunks) = sample_community();
        let a = compute_content_hash(&community, &chunks);
        let b = compute_content_hash(&community, &chunks);
        assert_eq!(a, b);
    }

    #[test]
    fn extractive_fallback_takes_first_sentence_per_chunk() {
        let (_, chunks) = sample_community();
        let refs: Vec<&Chunk> = chunks.iter().collect();
        let summary = extractive_summary(&refs);
        assert!(summary.contains("Rust ownership rules."));
        assert!(summary.contains("Borrowing and lifetimes explained here."));
    }
}
