//! Chunk: the atomic unit of retrieval.
//!
//! A chunk is a slice of source text plus the metadata the rest of the engine
//! scores against (category, years mentioned, trust signals). Chunks are built
//! once at ingestion time and held immutably behind the shared index structures
//! for the lifetime of the process.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Row index into the embedding matrix and BM25 postings — chunks never carry
/// embeddings inline, they carry the index that locates one.
pub type ChunkIndex = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable 12-hex content hash, derived from the chunk text. Used for
    /// dedup in the source scorer and for reproducible ids across rebuilds.
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub category: String,
    /// Years explicitly mentioned in the chunk text, already extracted and
    /// clamped to a plausible range at ingestion time.
    pub years: Vec<i32>,
    pub created_at_day: i64,
    pub user_confirmed: bool,
    pub source_type: String,
    pub title: Option<String>,
    /// Position of this chunk within its source document, 0-based.
    pub ordinal: u32,
    /// Total number of chunks `doc_id` was split into.
    pub total_chunks_in_doc: u32,
    pub word_count: u32,
    pub char_count: u32,
    /// Id of the chunk this one was split from, if ingestion produced a
    /// hierarchy (e.g. a section summary above its paragraph children).
    pub parent_chunk: Option<String>,
    /// Depth in that hierarchy; 0 means a leaf chunk with no children.
    pub hierarchy_level: u32,
    /// Row into the shared embedding matrix, assigned once the engine is
    /// built. `None` before a chunk has been embedded.
    pub embedding_index: Option<u32>,
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    pub fn new(
        doc_id: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
        created_at_day: i64,
    ) -> Self {
        let text = text.into();
        let id = content_hash(&text);
        let word_count = text.split_whitespace().count() as u32;
        let char_count = text.chars().count() as u32;
        Self {
            id,
            doc_id: doc_id.into(),
            text,
            category: category.into(),
            years: Vec::new(),
            created_at_day,
            user_confirmed: false,
            source_type: "general".to_string(),
            title: None,
            ordinal: 0,
            total_chunks_in_doc: 1,
            word_count,
            char_count,
            parent_chunk: None,
            hierarchy_level: 0,
            embedding_index: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_years(mut self, years: Vec<i32>) -> Self {
        self.years = years;
        self
    }

    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.user_confirmed = confirmed;
        self
    }

    pub fn with_ordinal(mut self, ordinal: u32, total_chunks_in_doc: u32) -> Self {
        self.ordinal = ordinal;
        self.total_chunks_in_doc = total_chunks_in_doc;
        self
    }

    pub fn with_parent(mut self, parent_chunk: impl Into<String>, hierarchy_level: u32) -> Self {
        self.parent_chunk = Some(parent_chunk.into());
        self.hierarchy_level = hierarchy_level;
        self
    }

    pub fn with_embedding_index(mut self, embedding_index: u32) -> Self {
        self.embedding_index = Some(embedding_index);
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn matches_year(&self, year: i32) -> bool {
        self.years.contains(&year)
    }

    pub fn matches_year_range(&self, start: i32, end: i32) -> bool {
        self.years.iter().any(|&y| y >= start && y <= end)
    }
}

/// 12 hex characters of a SHA-256 digest over the chunk text — enough entropy
/// to treat collisions as dedup signal rather than a correctness hazard.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 6)
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_and_twelve_hex_chars() {
        let a = content_hash("the quick brown fox");
        let b = content_hash("the quick brown fox");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn different_text_yields_different_hash() {
        assert_ne!(content_hash("alpha"), content_hash("beta"));
    }

    #[test]
    fn matches_year_range_is_inclusive() {
        let chunk = Chunk::new("doc1", "text", "ideas", 100).with_years(vec![2020]);
        assert!(chunk.matches_year_range(2018, 2022));
        assert!(!chunk.matches_year_range(2021, 2022));
    }
}
