//! Loads and saves the corpus a `KnowledgeEngine` is built from: chunks as a
//! JSON array, embeddings as a raw (N, D) little-endian float32 blob. Graph
//! and communities are derived at build time and are not persisted
//! separately — they're cheap to recompute from chunks + embeddings and
//! keeping one source of truth avoids a staleness class of bug.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::chunk::Chunk;

pub fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading chunks file {:?}", path.as_ref()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&raw).context("parsing chunks JSON")?;
    Ok(chunks)
}

pub fn save_chunks(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<()> {
    let raw = serde_json::to_string(chunks).context("serializing chunks")?;
    std::fs::write(&path, raw).with_context(|| format!("writing chunks file {:?}", path.as_ref()))
}

/// Reads a raw little-endian f32 blob and reshapes it into `n` rows of
/// `dimension` columns each.
pub fn load_embeddings(path: impl AsRef<Path>, dimension: usize) -> Result<Vec<Vec<f32>>> {
    let bytes = std::fs::read(&path)
        .with_context(|| format!("reading embeddings file {:?}", path.as_ref()))?;
    if dimension == 0 {
        bail!("embedding dimension must be positive");
    }
    let row_bytes = dimension * 4;
    if bytes.len() % row_bytes != 0 {
        bail!(
            "embeddings file size {} is not a multiple of row size {} (dimension {})",
            bytes.len(),
            row_bytes,
            dimension
        );
    }
    let rows = bytes.len() / row_bytes;
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        let start = row * row_bytes;
        let mut vector = Vec::with_capacity(dimension);
        for col in 0..dimension {
            let offset = start + col * 4;
            let value = f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            vector.push(value);
        }
        out.push(vector);
    }
    Ok(out)
}

pub fn save_embeddings(path: impl AsRef<Path>, embeddings: &[Vec<f32>]) -> Result<()> {
    let mut bytes = Vec::new();
    for row in embeddings {
        for value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    std::fs::write(&path, bytes).with_context(|| format!("writing embeddings file {:?}", path.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_round_trip_through_bytes() {
        let embeddings = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let dir = std::env::temp_dir().join(format!("oriongraph-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("embeddings.bin");
        save_embeddings(&path, &embeddings).unwrap();
        let loaded = load_embeddings(&path, 3).unwrap();
        assert_eq!(loaded, embeddings);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn chunks_round_trip_through_json() {
        let chunks = vec![Chunk::new("d1", "hello world", "ideas", 0)];
        let dir = std::env::temp_dir().join(format!("oriongraph-test-chunks-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chunks.json");
        save_chunks(&path, &chunks).unwrap();
        let loaded = load_chunks(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, chunks[0].id);
        std::fs::remove_file(&path).ok();
    }
}
