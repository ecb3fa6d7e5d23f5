//! Hand-rolled BM25Okapi sparse retrieval index.
//!
//! No BM25 crate is available in the dependency stack, so this reimplements
//! the Okapi BM25 scoring formula directly: term frequency saturation via
//! `k1`, length normalization via `b`, and inverse document frequency with
//! the standard +0.5/+0.5 smoothing.

use std::collections::HashMap;

const K1: f32 = 1.5;
const B: f32 = 0.75;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub struct Bm25Index {
    doc_term_freqs: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
    doc_freq: HashMap<String, u32>,
    n_docs: usize,
}

impl Bm25Index {
    pub fn build(documents: &[String]) -> Self {
        let mut doc_term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc);
            doc_lengths.push(tokens.len() as u32);

            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            doc_term_freqs.push(term_freq);
        }

        let n_docs = documents.len();
        let avg_doc_length = if n_docs > 0 {
            doc_lengths.iter().sum::<u32>() as f32 / n_docs as f32
        } else {
            0.0
        };

        Self { doc_term_freqs, doc_lengths, avg_doc_length, doc_freq, n_docs }
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.n_docs as f32;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score_doc(&self, doc_idx: usize, query_terms: &[String]) -> f32 {
        let term_freq = &self.doc_term_freqs[doc_idx];
        let doc_len = self.doc_lengths[doc_idx] as f32;
        let mut score = 0.0;

        for term in query_terms {
            let tf = *term_freq.get(term).unwrap_or(&0) as f32;
            if tf == 0.0 {
                continue;
            }
            let idf = self.idf(term);
            let numerator = tf * (K1 + 1.0);
            let denominator = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_length.max(1.0));
            score += idf * numerator / denominator;
        }

        score
    }

    /// Raw BM25 scores for every document, in document order.
    pub fn score_all(&self, query: &str) -> Vec<f32> {
        let query_terms = tokenize(query);
        (0..self.n_docs)
            .map(|idx| self.score_doc(idx, &query_terms))
            .collect()
    }

    /// Min-max normalized scores in `[0.0, 1.0]`, matching the source
    /// system's normalization so sparse and dense scores are combinable.
    pub fn score_all_normalized(&self, query: &str) -> Vec<f32> {
        let raw = self.score_all(query);
        normalize_min_max(&raw)
    }
}

pub fn normalize_min_max(values: &[f32]) -> Vec<f32> {
    let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if !min.is_finite() || !max.is_finite() || (max - min).abs() < 1e-9 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (v - min) / (max - min)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_term_match_scores_higher_than_no_match() {
        let docs = vec![
            "rust ownership and borrowing".to_string(),
            "cooking pasta for dinner".to_string(),
        ];
        let index = Bm25Index::build(&docs);
        let scores = index.score_all("rust ownership");
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn normalized_scores_are_bounded() {
        let docs = vec![
            "rust ownership".to_string(),
            "rust borrowing rules".to_string(),
            "pasta recipe".to_string(),
        ];
        let index = Bm25Index::build(&docs);
        let normalized = index.score_all_normalized("rust");
        for score in normalized {
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
