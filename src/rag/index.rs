//! In-memory vector index with cosine-similarity retrieval.
//!
//! Holds the embedded chunks of a single document for the duration of one
//! extraction session. Nothing is persisted.

use std::cmp::Ordering;

/// A chunk of document text with its embedding.
struct IndexEntry {
    chunk: String,
    embedding: Vec<f32>,
}

/// Similarity index over embedded document chunks.
#[derive(Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, chunk: String, embedding: Vec<f32>) {
        self.entries.push(IndexEntry { chunk, embedding });
    }

    /// Top-k chunks by cosine similarity to the query embedding.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    cosine_similarity(query, &entry.embedding),
                    entry.chunk.as_str(),
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
