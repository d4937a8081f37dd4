// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval domain types and vector helpers.

use serde::{Deserialize, Serialize};

/// A normative document fragment returned by a similarity search.
///
/// Produced fresh per query; never persisted by the request pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedFragment {
    /// Normative document identifier (e.g., "СП 63.13330.2018").
    pub document_id: String,
    /// Section or clause label within the document (e.g., "п. 10.3.2").
    pub section_label: String,
    /// Fragment text.
    pub text: String,
    /// Similarity score in 0.0-1.0, higher is more relevant.
    pub relevance_score: f32,
}

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Compute cosine similarity between two vectors of the same length.
///
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vectors must have same length");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
