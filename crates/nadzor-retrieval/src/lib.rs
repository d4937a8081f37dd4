// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normative document retrieval for the StroiNadzor agent.
//!
//! This crate provides:
//! - [`FragmentStore`]: read-only SQLite fragment index with BLOB embeddings
//! - [`HttpEmbedder`]: OpenAI-compatible embeddings client
//! - [`NormRetriever`]: cosine similarity search with a relevance threshold
//!
//! Retrieval feeds the grounded prompt for technical questions. A failure
//! anywhere in this crate degrades the request to an ungrounded prompt; it
//! never fails the request itself.

pub mod embedder;
pub mod retriever;
pub mod store;
pub mod types;

pub use embedder::HttpEmbedder;
pub use retriever::NormRetriever;
pub use store::FragmentStore;
pub use types::{RetrievedFragment, blob_to_vec, cosine_similarity, vec_to_blob};
