// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for query vectorization.

use async_trait::async_trait;

use crate::error::NadzorError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for text embedding backends used by the vector retriever.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Embeds a batch of texts, returning one vector per input text.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NadzorError>;

    /// Dimensionality of the vectors this adapter produces.
    fn dimensions(&self) -> usize;
}
