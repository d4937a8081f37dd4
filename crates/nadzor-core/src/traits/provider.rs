// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter traits for upstream LLM integrations (Claude, Grok, Gemini).

use async_trait::async_trait;

use crate::error::NadzorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Completion, CompletionRequest, GeneratedImage};

/// Adapter for text-completion provider integrations.
///
/// The fallback executor is polymorphic over this trait: the routed primary
/// provider and the default fallback provider both expose the same contract.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Sends a completion request and returns the full response.
    ///
    /// Implementations must map upstream failures to
    /// [`NadzorError::Provider`] with an accurate
    /// [`crate::error::ProviderErrorKind`] so the executor can log timeouts,
    /// auth failures, and quota exhaustion distinctly.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, NadzorError>;
}

/// Adapter for image-generation provider integrations.
///
/// Used by the drawing pipeline: a structured drawing prompt produced by a
/// text provider is handed here to render the actual image.
#[async_trait]
pub trait ImageProvider: PluginAdapter {
    /// Generates an image for the given prompt.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NadzorError>;
}
