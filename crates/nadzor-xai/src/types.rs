// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! xAI chat completions request/response types (OpenAI-compatible shape).

use serde::{Deserialize, Serialize};

/// A request to the xAI chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g., "grok-2-latest").
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Live web search configuration, present only when search is wanted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<SearchParameters>,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Live search configuration for Grok.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParameters {
    /// Search mode ("auto" lets the model decide whether to search).
    pub mode: String,
    /// Whether to return source citations.
    pub return_citations: bool,
    /// Sources to search.
    pub sources: Vec<SearchSource>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            mode: "auto".to_string(),
            return_citations: true,
            sources: vec![
                SearchSource {
                    source_type: "web".to_string(),
                },
                SearchSource {
                    source_type: "news".to_string(),
                },
            ],
        }
    }
}

/// A single search source entry.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSource {
    /// Source kind ("web", "news").
    #[serde(rename = "type")]
    pub source_type: String,
}

/// A full response from the chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion choices; the first one carries the answer.
    pub choices: Vec<ChatChoice>,
    /// Token usage statistics.
    pub usage: Option<ChatUsage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if present.
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChatMessage,
    /// Reason the generation stopped.
    pub finish_reason: Option<String>,
}

/// Token usage statistics (OpenAI naming).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
}
