// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the StroiNadzor agent.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a delivered channel message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the agent wiring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    Embedding,
    Observability,
}

/// Role of a conversation message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A photo payload attached to an inbound request, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoData {
    /// MIME type of the image (e.g., "image/jpeg").
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// An inbound request delivered by the channel adapter.
///
/// Immutable once created. `text` and `photo` may both be absent for
/// malformed updates; the classifier treats that case as a generic question.
#[derive(Debug, Clone)]
pub struct Request {
    /// Telegram user identifier.
    pub user_id: i64,
    /// Chat the reply must be delivered to.
    pub chat_id: String,
    /// Message text or photo caption, if any.
    pub text: Option<String>,
    /// Attached photo in best available resolution, if any.
    pub photo: Option<PhotoData>,
    /// RFC 3339 receive timestamp.
    pub received_at: String,
}

impl Request {
    /// Whether the request carries a photo attachment.
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }
}

/// A single entry in a user's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Telegram user identifier the message belongs to.
    pub user_id: i64,
    /// Author role.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A successful answer produced by the executor.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Answer text (empty when the answer is image-only).
    pub text: String,
    /// Generated image for drawing requests, if any.
    pub image: Option<GeneratedImage>,
    /// Which provider produced the answer.
    pub provider: String,
    /// Whether the answer came from the fallback provider.
    pub via_fallback: bool,
    /// Token usage reported by the provider, if available.
    pub usage: Option<TokenUsage>,
}

/// A generated image returned by an image-generation provider.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// MIME type of the image (e.g., "image/png").
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
    /// Optional textual description accompanying the image.
    pub description: Option<String>,
}

/// Token usage reported by a provider for a single call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A reply to be delivered through the channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    /// Destination chat.
    pub chat_id: String,
    /// Reply text (caption when an image is attached).
    pub text: String,
    /// Generated image to attach, if any.
    pub image: Option<GeneratedImage>,
}

/// A single message in a provider prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Author role.
    pub role: Role,
    /// Message content.
    pub content: String,
}

/// A completion request handed to a [`crate::traits::CompletionProvider`].
///
/// Providers that do not support image input must reject requests carrying
/// an image instead of silently dropping it.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt text.
    pub system: String,
    /// Conversation messages, oldest first, ending with the user turn.
    pub messages: Vec<PromptMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Whether the provider should augment the answer with live web search
    /// (honored only by providers that support it).
    pub live_search: bool,
    /// Image attached to the final user turn, if any.
    pub image: Option<PhotoData>,
}

/// A completed provider response.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Token usage, if the provider reported it.
    pub usage: Option<TokenUsage>,
}

/// A structured routing-decision record for the observability sink.
///
/// Produced by the router for every decision; delivery is fire-and-forget
/// and must never block or fail the routing path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRecord {
    /// Telegram user identifier.
    pub user_id: i64,
    /// Classified request category ("technical", "drawing", ...).
    pub category: String,
    /// Provider chosen by the routing table.
    pub provider: String,
    /// Human-readable classification reason.
    pub reason: String,
    /// Estimated per-call cost in USD.
    pub estimated_cost_usd: f64,
    /// RFC 3339 decision timestamp.
    pub created_at: String,
}
