// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the StroiNadzor agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level StroiNadzor configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NadzorConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Anthropic (Claude) API settings -- technical questions and photo analysis.
    #[serde(default)]
    pub claude: ClaudeConfig,

    /// xAI (Grok) API settings -- the generalist default and fallback provider.
    #[serde(default)]
    pub grok: GrokConfig,

    /// Gemini API settings -- drawing prompt and image generation.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Normative corpus retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Request classification and routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "nadzor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables Telegram integration.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// List of allowed Telegram user IDs. Empty means everyone is allowed.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Anthropic (Claude) API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClaudeConfig {
    /// Anthropic API key. `None` disables the Claude provider; technical and
    /// defect-photo categories then fall straight to the default provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model for technical-normative questions.
    #[serde(default = "default_claude_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_claude_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_claude_api_version")]
    pub api_version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_claude_model(),
            max_tokens: default_claude_max_tokens(),
            api_version: default_claude_api_version(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_claude_max_tokens() -> u32 {
    2500
}

fn default_claude_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    120
}

/// xAI (Grok) API configuration.
///
/// Grok is the default provider and the single fallback target; the agent
/// refuses to start without an API key here (the fallback chain must be total).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GrokConfig {
    /// xAI API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model for generic questions and fallback answers.
    #[serde(default = "default_grok_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_grok_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GrokConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_grok_model(),
            max_tokens: default_grok_max_tokens(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_grok_model() -> String {
    "grok-2-latest".to_string()
}

fn default_grok_max_tokens() -> u32 {
    1000
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` disables the drawing pipeline; drawing
    /// requests then fall straight to the default provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model for structured drawing-prompt generation.
    #[serde(default = "default_gemini_text_model")]
    pub text_model: String,

    /// Model for drawing image generation.
    #[serde(default = "default_gemini_image_model")]
    pub image_model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: default_gemini_text_model(),
            image_model: default_gemini_image_model(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_gemini_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file (conversation history + routing ledger).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("nadzor").join("nadzor.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("nadzor.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Normative corpus retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Enable retrieval grounding. When false, all prompts are ungrounded.
    #[serde(default = "default_retrieval_enabled")]
    pub enabled: bool,

    /// Path to the pre-populated fragment index (SQLite).
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Collection labels to search. Empty means all collections.
    #[serde(default)]
    pub collections: Vec<String>,

    /// Number of fragments to retrieve per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum relevance score (0.0-1.0) for a fragment to be returned.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,

    /// Embeddings endpoint (OpenAI-compatible `/v1/embeddings`).
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,

    /// API key for the embeddings endpoint.
    #[serde(default)]
    pub embedding_api_key: Option<String>,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensionality of the index vectors.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: default_retrieval_enabled(),
            index_path: default_index_path(),
            collections: Vec::new(),
            top_k: default_top_k(),
            min_relevance: default_min_relevance(),
            embedding_url: default_embedding_url(),
            embedding_api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_retrieval_enabled() -> bool {
    true
}

fn default_index_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("nadzor").join("norms.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("norms.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_top_k() -> usize {
    5
}

fn default_min_relevance() -> f64 {
    0.7
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

/// Request classification and routing configuration.
///
/// The classifier precedence order is heuristic, not fixed: operators can
/// reorder the non-generic categories here. `generic` is always the implicit
/// last resort and cannot appear in the list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Category check order. Valid entries: "defect_photo", "drawing", "technical".
    #[serde(default = "default_precedence")]
    pub precedence: Vec<String>,

    /// Number of recent conversation messages included in prompts.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            precedence: default_precedence(),
            history_window: default_history_window(),
        }
    }
}

fn default_precedence() -> Vec<String> {
    vec![
        "defect_photo".to_string(),
        "drawing".to_string(),
        "technical".to_string(),
    ]
}

fn default_history_window() -> usize {
    10
}
