// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./nadzor.toml` > `~/.config/nadzor/nadzor.toml` > `/etc/nadzor/nadzor.toml`
//! with environment variable overrides via `NADZOR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::NadzorConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/nadzor/nadzor.toml` (system-wide)
/// 3. `~/.config/nadzor/nadzor.toml` (user XDG config)
/// 4. `./nadzor.toml` (local directory)
/// 5. `NADZOR_*` environment variables
pub fn load_config() -> Result<NadzorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NadzorConfig::default()))
        .merge(Toml::file("/etc/nadzor/nadzor.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("nadzor/nadzor.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("nadzor.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<NadzorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NadzorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NadzorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NadzorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `NADZOR_TELEGRAM_BOT_TOKEN`
/// must map to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("NADZOR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: NADZOR_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("claude_", "claude.", 1)
            .replacen("grok_", "grok.", 1)
            .replacen("gemini_", "gemini.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("retrieval_", "retrieval.", 1)
            .replacen("routing_", "routing.", 1);
        mapped.into()
    })
}
