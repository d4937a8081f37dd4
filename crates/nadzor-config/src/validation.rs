// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as precedence-list contents, relevance bounds, and
//! the totality of the fallback chain.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::NadzorConfig;

/// Category names allowed in `routing.precedence`.
///
/// `generic` is intentionally absent: it is the implicit last resort.
const ROUTABLE_CATEGORIES: &[&str] = &["defect_photo", "drawing", "technical"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NadzorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Telegram token, when present, must not be blank
    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be blank (omit the key to disable Telegram)"
                .to_string(),
        });
    }

    // Provider token limits must be positive
    if config.claude.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "claude.max_tokens must be positive".to_string(),
        });
    }
    if config.grok.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "grok.max_tokens must be positive".to_string(),
        });
    }

    // Retrieval bounds
    if config.retrieval.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.top_k must be at least 1".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&config.retrieval.min_relevance) {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.min_relevance must be within 0.0-1.0, got {}",
                config.retrieval.min_relevance
            ),
        });
    }
    if config.retrieval.embedding_dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.embedding_dimensions must be positive".to_string(),
        });
    }

    // Routing precedence: known categories, no duplicates
    let mut seen = HashSet::new();
    for entry in &config.routing.precedence {
        if !ROUTABLE_CATEGORIES.contains(&entry.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "routing.precedence entry `{entry}` is not a routable category \
                     (valid: defect_photo, drawing, technical)"
                ),
            });
        }
        if !seen.insert(entry.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate entry `{entry}` in routing.precedence"),
            });
        }
    }

    if config.routing.history_window == 0 {
        errors.push(ConfigError::Validation {
            message: "routing.history_window must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
