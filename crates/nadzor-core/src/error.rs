// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the StroiNadzor agent.

use thiserror::Error;

/// Classifies a provider failure for logging and fallback accounting.
///
/// All kinds trigger the same single fallback transition; they are kept
/// separate so operators can tell quota exhaustion apart from timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The upstream call exceeded its deadline.
    Timeout,
    /// Authentication rejected (invalid or expired API key).
    Auth,
    /// Provider-side quota or rate limit exhausted.
    QuotaExceeded,
    /// Response received but could not be parsed.
    Malformed,
    /// Any other provider-side failure.
    Other,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Auth => write!(f, "auth"),
            ProviderErrorKind::QuotaExceeded => write!(f, "quota_exceeded"),
            ProviderErrorKind::Malformed => write!(f, "malformed"),
            ProviderErrorKind::Other => write!(f, "other"),
        }
    }
}

/// The primary error type used across all StroiNadzor adapter traits and core operations.
#[derive(Debug, Error)]
pub enum NadzorError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, message format, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Upstream LLM provider errors (API failure, timeout, quota).
    #[error("provider error ({kind}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The vector index is unreachable or rejected the query.
    ///
    /// Always absorbed by the executor: retrieval failure degrades the
    /// request to an ungrounded prompt, it never fails the request.
    #[error("retrieval unavailable: {message}")]
    Retrieval { message: String },

    /// Both the primary and the fallback provider call failed.
    ///
    /// The only error that crosses the core boundary to the channel adapter.
    #[error("terminal failure: {message}")]
    Terminal { message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NadzorError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        NadzorError::Provider {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Returns the provider failure kind, if this is a provider error.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            NadzorError::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_kind() {
        let err = NadzorError::provider(ProviderErrorKind::Timeout, "deadline exceeded");
        assert_eq!(
            err.to_string(),
            "provider error (timeout): deadline exceeded"
        );
    }

    #[test]
    fn provider_kind_accessor() {
        let err = NadzorError::provider(ProviderErrorKind::QuotaExceeded, "429");
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::QuotaExceeded));

        let other = NadzorError::Internal("x".into());
        assert_eq!(other.provider_kind(), None);
    }

    #[test]
    fn terminal_failure_display() {
        let err = NadzorError::Terminal {
            message: "all providers failed".into(),
        };
        assert_eq!(err.to_string(), "terminal failure: all providers failed");
    }
}
