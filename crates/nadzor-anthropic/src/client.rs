// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Single-attempt client: the fallback executor owns failure handling, so
//! there is no client-level retry. Failures are mapped to
//! [`ProviderErrorKind`] so timeouts, auth failures, and quota exhaustion
//! are logged distinctly.

use std::time::Duration;

use async_trait::async_trait;
use nadzor_core::traits::{CompletionProvider, PluginAdapter};
use nadzor_core::{
    AdapterType, Completion, CompletionRequest, HealthStatus, NadzorError, ProviderErrorKind, Role,
    TokenUsage,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    ApiContent, ApiContentBlock, ApiErrorResponse, ApiMessage, ImageSource, MessageRequest,
    MessageResponse,
};

/// Base URL for the Anthropic Messages API.
const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Sampling temperature for supervision answers.
const TEMPERATURE: f32 = 0.7;

/// HTTP client for Anthropic API communication.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client.
    pub fn new(
        api_key: &str,
        api_version: &str,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, NadzorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| NadzorError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                NadzorError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NadzorError::Provider {
                kind: ProviderErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            model,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a Messages API request and returns the parsed response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, NadzorError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    ProviderErrorKind::Timeout
                } else {
                    ProviderErrorKind::Other
                };
                NadzorError::Provider {
                    kind,
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            })?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "anthropic response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "Anthropic API error ({}): {}",
                    api_err.error.type_, api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(NadzorError::Provider {
                kind: kind_for_status(status),
                message,
                source: None,
            });
        }

        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| NadzorError::Provider {
                kind: ProviderErrorKind::Malformed,
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })
    }

    fn build_request(&self, request: &CompletionRequest) -> MessageRequest {
        let last_user_index = request
            .messages
            .iter()
            .rposition(|m| m.role == Role::User);

        let messages = request
            .messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let attach_image = Some(i) == last_user_index;
                let content = match (&request.image, attach_image) {
                    (Some(photo), true) => ApiContent::Blocks(vec![
                        ApiContentBlock::Image {
                            source: ImageSource::base64(
                                photo.mime_type.clone(),
                                photo.data.clone(),
                            ),
                        },
                        ApiContentBlock::Text {
                            text: m.content.clone(),
                        },
                    ]),
                    _ => ApiContent::Text(m.content.clone()),
                };
                ApiMessage {
                    role: m.role.to_string(),
                    content,
                }
            })
            .collect();

        MessageRequest {
            model: self.model.clone(),
            messages,
            system: (!request.system.is_empty()).then(|| request.system.clone()),
            max_tokens: request.max_tokens,
            temperature: Some(TEMPERATURE),
        }
    }
}

/// Map an HTTP status to a provider failure kind.
fn kind_for_status(status: reqwest::StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::QuotaExceeded,
        _ => ProviderErrorKind::Other,
    }
}

#[async_trait]
impl PluginAdapter for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NadzorError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, NadzorError> {
        let api_request = self.build_request(&request);
        let response = self.complete_message(&api_request).await?;
        Ok(Completion {
            text: response.text(),
            usage: Some(TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            }),
        })
    }
}
