// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the xAI Grok chat completions API.
//!
//! Grok is the default generalist provider and the single fallback target,
//! so this client is text-only and single-attempt. Live web search is
//! requested through `search_parameters` when the question asks about
//! current regulation status.

use std::time::Duration;

use async_trait::async_trait;
use nadzor_core::traits::{CompletionProvider, PluginAdapter};
use nadzor_core::{
    AdapterType, Completion, CompletionRequest, HealthStatus, NadzorError, ProviderErrorKind,
    TokenUsage,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, SearchParameters,
};

/// Base URL for the xAI API.
const API_BASE_URL: &str = "https://api.x.ai/v1";

/// Sampling temperature for supervision answers.
const TEMPERATURE: f32 = 0.7;

/// HTTP client for xAI Grok API communication.
#[derive(Debug, Clone)]
pub struct GrokClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl GrokClient {
    /// Creates a new Grok API client.
    pub fn new(api_key: &str, model: String, timeout_secs: u64) -> Result<Self, NadzorError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| NadzorError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
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

    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NadzorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
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
        debug!(status = %status, model = %self.model, "xai response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NadzorError::Provider {
                kind: kind_for_status(status),
                message: format!("xAI API returned {status}: {body}"),
                source: None,
            });
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| NadzorError::Provider {
                kind: ProviderErrorKind::Malformed,
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: TEMPERATURE,
            search_parameters: request.live_search.then(SearchParameters::default),
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
impl PluginAdapter for GrokClient {
    fn name(&self) -> &str {
        "xai"
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
impl CompletionProvider for GrokClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, NadzorError> {
        if request.image.is_some() {
            return Err(NadzorError::Provider {
                kind: ProviderErrorKind::Other,
                message: "grok provider does not accept image input".to_string(),
                source: None,
            });
        }

        let api_request = self.build_request(&request);
        let response = self.chat_completion(&api_request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| NadzorError::Provider {
                kind: ProviderErrorKind::Malformed,
                message: "xAI response contained no choices".to_string(),
                source: None,
            })?
            .to_string();

        Ok(Completion {
            text,
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}
