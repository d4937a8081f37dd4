// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini generateContent API.
//!
//! One client serves both halves of the drawing pipeline: text completion
//! with `text_model` (structured drawing prompt) and image generation with
//! `image_model` (inline base64 PNG in the response parts).

use std::time::Duration;

use async_trait::async_trait;
use nadzor_core::traits::{CompletionProvider, ImageProvider, PluginAdapter};
use nadzor_core::{
    AdapterType, Completion, CompletionRequest, GeneratedImage, HealthStatus, NadzorError,
    ProviderErrorKind, Role, TokenUsage,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};

/// Base URL for the Gemini REST API.
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sampling temperature for drawing-prompt generation.
const TEMPERATURE: f32 = 0.7;

/// Token cap for text completions through the drawing pipeline.
const TEXT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    text_model: String,
    image_model: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new Gemini API client.
    pub fn new(
        api_key: &str,
        text_model: String,
        image_model: String,
        timeout_secs: u64,
    ) -> Result<Self, NadzorError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| NadzorError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
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
            text_model,
            image_model,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, NadzorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
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
        debug!(status = %status, model, "gemini response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NadzorError::Provider {
                kind: kind_for_status(status),
                message: format!("Gemini API returned {status}: {body}"),
                source: None,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| NadzorError::Provider {
                kind: ProviderErrorKind::Malformed,
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })
    }

    fn build_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let last_user_index = request
            .messages
            .iter()
            .rposition(|m| m.role == Role::User);

        let contents = request
            .messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                // Gemini names the assistant turn "model".
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                let mut parts = vec![Part::text(m.content.clone())];
                if let (Some(photo), true) = (&request.image, Some(i) == last_user_index) {
                    parts.push(Part::inline_image(
                        photo.mime_type.clone(),
                        photo.data.clone(),
                    ));
                }
                Content {
                    role: Some(role.to_string()),
                    parts,
                }
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction: (!request.system.is_empty())
                .then(|| Content::system(request.system.clone())),
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(request.max_tokens),
                temperature: Some(TEMPERATURE),
                response_modalities: None,
            }),
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
impl PluginAdapter for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
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
impl CompletionProvider for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, NadzorError> {
        let api_request = self.build_request(&request);
        let response = self.generate_content(&self.text_model, &api_request).await?;
        let text = response.first_text().ok_or_else(|| NadzorError::Provider {
            kind: ProviderErrorKind::Malformed,
            message: "Gemini response contained no text candidate".to_string(),
            source: None,
        })?;

        Ok(Completion {
            text,
            usage: response.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        })
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NadzorError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(TEXT_MAX_OUTPUT_TOKENS),
                temperature: Some(TEMPERATURE),
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            }),
        };

        let response = self.generate_content(&self.image_model, &request).await?;
        let image = response.first_image().ok_or_else(|| NadzorError::Provider {
            kind: ProviderErrorKind::Malformed,
            message: "Gemini response contained no inline image".to_string(),
            source: None,
        })?;

        Ok(GeneratedImage {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
            description: response.first_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use nadzor_core::{PhotoData, PromptMessage};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new(
            "test-api-key",
            "gemini-2.5-flash".into(),
            "gemini-2.5-flash-image".into(),
            30,
        )
        .unwrap()
        .with_base_url(base_url.to_string())
    }

    fn completion_request(text: &str) -> CompletionRequest {
        CompletionRequest {
            system: "Технический иллюстратор.".into(),
            messages: vec![PromptMessage {
                role: Role::User,
                content: text.into(),
            }],
            max_tokens: 1024,
            live_search: false,
            image: None,
        }
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 30}
        })
    }

    #[tokio::test]
    async fn complete_uses_text_model_and_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Описание схемы.")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let completion = client
            .complete(completion_request("Нарисуй узел опирания плиты"))
            .await
            .unwrap();

        assert_eq!(completion.text, "Описание схемы.");
        let usage = completion.usage.unwrap();
        assert_eq!(usage.input_tokens, 8);
        assert_eq!(usage.output_tokens, 30);
    }

    #[tokio::test]
    async fn photo_becomes_inline_data_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Что на фото?"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "aGVsbG8="}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Кладка.")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let mut request = completion_request("Что на фото?");
        request.image = Some(PhotoData {
            mime_type: "image/jpeg".into(),
            data: "aGVsbG8=".into(),
        });
        client.complete(request).await.unwrap();
    }

    #[tokio::test]
    async fn generate_image_uses_image_model_and_modalities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [
                        {"text": "Схема узла."},
                        {"inlineData": {"mimeType": "image/png", "data": "aW1n"}}
                    ]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let image = client.generate_image("узел опирания плиты").await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "aW1n");
        assert_eq!(image.description.as_deref(), Some("Схема узла."));
    }

    #[tokio::test]
    async fn missing_image_part_maps_to_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("только текст")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.generate_image("узел").await.unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Malformed));
    }

    #[tokio::test]
    async fn quota_error_maps_to_quota_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .complete(completion_request("вопрос"))
            .await
            .unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::QuotaExceeded));
    }

    #[tokio::test]
    async fn blocked_candidate_maps_to_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .complete(completion_request("вопрос"))
            .await
            .unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Malformed));
    }
}
