// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP embedding client for an OpenAI-compatible embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use nadzor_core::traits::{EmbeddingAdapter, PluginAdapter};
use nadzor_core::{AdapterType, HealthStatus, NadzorError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request timeout for embedding calls. Embeddings are small and fast;
/// anything slower than this is effectively an outage.
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbeddingApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding adapter backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Create an embedder for the given endpoint and model.
    pub fn new(
        url: String,
        api_key: String,
        model: String,
        dimensions: usize,
    ) -> Result<Self, NadzorError> {
        let client = reqwest::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .map_err(|e| NadzorError::Retrieval {
                message: format!("failed to build embedding HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url,
            api_key,
            model,
            dimensions,
        })
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
        // No cheap probe endpoint; configuration is the only local check.
        if self.api_key.is_empty() {
            return Ok(HealthStatus::Unhealthy("missing API key".to_string()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NadzorError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NadzorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingApiRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NadzorError::Retrieval {
                message: format!("embedding request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NadzorError::Retrieval {
                message: format!("embedding API returned {status}: {body}"),
            });
        }

        let body: EmbeddingApiResponse =
            response.json().await.map_err(|e| NadzorError::Retrieval {
                message: format!("failed to parse embedding response: {e}"),
            })?;

        // The API may return data out of order; restore input order.
        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        debug!(count = data.len(), "embeddings received");

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
