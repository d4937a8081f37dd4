// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider routing from classified requests to upstream LLM providers.
//!
//! The routing table is built once at construction from the provider
//! configuration. Categories whose provider is not configured fall through
//! to the default provider, so the table is total by construction.

use std::collections::HashMap;
use std::sync::Arc;

use nadzor_config::NadzorConfig;
use nadzor_core::RoutingRecord;
use nadzor_core::traits::RoutingSink;
use strum::Display;
use tracing::{debug, info};

use crate::classifier::{Classification, RequestCategory};

/// Upstream provider variants the executor can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    /// Claude for technical-normative questions (grounded).
    ClaudeTechnical,
    /// Claude with vision input for defect photo analysis.
    ClaudeVision,
    /// Gemini two-step drawing generation.
    GeminiImage,
    /// Grok, the generalist default and the fallback target.
    GrokDefault,
}

/// System prompt template selected per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Normative expert answer with document citations.
    TechnicalNormative,
    /// Structured defect analysis of an attached photo.
    DefectAnalysis,
    /// Structured drawing description for image generation.
    DrawingSpec,
    /// Generalist construction assistant.
    Generalist,
}

/// A routing decision for one classified request.
#[derive(Debug, Clone)]
pub struct ProviderDecision {
    /// Provider that should serve the request.
    pub provider: ProviderKind,
    /// System prompt template for the primary attempt.
    pub template: PromptTemplate,
    /// Pre-call cost estimate in USD, for the observability record.
    pub estimated_cost_usd: f64,
    /// Whether the prompt should be grounded with retrieved fragments.
    pub needs_grounding: bool,
}

/// Which providers are configured, with their model names.
///
/// Built explicitly from the loaded configuration; a provider without an
/// API key is absent here and its categories route to the default.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Claude model, when an Anthropic API key is configured.
    pub claude_model: Option<String>,
    /// Gemini image model, when a Gemini API key is configured.
    pub gemini_image_model: Option<String>,
    /// Grok model. The default provider is always configured; startup
    /// refuses to run without it.
    pub grok_model: String,
}

impl ProvidersConfig {
    /// Derive provider availability from the loaded configuration.
    pub fn from_config(config: &NadzorConfig) -> Self {
        Self {
            claude_model: config
                .claude
                .api_key
                .as_ref()
                .map(|_| config.claude.model.clone()),
            gemini_image_model: config
                .gemini
                .api_key
                .as_ref()
                .map(|_| config.gemini.image_model.clone()),
            grok_model: config.grok.model.clone(),
        }
    }
}

/// Maps classifications to provider decisions and emits routing records.
pub struct ProviderRouter {
    table: HashMap<RequestCategory, ProviderDecision>,
    default_decision: ProviderDecision,
    sink: Option<Arc<dyn RoutingSink>>,
}

impl ProviderRouter {
    /// Build the routing table from provider availability.
    pub fn new(providers: &ProvidersConfig) -> Self {
        let grok_cost = nadzor_cost::estimate_call_cost(&providers.grok_model);
        let default_decision = ProviderDecision {
            provider: ProviderKind::GrokDefault,
            template: PromptTemplate::Generalist,
            estimated_cost_usd: grok_cost,
            needs_grounding: false,
        };

        let mut table = HashMap::new();

        if let Some(model) = &providers.claude_model {
            let cost = nadzor_cost::estimate_call_cost(model);
            table.insert(
                RequestCategory::Technical,
                ProviderDecision {
                    provider: ProviderKind::ClaudeTechnical,
                    template: PromptTemplate::TechnicalNormative,
                    estimated_cost_usd: cost,
                    needs_grounding: true,
                },
            );
            table.insert(
                RequestCategory::DefectPhoto,
                ProviderDecision {
                    provider: ProviderKind::ClaudeVision,
                    template: PromptTemplate::DefectAnalysis,
                    estimated_cost_usd: cost,
                    needs_grounding: false,
                },
            );
        } else {
            info!("Claude not configured, technical and photo requests route to default");
        }

        if let Some(model) = &providers.gemini_image_model {
            table.insert(
                RequestCategory::Drawing,
                ProviderDecision {
                    provider: ProviderKind::GeminiImage,
                    template: PromptTemplate::DrawingSpec,
                    estimated_cost_usd: nadzor_cost::estimate_call_cost(model),
                    needs_grounding: false,
                },
            );
        } else {
            info!("Gemini not configured, drawing requests route to default");
        }

        Self {
            table,
            default_decision,
            sink: None,
        }
    }

    /// Attach an observability sink for routing records.
    pub fn with_sink(mut self, sink: Arc<dyn RoutingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Map a classification to a provider decision.
    ///
    /// Pure lookup: the same classification always yields the same decision.
    pub fn route(&self, classification: &Classification) -> ProviderDecision {
        self.table
            .get(&classification.category)
            .unwrap_or(&self.default_decision)
            .clone()
    }

    /// Route a classification and emit a routing record.
    ///
    /// Record delivery is fire-and-forget on a spawned task; a failing sink
    /// is logged at debug level and never affects the decision.
    pub fn route_and_record(
        &self,
        user_id: i64,
        classification: &Classification,
    ) -> ProviderDecision {
        let decision = self.route(classification);

        debug!(
            user_id,
            category = %classification.category,
            provider = %decision.provider,
            urgent = classification.urgent,
            reason = classification.reason,
            "request routed"
        );

        if let Some(sink) = &self.sink {
            let sink = Arc::clone(sink);
            let record = RoutingRecord {
                user_id,
                category: classification.category.to_string(),
                provider: decision.provider.to_string(),
                reason: classification.reason.to_string(),
                estimated_cost_usd: decision.estimated_cost_usd,
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            tokio::spawn(async move {
                if let Err(e) = sink.record(record).await {
                    debug!(error = %e, "routing record dropped");
                }
            });
        }

        decision
    }
}
