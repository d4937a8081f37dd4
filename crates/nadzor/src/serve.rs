// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nadzor serve` command implementation.
//!
//! Wires the Telegram channel, the classifier/router pair, the configured
//! providers, conversation history, the routing ledger, and optional
//! normative retrieval into the serve loop. Each inbound request runs in
//! its own task so one slow provider call never blocks polling.

use std::sync::Arc;

use nadzor_anthropic::AnthropicClient;
use nadzor_config::model::NadzorConfig;
use nadzor_core::NadzorError;
use nadzor_core::traits::{ChannelAdapter, PluginAdapter, RoutingSink};
use nadzor_core::OutboundReply;
use nadzor_cost::RoutingLedger;
use nadzor_executor::{
    FallbackExecutor, FragmentSource, ImageHandle, ProviderHandle, ProviderSet,
};
use nadzor_gemini::GeminiClient;
use nadzor_history::SqliteContextStore;
use nadzor_retrieval::{FragmentStore, HttpEmbedder, NormRetriever};
use nadzor_router::{ProviderRouter, ProvidersConfig, RequestClassifier};
use nadzor_telegram::TelegramChannel;
use nadzor_xai::GrokClient;
use tracing::{error, info, warn};

use crate::shutdown;

/// Token cap for the drawing-spec completion step.
const GEMINI_SPEC_MAX_TOKENS: u32 = 2048;

/// Reply sent when both the primary and the fallback attempt failed.
const TERMINAL_FAILURE_REPLY: &str =
    "⚠️ Не удалось получить ответ. Попробуйте ещё раз позже.";

/// Runs the `nadzor serve` command.
pub async fn run_serve(config: NadzorConfig) -> Result<(), NadzorError> {
    init_tracing(&config.agent.log_level);

    info!(agent = %config.agent.name, "starting nadzor serve");

    // Storage: conversation history and the routing ledger share one
    // database file but use separate connections.
    let context = Arc::new(SqliteContextStore::open(&config.storage).await?);
    let ledger = Arc::new(RoutingLedger::open(&config.storage.database_path).await?);

    // Providers. Grok is mandatory: it is the default provider and the
    // only fallback target.
    let grok_key = config.grok.api_key.as_deref().ok_or_else(|| {
        NadzorError::Config("grok.api_key is required (default and fallback provider)".into())
    })?;
    let grok_client = Arc::new(GrokClient::new(
        grok_key,
        config.grok.model.clone(),
        config.grok.timeout_secs,
    )?);
    let grok = ProviderHandle::new(
        grok_client,
        config.grok.max_tokens,
        config.grok.timeout_secs,
    );

    let claude = match config.claude.api_key.as_deref() {
        Some(key) => {
            let client = Arc::new(AnthropicClient::new(
                key,
                &config.claude.api_version,
                config.claude.model.clone(),
                config.claude.timeout_secs,
            )?);
            info!(model = %config.claude.model, "claude provider configured");
            Some(ProviderHandle::new(
                client,
                config.claude.max_tokens,
                config.claude.timeout_secs,
            ))
        }
        None => {
            info!("claude provider not configured, technical and photo categories use the default");
            None
        }
    };

    let (gemini_text, gemini_image) = match config.gemini.api_key.as_deref() {
        Some(key) => {
            let client = Arc::new(GeminiClient::new(
                key,
                config.gemini.text_model.clone(),
                config.gemini.image_model.clone(),
                config.gemini.timeout_secs,
            )?);
            info!(model = %config.gemini.image_model, "gemini drawing pipeline configured");
            (
                Some(ProviderHandle::new(
                    client.clone(),
                    GEMINI_SPEC_MAX_TOKENS,
                    config.gemini.timeout_secs,
                )),
                Some(ImageHandle::new(client, config.gemini.timeout_secs)),
            )
        }
        None => {
            info!("gemini provider not configured, drawing requests use the default");
            (None, None)
        }
    };

    // Optional normative retrieval.
    let retriever: Option<Arc<dyn FragmentSource>> = if config.retrieval.enabled {
        let store = Arc::new(FragmentStore::open(&config.retrieval.index_path).await?);
        let embedder = Arc::new(HttpEmbedder::new(
            config.retrieval.embedding_url.clone(),
            config.retrieval.embedding_api_key.clone().unwrap_or_default(),
            config.retrieval.embedding_model.clone(),
            config.retrieval.embedding_dimensions,
        )?);
        info!(
            index = %config.retrieval.index_path,
            collections = config.retrieval.collections.len(),
            "normative retrieval enabled"
        );
        Some(Arc::new(NormRetriever::new(
            store,
            embedder,
            config.retrieval.clone(),
        )))
    } else {
        info!("normative retrieval disabled, technical prompts run ungrounded");
        None
    };

    // Classification and routing.
    let classifier = RequestClassifier::with_precedence(&config.routing.precedence);
    let router = Arc::new(
        ProviderRouter::new(&ProvidersConfig::from_config(&config))
            .with_sink(ledger.clone() as Arc<dyn RoutingSink>),
    );

    let executor = Arc::new(FallbackExecutor::new(
        ProviderSet {
            claude,
            gemini_text,
            gemini_image,
            grok,
        },
        retriever,
        context.clone(),
        config.routing.history_window,
    ));

    // Channel.
    let mut channel = TelegramChannel::new(config.telegram.clone())?;
    channel.connect().await?;
    let channel = Arc::new(channel);

    let cancel = shutdown::install_signal_handler();

    info!("nadzor serve ready");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("serve loop shutting down");
                break;
            }
            inbound = channel.receive() => {
                let request = match inbound {
                    Ok(request) => request,
                    Err(e) => {
                        error!(error = %e, "inbound channel failed, shutting down");
                        break;
                    }
                };

                let classification =
                    classifier.classify(request.text.as_deref(), request.has_photo());
                let decision = router.route_and_record(request.user_id, &classification);

                let executor = executor.clone();
                let channel = channel.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let chat_id = request.chat_id.clone();
                    match executor.execute(&request, &decision, &cancel).await {
                        Ok(answer) => {
                            let reply = OutboundReply {
                                chat_id,
                                text: answer.text.clone(),
                                image: answer.image.clone(),
                            };
                            if let Err(e) = channel.send(reply).await {
                                error!(error = %e, "failed to deliver answer");
                            }
                        }
                        Err(NadzorError::Terminal { message }) => {
                            warn!(user_id = request.user_id, %message, "request failed terminally");
                            let reply = OutboundReply {
                                chat_id,
                                text: TERMINAL_FAILURE_REPLY.to_string(),
                                image: None,
                            };
                            if let Err(e) = channel.send(reply).await {
                                error!(error = %e, "failed to deliver failure notice");
                            }
                        }
                        Err(e) => {
                            warn!(user_id = request.user_id, error = %e, "request aborted");
                        }
                    }
                });
            }
        }
    }

    // Adapter shutdown in reverse wiring order.
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }
    if let Err(e) = ledger.shutdown().await {
        warn!(error = %e, "ledger shutdown failed");
    }
    if let Err(e) = context.shutdown().await {
        warn!(error = %e, "context store shutdown failed");
    }

    info!("nadzor serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nadzor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
