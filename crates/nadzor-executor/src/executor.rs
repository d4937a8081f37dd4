// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-fallback request execution.
//!
//! At most two provider calls per request: the routed primary attempt and a
//! single simplified fallback against Grok. Retrieval and history failures
//! degrade the prompt but never fail the request; only both attempts
//! failing surfaces an error, and that error is terminal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nadzor_core::traits::{CompletionProvider, ContextStore, ImageProvider, PluginAdapter};
use nadzor_core::{
    Answer, CompletionRequest, GeneratedImage, NadzorError, ProviderErrorKind, Request, Role,
};
use nadzor_retrieval::{NormRetriever, RetrievedFragment};
use nadzor_router::{needs_live_search, PromptTemplate, ProviderDecision, ProviderKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt;

/// Placeholder stored in history for an image-only answer.
const IMAGE_ONLY_PLACEHOLDER: &str = "[схема]";

/// Source of normative grounding fragments.
///
/// Seam for tests; the production implementation is [`NormRetriever`].
#[async_trait]
pub trait FragmentSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RetrievedFragment>, NadzorError>;
}

#[async_trait]
impl FragmentSource for NormRetriever {
    async fn search(&self, query: &str) -> Result<Vec<RetrievedFragment>, NadzorError> {
        NormRetriever::search(self, query).await
    }
}

/// A completion provider with its per-call limits.
#[derive(Clone)]
pub struct ProviderHandle {
    pub adapter: Arc<dyn CompletionProvider>,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ProviderHandle {
    pub fn new(adapter: Arc<dyn CompletionProvider>, max_tokens: u32, timeout_secs: u64) -> Self {
        Self {
            adapter,
            max_tokens,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// An image provider with its call timeout.
#[derive(Clone)]
pub struct ImageHandle {
    pub adapter: Arc<dyn ImageProvider>,
    pub timeout: Duration,
}

impl ImageHandle {
    pub fn new(adapter: Arc<dyn ImageProvider>, timeout_secs: u64) -> Self {
        Self {
            adapter,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// The wired provider adapters. Grok is mandatory: it is both the default
/// provider and the only fallback target.
#[derive(Clone)]
pub struct ProviderSet {
    pub claude: Option<ProviderHandle>,
    pub gemini_text: Option<ProviderHandle>,
    pub gemini_image: Option<ImageHandle>,
    pub grok: ProviderHandle,
}

/// Outcome of a single provider call, distinguishing cancellation from
/// provider failure so cancellation never triggers a fallback.
enum CallFailure {
    Cancelled,
    Provider(NadzorError),
}

/// Executes routed requests with a bounded single-fallback state machine.
pub struct FallbackExecutor {
    providers: ProviderSet,
    retriever: Option<Arc<dyn FragmentSource>>,
    context: Arc<dyn ContextStore>,
    history_window: usize,
}

impl FallbackExecutor {
    pub fn new(
        providers: ProviderSet,
        retriever: Option<Arc<dyn FragmentSource>>,
        context: Arc<dyn ContextStore>,
        history_window: usize,
    ) -> Self {
        Self {
            providers,
            retriever,
            context,
            history_window,
        }
    }

    /// Runs the full pipeline for one routed request.
    ///
    /// On success, exactly one user and one assistant message are appended
    /// to history, in that order. A cancelled or fully failed request
    /// appends nothing.
    pub async fn execute(
        &self,
        request: &Request,
        decision: &ProviderDecision,
        cancel: &CancellationToken,
    ) -> Result<Answer, NadzorError> {
        if cancel.is_cancelled() {
            return Err(cancelled_error());
        }

        let user_text = prompt::user_text(request);
        let history = match self.context.recent(request.user_id, self.history_window).await {
            Ok(history) => history,
            Err(e) => {
                warn!(user_id = request.user_id, error = %e, "history read failed, continuing without context");
                Vec::new()
            }
        };

        let primary = if decision.provider == ProviderKind::GeminiImage {
            self.run_drawing(&user_text, cancel).await
        } else {
            self.run_completion(request, decision, &history, &user_text, cancel)
                .await
        };

        let answer = match primary {
            Ok(answer) => answer,
            Err(CallFailure::Cancelled) => return Err(cancelled_error()),
            Err(CallFailure::Provider(primary_err)) => {
                warn!(
                    provider = %decision.provider,
                    error = %primary_err,
                    "primary attempt failed, falling back"
                );
                match self.run_fallback(&history, &user_text, cancel).await {
                    Ok(answer) => answer,
                    Err(CallFailure::Cancelled) => return Err(cancelled_error()),
                    Err(CallFailure::Provider(fallback_err)) => {
                        return Err(NadzorError::Terminal {
                            message: format!(
                                "primary failed ({primary_err}); fallback failed ({fallback_err})"
                            ),
                        });
                    }
                }
            }
        };

        self.record_exchange(request.user_id, &user_text, &answer)
            .await;
        Ok(answer)
    }

    async fn run_completion(
        &self,
        request: &Request,
        decision: &ProviderDecision,
        history: &[nadzor_core::ConversationMessage],
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer, CallFailure> {
        let (handle, supports_image, is_grok) = self.primary_handle(decision.provider);

        let grounding = if decision.needs_grounding {
            self.fetch_grounding(user_text).await
        } else {
            Vec::new()
        };

        let mut system = prompt::system_prompt(decision.template).to_string();
        system.push_str(&prompt::render_grounding(&grounding));

        let completion_request = CompletionRequest {
            system,
            messages: prompt::build_messages(history, user_text),
            max_tokens: handle.max_tokens,
            live_search: is_grok && needs_live_search(user_text),
            image: supports_image.then(|| request.photo.clone()).flatten(),
        };

        let completion = call_completion(&handle, completion_request, cancel).await?;
        Ok(Answer {
            text: completion.text,
            image: None,
            provider: handle.adapter.name().to_string(),
            via_fallback: false,
            usage: completion.usage,
        })
    }

    /// Two-step drawing pipeline: structured drawing prompt from the Gemini
    /// text model, then image generation.
    async fn run_drawing(
        &self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer, CallFailure> {
        let (Some(text_handle), Some(image_handle)) = (
            self.providers.gemini_text.clone(),
            self.providers.gemini_image.clone(),
        ) else {
            return Err(CallFailure::Provider(NadzorError::Provider {
                kind: ProviderErrorKind::Other,
                message: "drawing pipeline is not configured".to_string(),
                source: None,
            }));
        };

        let spec_request = CompletionRequest {
            system: prompt::system_prompt(PromptTemplate::DrawingSpec).to_string(),
            messages: prompt::build_messages(
                &[],
                &format!("Создай детальный промпт для генерации строительной схемы:\n\n\"{user_text}\""),
            ),
            max_tokens: text_handle.max_tokens,
            live_search: false,
            image: None,
        };

        let spec = call_completion(&text_handle, spec_request, cancel).await?;
        debug!(spec_len = spec.text.len(), "drawing prompt generated");

        let image = call_image(&image_handle, &spec.text, cancel).await?;
        let text = image.description.clone().unwrap_or_default();

        Ok(Answer {
            text,
            image: Some(image),
            provider: image_handle.adapter.name().to_string(),
            via_fallback: false,
            usage: spec.usage,
        })
    }

    /// Simplified single fallback against Grok: generalist prompt, no
    /// grounding, no image.
    async fn run_fallback(
        &self,
        history: &[nadzor_core::ConversationMessage],
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer, CallFailure> {
        let handle = self.providers.grok.clone();
        let completion_request = CompletionRequest {
            system: prompt::system_prompt(PromptTemplate::Generalist).to_string(),
            messages: prompt::build_messages(history, user_text),
            max_tokens: handle.max_tokens,
            live_search: needs_live_search(user_text),
            image: None,
        };

        let completion = call_completion(&handle, completion_request, cancel).await?;
        info!(provider = handle.adapter.name(), "fallback attempt succeeded");
        Ok(Answer {
            text: completion.text,
            image: None,
            provider: handle.adapter.name().to_string(),
            via_fallback: true,
            usage: completion.usage,
        })
    }

    /// Resolve the primary adapter for a routed provider, with whether it
    /// accepts image input and whether it honors live search.
    fn primary_handle(&self, provider: ProviderKind) -> (ProviderHandle, bool, bool) {
        match provider {
            ProviderKind::ClaudeTechnical | ProviderKind::ClaudeVision => {
                match &self.providers.claude {
                    Some(handle) => {
                        (handle.clone(), provider == ProviderKind::ClaudeVision, false)
                    }
                    None => (self.providers.grok.clone(), false, true),
                }
            }
            ProviderKind::GeminiImage | ProviderKind::GrokDefault => {
                (self.providers.grok.clone(), false, true)
            }
        }
    }

    async fn fetch_grounding(&self, query: &str) -> Vec<RetrievedFragment> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        match retriever.search(query).await {
            Ok(fragments) => {
                debug!(count = fragments.len(), "grounding fragments retrieved");
                fragments
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, degrading to ungrounded prompt");
                Vec::new()
            }
        }
    }

    async fn record_exchange(&self, user_id: i64, user_text: &str, answer: &Answer) {
        let assistant_content = if answer.text.is_empty() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            answer.text.clone()
        };
        if let Err(e) = self.context.append(user_id, Role::User, user_text).await {
            warn!(user_id, error = %e, "failed to append user message to history");
            return;
        }
        if let Err(e) = self
            .context
            .append(user_id, Role::Assistant, &assistant_content)
            .await
        {
            warn!(user_id, error = %e, "failed to append assistant message to history");
        }
    }
}

fn cancelled_error() -> NadzorError {
    NadzorError::Internal("request cancelled".to_string())
}

async fn call_completion(
    handle: &ProviderHandle,
    request: CompletionRequest,
    cancel: &CancellationToken,
) -> Result<nadzor_core::Completion, CallFailure> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CallFailure::Cancelled),
        result = tokio::time::timeout(handle.timeout, handle.adapter.complete(request)) => {
            match result {
                Ok(Ok(completion)) => Ok(completion),
                Ok(Err(e)) => Err(CallFailure::Provider(e)),
                Err(_) => Err(CallFailure::Provider(NadzorError::Provider {
                    kind: ProviderErrorKind::Timeout,
                    message: format!("provider {} timed out", handle.adapter.name()),
                    source: None,
                })),
            }
        }
    }
}

async fn call_image(
    handle: &ImageHandle,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<GeneratedImage, CallFailure> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CallFailure::Cancelled),
        result = tokio::time::timeout(handle.timeout, handle.adapter.generate_image(prompt)) => {
            match result {
                Ok(Ok(image)) => Ok(image),
                Ok(Err(e)) => Err(CallFailure::Provider(e)),
                Err(_) => Err(CallFailure::Provider(NadzorError::Provider {
                    kind: ProviderErrorKind::Timeout,
                    message: format!("provider {} timed out", handle.adapter.name()),
                    source: None,
                })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use nadzor_core::{
        AdapterType, Completion, ConversationMessage, HealthStatus, PhotoData, TokenUsage,
    };

    use super::*;

    struct ScriptedProvider {
        name: &'static str,
        script: Mutex<VecDeque<Result<Completion, NadzorError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, script: Vec<Result<Completion, NadzorError>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn ok(name: &'static str, text: &str) -> Arc<Self> {
            Self::new(name, vec![Ok(completion(text))])
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Self::new(name, vec![Err(provider_error())])
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> CompletionRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    fn completion(text: &str) -> Completion {
        Completion {
            text: text.to_string(),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            }),
        }
    }

    fn provider_error() -> NadzorError {
        NadzorError::Provider {
            kind: ProviderErrorKind::Other,
            message: "scripted failure".into(),
            source: None,
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
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
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, NadzorError> {
            self.requests.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("provider {} called beyond its script", self.name))
        }
    }

    struct ScriptedImage {
        script: Mutex<VecDeque<Result<GeneratedImage, NadzorError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedImage {
        fn new(script: Vec<Result<GeneratedImage, NadzorError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    fn generated_image() -> GeneratedImage {
        GeneratedImage {
            mime_type: "image/png".into(),
            data: "aW1n".into(),
            description: Some("Схема узла.".into()),
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedImage {
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
    impl ImageProvider for ScriptedImage {
        async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NadzorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("image provider called beyond its script")
        }
    }

    #[derive(Default)]
    struct MemoryContext {
        messages: Mutex<Vec<ConversationMessage>>,
    }

    impl MemoryContext {
        fn contents(&self) -> Vec<(Role, String)> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .map(|m| (m.role, m.content.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl PluginAdapter for MemoryContext {
        fn name(&self) -> &str {
            "memory-context"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Storage
        }
        async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), NadzorError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ContextStore for MemoryContext {
        async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<(), NadzorError> {
            self.messages.lock().unwrap().push(ConversationMessage {
                user_id,
                role,
                content: content.to_string(),
                created_at: "2026-01-01T00:00:00Z".into(),
            });
            Ok(())
        }

        async fn recent(
            &self,
            user_id: i64,
            limit: usize,
        ) -> Result<Vec<ConversationMessage>, NadzorError> {
            let messages = self.messages.lock().unwrap();
            let matching: Vec<_> = messages
                .iter()
                .filter(|m| m.user_id == user_id)
                .cloned()
                .collect();
            let skip = matching.len().saturating_sub(limit);
            Ok(matching.into_iter().skip(skip).collect())
        }
    }

    struct StaticFragments(Vec<RetrievedFragment>);

    #[async_trait]
    impl FragmentSource for StaticFragments {
        async fn search(&self, _query: &str) -> Result<Vec<RetrievedFragment>, NadzorError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenFragments;

    #[async_trait]
    impl FragmentSource for BrokenFragments {
        async fn search(&self, _query: &str) -> Result<Vec<RetrievedFragment>, NadzorError> {
            Err(NadzorError::Retrieval {
                message: "index unreachable".into(),
            })
        }
    }

    fn handle(provider: Arc<ScriptedProvider>) -> ProviderHandle {
        ProviderHandle::new(provider, 1000, 30)
    }

    fn text_request(text: &str) -> Request {
        Request {
            user_id: 1,
            chat_id: "chat-1".into(),
            text: Some(text.into()),
            photo: None,
            received_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn photo_request(caption: &str) -> Request {
        Request {
            photo: Some(PhotoData {
                mime_type: "image/jpeg".into(),
                data: "aGVsbG8=".into(),
            }),
            ..text_request(caption)
        }
    }

    fn decision(provider: ProviderKind, template: PromptTemplate, grounded: bool) -> ProviderDecision {
        ProviderDecision {
            provider,
            template,
            estimated_cost_usd: 0.01,
            needs_grounding: grounded,
        }
    }

    fn executor(
        claude: Option<Arc<ScriptedProvider>>,
        grok: Arc<ScriptedProvider>,
        retriever: Option<Arc<dyn FragmentSource>>,
        context: Arc<MemoryContext>,
    ) -> FallbackExecutor {
        FallbackExecutor::new(
            ProviderSet {
                claude: claude.map(handle),
                gemini_text: None,
                gemini_image: None,
                grok: handle(grok),
            },
            retriever,
            context,
            10,
        )
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let claude = ScriptedProvider::ok("anthropic", "Ответ по СП.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok.clone(), None, context.clone());

        let answer = exec
            .execute(
                &text_request("Какой защитный слой бетона по СП 63?"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(answer.text, "Ответ по СП.");
        assert!(!answer.via_fallback);
        assert_eq!(answer.provider, "anthropic");
        assert_eq!(claude.calls(), 1);
        assert_eq!(grok.calls(), 0);
    }

    #[tokio::test]
    async fn success_appends_user_then_assistant() {
        let claude = ScriptedProvider::ok("anthropic", "Ответ.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude), grok, None, context.clone());

        exec.execute(
            &text_request("вопрос"),
            &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let log = context.contents();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], (Role::User, "вопрос".to_string()));
        assert_eq!(log[1], (Role::Assistant, "Ответ.".to_string()));
    }

    #[tokio::test]
    async fn primary_failure_falls_back_once_to_grok() {
        let claude = ScriptedProvider::failing("anthropic");
        let grok = ScriptedProvider::ok("xai", "Запасной ответ.");
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok.clone(), None, context.clone());

        let answer = exec
            .execute(
                &text_request("вопрос"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(answer.via_fallback);
        assert_eq!(answer.provider, "xai");
        assert_eq!(claude.calls(), 1);
        assert_eq!(grok.calls(), 1);
        assert_eq!(context.contents().len(), 2);
    }

    #[tokio::test]
    async fn both_failures_are_terminal_and_append_nothing() {
        let claude = ScriptedProvider::failing("anthropic");
        let grok = ScriptedProvider::failing("xai");
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok.clone(), None, context.clone());

        let err = exec
            .execute(
                &text_request("вопрос"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, NadzorError::Terminal { .. }));
        assert_eq!(claude.calls() + grok.calls(), 2);
        assert!(context.contents().is_empty());
    }

    #[tokio::test]
    async fn grounded_prompt_carries_fragment_text() {
        let claude = ScriptedProvider::ok("anthropic", "Ответ.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let fragments: Arc<dyn FragmentSource> = Arc::new(StaticFragments(vec![RetrievedFragment {
            document_id: "СП 63.13330.2018".into(),
            section_label: "п. 10.3.2".into(),
            text: "Минимальный защитный слой бетона...".into(),
            relevance_score: 0.88,
        }]));
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok, Some(fragments), context);

        exec.execute(
            &text_request("защитный слой бетона"),
            &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let sent = claude.request(0);
        assert!(sent.system.contains("СП 63.13330.2018 п. 10.3.2"));
        assert!(sent.system.contains("Минимальный защитный слой"));
    }

    #[tokio::test]
    async fn retrieval_failure_degrades_to_ungrounded_prompt() {
        let claude = ScriptedProvider::ok("anthropic", "Ответ.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        let exec = executor(
            Some(claude.clone()),
            grok,
            Some(Arc::new(BrokenFragments)),
            context,
        );

        let answer = exec
            .execute(
                &text_request("защитный слой бетона"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, true),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!answer.via_fallback);
        let sent = claude.request(0);
        assert!(!sent.system.contains("НОРМАТИВНАЯ БАЗА"));
    }

    #[tokio::test]
    async fn photo_reaches_primary_but_not_fallback() {
        let claude = ScriptedProvider::failing("anthropic");
        let grok = ScriptedProvider::ok("xai", "Текстовый ответ.");
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok.clone(), None, context);

        exec.execute(
            &photo_request("Что с кладкой?"),
            &decision(ProviderKind::ClaudeVision, PromptTemplate::DefectAnalysis, false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(claude.request(0).image.is_some());
        assert!(grok.request(0).image.is_none());
    }

    #[tokio::test]
    async fn live_search_set_for_grok_on_currency_questions() {
        let grok = ScriptedProvider::ok("xai", "Действует.");
        let context = Arc::new(MemoryContext::default());
        let exec = executor(None, grok.clone(), None, context);

        exec.execute(
            &text_request("Проверь, действует ли СП 70 сейчас?"),
            &decision(ProviderKind::GrokDefault, PromptTemplate::Generalist, false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(grok.request(0).live_search);
    }

    #[tokio::test]
    async fn history_window_precedes_current_turn() {
        let claude = ScriptedProvider::ok("anthropic", "Второй ответ.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        context.append(1, Role::User, "первый вопрос").await.unwrap();
        context
            .append(1, Role::Assistant, "первый ответ")
            .await
            .unwrap();
        let exec = executor(Some(claude.clone()), grok, None, context);

        exec.execute(
            &text_request("второй вопрос"),
            &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let sent = claude.request(0);
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[0].content, "первый вопрос");
        assert_eq!(sent.messages[2].content, "второй вопрос");
    }

    #[tokio::test]
    async fn cancelled_request_appends_nothing_and_calls_nothing() {
        let claude = ScriptedProvider::ok("anthropic", "Ответ.");
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        let exec = executor(Some(claude.clone()), grok.clone(), None, context.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = exec
            .execute(
                &text_request("вопрос"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, NadzorError::Internal(_)));
        assert_eq!(claude.calls(), 0);
        assert_eq!(grok.calls(), 0);
        assert!(context.contents().is_empty());
    }

    #[tokio::test]
    async fn drawing_runs_two_steps_and_returns_image() {
        let gemini_text = ScriptedProvider::ok("gemini", "technical cross-section drawing of a slab bearing node");
        let gemini_image = ScriptedImage::new(vec![Ok(generated_image())]);
        let grok = ScriptedProvider::new("xai", vec![]);
        let context = Arc::new(MemoryContext::default());
        let exec = FallbackExecutor::new(
            ProviderSet {
                claude: None,
                gemini_text: Some(handle(gemini_text.clone())),
                gemini_image: Some(ImageHandle::new(gemini_image.clone(), 30)),
                grok: handle(grok.clone()),
            },
            None,
            context.clone(),
            10,
        );

        let answer = exec
            .execute(
                &text_request("Нарисуй узел опирания плиты"),
                &decision(ProviderKind::GeminiImage, PromptTemplate::DrawingSpec, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(answer.image.is_some());
        assert!(!answer.via_fallback);
        assert_eq!(answer.text, "Схема узла.");
        assert_eq!(gemini_text.calls(), 1);
        let prompts = gemini_image.prompts.lock().unwrap().clone();
        assert_eq!(prompts, vec!["technical cross-section drawing of a slab bearing node"]);
        assert_eq!(grok.calls(), 0);
        assert_eq!(context.contents().len(), 2);
    }

    #[tokio::test]
    async fn drawing_image_failure_falls_back_to_grok_text() {
        let gemini_text = ScriptedProvider::ok("gemini", "drawing prompt");
        let gemini_image = ScriptedImage::new(vec![Err(provider_error())]);
        let grok = ScriptedProvider::ok("xai", "Опишу словами.");
        let context = Arc::new(MemoryContext::default());
        let exec = FallbackExecutor::new(
            ProviderSet {
                claude: None,
                gemini_text: Some(handle(gemini_text)),
                gemini_image: Some(ImageHandle::new(gemini_image, 30)),
                grok: handle(grok.clone()),
            },
            None,
            context.clone(),
            10,
        );

        let answer = exec
            .execute(
                &text_request("Нарисуй узел опирания плиты"),
                &decision(ProviderKind::GeminiImage, PromptTemplate::DrawingSpec, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(answer.via_fallback);
        assert!(answer.image.is_none());
        assert_eq!(answer.text, "Опишу словами.");
        // Fallback sends the raw user text, not the drawing spec.
        assert_eq!(
            grok.request(0).messages.last().unwrap().content,
            "Нарисуй узел опирания плиты"
        );
    }

    #[tokio::test]
    async fn unconfigured_claude_routes_primary_to_grok() {
        let grok = ScriptedProvider::ok("xai", "Ответ.");
        let context = Arc::new(MemoryContext::default());
        let exec = executor(None, grok.clone(), None, context);

        let answer = exec
            .execute(
                &text_request("вопрос по СП"),
                &decision(ProviderKind::ClaudeTechnical, PromptTemplate::TechnicalNormative, false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!answer.via_fallback);
        assert_eq!(answer.provider, "xai");
        assert_eq!(grok.calls(), 1);
    }
}
