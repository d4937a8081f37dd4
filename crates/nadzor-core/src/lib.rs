// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the StroiNadzor agent.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the StroiNadzor workspace. All adapter
//! implementations (providers, channel, storage, retrieval) implement traits
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{NadzorError, ProviderErrorKind};
pub use types::{
    AdapterType, Answer, Completion, CompletionRequest, ConversationMessage, GeneratedImage,
    HealthStatus, MessageId, OutboundReply, PhotoData, PromptMessage, Request, Role,
    RoutingRecord, TokenUsage,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ChannelAdapter, CompletionProvider, ContextStore, EmbeddingAdapter, PluginAdapter,
    RoutingSink,
};
pub use traits::provider::ImageProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = NadzorError::Config("test".into());
        let _storage = NadzorError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = NadzorError::Channel {
            message: "test".into(),
            source: None,
        };
        let _provider = NadzorError::provider(ProviderErrorKind::Other, "test");
        let _retrieval = NadzorError::Retrieval {
            message: "test".into(),
        };
        let _terminal = NadzorError::Terminal {
            message: "test".into(),
        };
        let _internal = NadzorError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter trait is reachable through
        // the public API.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_completion_provider<T: CompletionProvider>() {}
        fn _assert_image_provider<T: ImageProvider>() {}
        fn _assert_context_store<T: ContextStore>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_routing_sink<T: RoutingSink>() {}
    }
}
