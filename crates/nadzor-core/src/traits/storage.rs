// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context store trait.

use async_trait::async_trait;

use crate::error::NadzorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationMessage, Role};

/// Append-only per-user conversation log.
///
/// Entries must be appended in completion order; `recent` returns the
/// bounded most-recent window in chronological (oldest-first) order.
/// Concurrent appends for different users never conflict; appends for the
/// same user are serialized by the implementation.
#[async_trait]
pub trait ContextStore: PluginAdapter {
    /// Appends a message to the user's conversation log.
    async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<(), NadzorError>;

    /// Returns the most recent `limit` messages for the user, oldest first.
    async fn recent(&self, user_id: i64, limit: usize)
    -> Result<Vec<ConversationMessage>, NadzorError>;
}
