// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the inbound messaging platform (Telegram).

use async_trait::async_trait;

use crate::error::NadzorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MessageId, OutboundReply, Request};

/// Adapter for the bidirectional messaging channel.
///
/// The channel adapter delivers [`Request`] objects to the core and renders
/// answers (or the terminal-failure message) back to the user. Per-user
/// request serialization is the channel's responsibility: the core assumes
/// at most one in-flight pipeline per user at a time.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), NadzorError>;

    /// Sends a reply through the channel.
    async fn send(&self, reply: OutboundReply) -> Result<MessageId, NadzorError>;

    /// Receives the next inbound request from the channel.
    async fn receive(&self) -> Result<Request, NadzorError>;
}
