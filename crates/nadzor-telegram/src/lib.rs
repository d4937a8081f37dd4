// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the StroiNadzor agent.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling, private-chat authorization, photo download, and delivery
//! of text answers and generated schematics.

pub mod handler;
pub mod media;

use std::sync::Arc;

use async_trait::async_trait;
use nadzor_config::model::TelegramConfig;
use nadzor_core::traits::{ChannelAdapter, PluginAdapter};
use nadzor_core::{AdapterType, HealthStatus, MessageId, NadzorError, OutboundReply, Request};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Connects via long polling, filters messages to authorized private chats,
/// and delivers answers back to the originating chat.
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<Request>>,
    inbound_tx: mpsc::Sender<Request>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, NadzorError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            NadzorError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(NadzorError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn parse_chat_id(chat_id: &str) -> Result<ChatId, NadzorError> {
        chat_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| NadzorError::Channel {
                message: format!("invalid chat_id: {e}"),
                source: None,
            })
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, NadzorError> {
        // Token validity check via getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), NadzorError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), NadzorError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let allowed_users: Arc<Vec<i64>> = Arc::new(self.config.allowed_users.clone());

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let message_handler =
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let tx = tx.clone();
                    let allowed = allowed_users.clone();
                    async move {
                        if !handler::is_dm(&msg) {
                            debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                            return respond(());
                        }

                        if !handler::is_authorized(&msg, &allowed) {
                            debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                            return respond(());
                        }

                        match handler::extract_request(&bot, &msg).await {
                            Ok(Some(request)) => {
                                if tx.send(request).await.is_err() {
                                    warn!("inbound channel closed, dropping message");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                error!(error = %e, "failed to extract message content");
                            }
                        }

                        respond(())
                    }
                });

            Dispatcher::builder(bot, message_handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, reply: OutboundReply) -> Result<MessageId, NadzorError> {
        let chat_id = Self::parse_chat_id(&reply.chat_id)?;

        let sent = match &reply.image {
            Some(image) => {
                let bytes = media::decode_image(&image.data)?;
                let photo = InputFile::memory(bytes).file_name("schematic.png");
                let mut request = self.bot.send_photo(Recipient::Id(chat_id), photo);
                if !reply.text.is_empty() {
                    request = request.caption(&reply.text);
                }
                request.await.map_err(|e| NadzorError::Channel {
                    message: format!("failed to send photo: {e}"),
                    source: Some(Box::new(e)),
                })?
            }
            None => self
                .bot
                .send_message(Recipient::Id(chat_id), &reply.text)
                .await
                .map_err(|e| NadzorError::Channel {
                    message: format!("failed to send message: {e}"),
                    source: Some(Box::new(e)),
                })?,
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<Request, NadzorError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| NadzorError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_bot_token() {
        let config = TelegramConfig {
            bot_token: None,
            allowed_users: vec![],
        };
        assert!(TelegramChannel::new(config).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        let config = TelegramConfig {
            bot_token: Some(String::new()),
            allowed_users: vec![],
        };
        assert!(TelegramChannel::new(config).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11".into()),
            allowed_users: vec![12345],
        };
        assert!(TelegramChannel::new(config).is_ok());
    }

    #[test]
    fn parse_chat_id_accepts_numeric() {
        assert_eq!(TelegramChannel::parse_chat_id("12345").unwrap().0, 12345);
    }

    #[test]
    fn parse_chat_id_rejects_garbage() {
        assert!(TelegramChannel::parse_chat_id("not-a-number").is_err());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let config = TelegramConfig {
            bot_token: Some("test:token".into()),
            allowed_users: vec![],
        };
        let channel = TelegramChannel::new(config).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }
}
