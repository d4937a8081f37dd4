// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and request extraction for inbound messages.
//!
//! Only private-chat messages from allowed users are turned into
//! [`Request`] objects; everything else is dropped before the pipeline.

use nadzor_core::{NadzorError, PhotoData, Request};
use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::debug;

use crate::media;

/// Checks whether the message sender is allowed.
///
/// An empty `allowed_users` list allows everyone; otherwise the sender's
/// user ID must appear in the list. Messages without a sender are always
/// rejected.
pub fn is_authorized(msg: &Message, allowed_users: &[i64]) -> bool {
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    allowed_users.is_empty() || allowed_users.contains(&(user.id.0 as i64))
}

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Extracts a pipeline [`Request`] from a Telegram message.
///
/// Handles text and photo messages; photos are downloaded in the best
/// available resolution. Returns `None` for unsupported message types
/// (stickers, voice, documents, locations).
pub async fn extract_request(bot: &Bot, msg: &Message) -> Result<Option<Request>, NadzorError> {
    if let Some(text) = msg.text() {
        return Ok(Some(to_request(msg, Some(text.to_string()), None)));
    }

    if let Some(photos) = msg.photo() {
        let photo = media::download_photo(bot, photos).await?;
        let caption = msg.caption().map(|c| c.to_string());
        return Ok(Some(to_request(msg, caption, Some(photo))));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported message type");
    Ok(None)
}

fn to_request(msg: &Message, text: Option<String>, photo: Option<PhotoData>) -> Request {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or_default();
    Request {
        user_id,
        chat_id: msg.chat.id.0.to_string(),
        text,
        photo,
        received_at: msg.date.to_rfc3339(),
    }
}
