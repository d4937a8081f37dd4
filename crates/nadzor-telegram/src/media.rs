// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Photo download for Telegram messages.
//!
//! Providers consume base64 payloads, so the downloaded bytes are encoded
//! here at the channel boundary.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use nadzor_core::{NadzorError, PhotoData};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, PhotoSize};
use tracing::debug;

/// Downloads a file from Telegram servers by its file metadata.
pub async fn download_file(bot: &Bot, file_meta: &FileMeta) -> Result<Vec<u8>, NadzorError> {
    let file = bot
        .get_file(file_meta.id.clone())
        .await
        .map_err(|e| NadzorError::Channel {
            message: format!("getFile failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| NadzorError::Channel {
            message: format!("file download failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(file_id = %file_meta.id, size = buf.len(), "photo downloaded");
    Ok(buf)
}

/// Downloads the largest variant of a photo and encodes it as base64 JPEG.
///
/// Telegram provides multiple sizes; the last one is the largest.
pub async fn download_photo(bot: &Bot, photos: &[PhotoSize]) -> Result<PhotoData, NadzorError> {
    let largest = photos.last().ok_or_else(|| NadzorError::Channel {
        message: "photo array is empty".into(),
        source: None,
    })?;

    let bytes = download_file(bot, &largest.file).await?;
    Ok(PhotoData {
        mime_type: "image/jpeg".to_string(),
        data: BASE64.encode(bytes),
    })
}

/// Decodes a base64 image payload back to raw bytes for delivery.
pub fn decode_image(data: &str) -> Result<Vec<u8>, NadzorError> {
    BASE64.decode(data).map_err(|e| NadzorError::Channel {
        message: format!("invalid base64 image payload: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_image_round_trips() {
        let encoded = BASE64.encode(b"image-bytes");
        assert_eq!(decode_image(&encoded).unwrap(), b"image-bytes");
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image("not base64 !!!").is_err());
    }
}
