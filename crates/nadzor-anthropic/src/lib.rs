// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider for the StroiNadzor agent.
//!
//! Serves the technical-normative and defect-photo categories. Photos are
//! sent as inline base64 image blocks on the final user turn of the
//! Messages API request.

pub mod client;
pub mod types;

pub use client::AnthropicClient;
pub use types::{MessageRequest, MessageResponse};
