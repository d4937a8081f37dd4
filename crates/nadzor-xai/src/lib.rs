// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! xAI Grok provider for the StroiNadzor agent.
//!
//! Grok serves generic questions and is the sole fallback provider for
//! every routed category. Text-only: image input is rejected so the
//! fallback path degrades a photo request to its caption text before
//! calling here.

pub mod client;
pub mod types;

pub use client::GrokClient;
pub use types::SearchParameters;
