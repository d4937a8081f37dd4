// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider for the StroiNadzor agent.
//!
//! Drives the drawing pipeline: [`GeminiClient`] implements both
//! `CompletionProvider` (structured drawing prompt from the text model) and
//! `ImageProvider` (schematic rendering from the image model).

pub mod client;
pub mod types;

pub use client::GeminiClient;
