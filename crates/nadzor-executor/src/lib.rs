// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request execution pipeline for the StroiNadzor agent.
//!
//! [`FallbackExecutor`] runs at most two provider calls per request: the
//! routed primary attempt and, if it fails, one simplified attempt against
//! Grok. Drawing requests run a two-step Gemini pipeline (structured prompt,
//! then image generation) with the same single-fallback budget.

pub mod executor;
pub mod prompt;

pub use executor::{
    FallbackExecutor, FragmentSource, ImageHandle, ProviderHandle, ProviderSet,
};
