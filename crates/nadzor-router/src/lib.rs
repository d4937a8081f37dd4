// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request classification and provider routing for the StroiNadzor agent.
//!
//! This crate provides:
//! - [`RequestClassifier`]: keyword/regex category classification with
//!   configurable precedence (zero-cost, zero-latency)
//! - [`ProviderRouter`]: a static routing table from category to provider,
//!   total over all categories, with fire-and-forget observability records
//!
//! The router runs before any LLM call: every inbound request gets exactly
//! one classification and one provider decision.

pub mod classifier;
pub mod router;

pub use classifier::{
    Classification, RequestCategory, RequestClassifier, extract_normative_codes, needs_live_search,
};
pub use router::{ProviderDecision, ProviderKind, ProviderRouter, ProvidersConfig, PromptTemplate};
