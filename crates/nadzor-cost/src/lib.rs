// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing and routing-decision observability for the StroiNadzor agent.
//!
//! This crate provides:
//! - **Pricing**: per-provider cost tables and pre-call cost estimation
//! - **Routing ledger**: persistent SQLite record of every routing decision,
//!   with daily and per-provider totals for operator reporting

pub mod ledger;
pub mod pricing;

pub use ledger::RoutingLedger;
pub use pricing::{ModelPricing, calculate_cost, estimate_call_cost, get_pricing};
