// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider pricing tables and per-call cost estimation.
//!
//! Pricing in USD per million tokens, checked against the published provider
//! price lists on 2026-08-01:
//!
//! Claude Sonnet 4.5:    input=$3.00/MTok, output=$15.00/MTok
//! Grok 2:               input=$2.00/MTok, output=$10.00/MTok
//! Gemini 2.5 Flash:     input=$0.30/MTok, output=$2.50/MTok
//! Gemini image output is billed per generated image, not per token.

use nadzor_core::TokenUsage;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Cost per million input tokens.
    pub input_per_mtok: f64,
    /// Cost per million output tokens.
    pub output_per_mtok: f64,
    /// Flat surcharge per call, used for per-image billing.
    pub flat_per_call: f64,
}

/// Nominal token counts used for pre-call cost estimates.
///
/// A routing decision is made before any provider call, so the estimate
/// assumes a typical grounded prompt and a mid-sized answer.
const ESTIMATE_INPUT_TOKENS: u32 = 1_500;
const ESTIMATE_OUTPUT_TOKENS: u32 = 800;

/// Look up pricing for a given model identifier.
///
/// Matches on substrings so dated model names keep resolving. Unknown models
/// fall back to Claude Sonnet pricing so the ledger never silently records
/// zero-cost calls.
pub fn get_pricing(model: &str) -> ModelPricing {
    let lower = model.to_lowercase();

    if lower.contains("grok") {
        ModelPricing {
            input_per_mtok: 2.0,
            output_per_mtok: 10.0,
            flat_per_call: 0.0,
        }
    } else if lower.contains("gemini") && lower.contains("image") {
        // Text tokens are negligible next to the per-image charge.
        ModelPricing {
            input_per_mtok: 0.30,
            output_per_mtok: 2.50,
            flat_per_call: 0.039,
        }
    } else if lower.contains("gemini") {
        ModelPricing {
            input_per_mtok: 0.30,
            output_per_mtok: 2.50,
            flat_per_call: 0.0,
        }
    } else {
        ModelPricing {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
            flat_per_call: 0.0,
        }
    }
}

/// Calculate cost in USD for a reported token usage and pricing.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let input = (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
    let output = (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
    input + output + pricing.flat_per_call
}

/// Estimate the cost of a single call to the given model before it is made.
///
/// Used by the router for the observability record; actual usage is billed
/// separately once the provider reports it.
pub fn estimate_call_cost(model: &str) -> f64 {
    let pricing = get_pricing(model);
    let usage = TokenUsage {
        input_tokens: ESTIMATE_INPUT_TOKENS,
        output_tokens: ESTIMATE_OUTPUT_TOKENS,
    };
    calculate_cost(&usage, &pricing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_pricing() {
        let p = get_pricing("claude-sonnet-4-5-20250929");
        assert!((p.input_per_mtok - 3.0).abs() < f64::EPSILON);
        assert!((p.output_per_mtok - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grok_pricing() {
        let p = get_pricing("grok-2-latest");
        assert!((p.input_per_mtok - 2.0).abs() < f64::EPSILON);
        assert!((p.output_per_mtok - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gemini_image_pricing_has_flat_charge() {
        let p = get_pricing("gemini-2.5-flash-image");
        assert!(p.flat_per_call > 0.0);
    }

    #[test]
    fn gemini_text_pricing_has_no_flat_charge() {
        let p = get_pricing("gemini-2.5-flash");
        assert!((p.flat_per_call - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_model_falls_back_to_claude() {
        let p = get_pricing("mystery-model-1");
        assert!((p.input_per_mtok - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn calculate_cost_sums_input_and_output() {
        let pricing = get_pricing("claude-sonnet-4-5-20250929");
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        let cost = calculate_cost(&usage, &pricing);
        // input: 1000/1M * 3.0 = 0.003, output: 500/1M * 15.0 = 0.0075
        let expected = 0.003 + 0.0075;
        assert!((cost - expected).abs() < 1e-10, "expected {expected}, got {cost}");
    }

    #[test]
    fn zero_tokens_zero_cost() {
        let pricing = get_pricing("grok-2-latest");
        let cost = calculate_cost(&TokenUsage::default(), &pricing);
        assert!((cost - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_is_positive_for_all_providers() {
        for model in [
            "claude-sonnet-4-5-20250929",
            "grok-2-latest",
            "gemini-2.5-flash",
            "gemini-2.5-flash-image",
        ] {
            assert!(estimate_call_cost(model) > 0.0, "estimate for {model}");
        }
    }

    #[test]
    fn grok_estimate_cheaper_than_claude() {
        assert!(estimate_call_cost("grok-2-latest") < estimate_call_cost("claude-sonnet-4-5"));
    }
}
