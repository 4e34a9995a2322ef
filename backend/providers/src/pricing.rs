//! Hardcoded per-model prices, used for cost logging only.

use tracing::warn;

use storytalk_core::TokenUsage;

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    (
        "claude-3-5-haiku-20241022",
        ModelPricing {
            input_per_million: 0.25,
            output_per_million: 1.25,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        },
    ),
];

pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICING_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| *pricing)
}

impl ModelPricing {
    pub fn cost(&self, usage: TokenUsage) -> f64 {
        usage.input_tokens as f64 / 1_000_000.0 * self.input_per_million
            + usage.output_tokens as f64 / 1_000_000.0 * self.output_per_million
    }
}

/// Dollar cost of a call; unknown models are logged and cost nothing.
pub fn cost_for(model: &str, usage: TokenUsage) -> f64 {
    match pricing_for(model) {
        Some(pricing) => pricing.cost(usage),
        None => {
            warn!(model = %model, "Unknown model pricing");
            0.0
        }
    }
}
