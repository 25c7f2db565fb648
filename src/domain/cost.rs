//! Inference token cost in local currency

use serde::{Deserialize, Serialize};

use super::inference::TokenUsage;

/// Pricing inputs, USD per million tokens converted at a fixed rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// DZD for one USD
    pub dzd_per_usd: f64,
    /// Business markup in percent
    pub markup_percent: f64,
    pub input_cost_per_million_usd: f64,
    pub output_cost_per_million_usd: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            dzd_per_usd: 135.0,
            markup_percent: 50.0,
            input_cost_per_million_usd: 3.0,
            output_cost_per_million_usd: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    config: CostConfig,
}

impl CostEstimator {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    /// Raw token cost in DZD, before markup
    pub fn token_cost(&self, usage: TokenUsage) -> f64 {
        let input = usage.input_tokens as f64 / 1_000_000.0 * self.config.input_cost_per_million_usd;
        let output =
            usage.output_tokens as f64 / 1_000_000.0 * self.config.output_cost_per_million_usd;

        (input + output) * self.config.dzd_per_usd
    }

    /// Billed cost in DZD with markup, rounded to centimes
    pub fn estimate(&self, usage: TokenUsage) -> f64 {
        let billed = self.token_cost(usage) * (1.0 + self.config.markup_percent / 100.0);
        (billed * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_applies_rate_and_markup() {
        let estimator = CostEstimator::default();

        // 1M input + 1M output = 18 USD = 2430 DZD, +50% = 3645
        let cost = estimator.estimate(TokenUsage::new(1_000_000, 1_000_000));
        assert!((cost - 3645.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_usage_is_free() {
        assert_eq!(CostEstimator::default().estimate(TokenUsage::default()), 0.0);
    }

    #[test]
    fn test_small_usage_rounds_to_centimes() {
        let estimator = CostEstimator::new(CostConfig {
            markup_percent: 0.0,
            ..Default::default()
        });

        // 2000 input + 100 output tokens = 0.0075 USD = 1.0125 DZD
        assert!((estimator.estimate(TokenUsage::new(2000, 100)) - 1.01).abs() < 1e-9);
    }
}
