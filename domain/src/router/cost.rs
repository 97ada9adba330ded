//! Token cost accounting.

use serde::{Deserialize, Serialize};

/// Per-backend pricing, in currency units per 1,000 tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    #[serde(default)]
    pub input_per_1k: f64,
    #[serde(default)]
    pub output_per_1k: f64,
}

impl CostRates {
    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    pub fn free() -> Self {
        Self::default()
    }

    pub fn cost(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        (tokens_in as f64 / 1000.0) * self.input_per_1k
            + (tokens_out as f64 / 1000.0) * self.output_per_1k
    }
}

/// Rough token count for text whose usage the backend did not report.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_per_direction() {
        let rates = CostRates::new(0.5, 1.5);
        let cost = rates.cost(2000, 1000);
        assert!((cost - 2.5).abs() < 1e-9);
        assert_eq!(CostRates::free().cost(10_000, 10_000), 0.0);
    }

    #[test]
    fn estimates_four_chars_per_token() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
