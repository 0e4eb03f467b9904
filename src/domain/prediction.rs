//! Prediction result types.
//!
//! Represents the output of a heart disease risk prediction, after the
//! classifier probability has been scaled to a percentage and banded.

use serde::{Deserialize, Serialize};

/// Probability (percent) at which the MEDIUM band starts.
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

/// Probability (percent) at which the HIGH band starts.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;

/// Risk tier for heart disease, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    /// Probability below 40%
    Low,
    /// Probability in [40%, 70%)
    Medium,
    /// Probability of 70% or more
    High,
}

impl RiskTier {
    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Medium => "Medium risk - Follow-up recommended",
            Self::High => "High risk - Prompt clinical consultation advised",
        }
    }

    /// Get the associated display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (0, 148, 50),     // #009432
            Self::Medium => (251, 197, 49), // #FBC531
            Self::High => (234, 32, 39),   // #EA2027
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Band a probability percentage into a risk tier.
///
/// Lower bounds are inclusive: exactly 40.0 is MEDIUM and exactly 70.0 is
/// HIGH. Total over `f64`; NaN lands in HIGH.
#[must_use]
pub fn tier(probability_pct: f64) -> RiskTier {
    if probability_pct < MEDIUM_RISK_THRESHOLD {
        RiskTier::Low
    } else if probability_pct < HIGH_RISK_THRESHOLD {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// Outcome of one prediction request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class probability as a percentage (0.0 to 100.0)
    pub probability: f64,

    /// Risk band of `probability`
    pub risk_tier: RiskTier,

    /// Binary prediction (0 = no disease, 1 = disease)
    pub label: u8,
}

impl PredictionResult {
    /// Build a result from a raw positive-class probability in [0, 1].
    ///
    /// Out-of-range input is clamped before scaling.
    #[must_use]
    pub fn from_probability(probability: f64, label: u8) -> Self {
        let pct = probability.clamp(0.0, 1.0) * 100.0;
        Self {
            probability: pct,
            risk_tier: tier(pct),
            label,
        }
    }

    /// Whole-percent value for a progress bar, truncated toward zero.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.probability.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier(0.0), RiskTier::Low);
        assert_eq!(tier(39.999), RiskTier::Low);
        assert_eq!(tier(40.0), RiskTier::Medium);
        assert_eq!(tier(69.999), RiskTier::Medium);
        assert_eq!(tier(70.0), RiskTier::High);
        assert_eq!(tier(100.0), RiskTier::High);
    }

    #[test]
    fn test_result_from_probability() {
        let result = PredictionResult::from_probability(0.7312, 1);
        assert!((result.probability - 73.12).abs() < 1e-9);
        assert_eq!(result.risk_tier, RiskTier::High);
        assert_eq!(result.progress_percent(), 73);

        let clamped = PredictionResult::from_probability(1.5, 1);
        assert_eq!(clamped.probability, 100.0);
        assert_eq!(clamped.progress_percent(), 100);

        let low = PredictionResult::from_probability(-0.2, 0);
        assert_eq!(low.probability, 0.0);
        assert_eq!(low.risk_tier, RiskTier::Low);
    }

    #[test]
    fn test_tier_colors() {
        assert_eq!(RiskTier::Low.color(), (0x00, 0x94, 0x32));
        assert_eq!(RiskTier::Medium.color(), (0xFB, 0xC5, 0x31));
        assert_eq!(RiskTier::High.color(), (0xEA, 0x20, 0x27));
    }

    #[test]
    fn test_tier_display_and_serde() {
        assert_eq!(RiskTier::Medium.to_string(), "MEDIUM");
        let json = serde_json::to_string(&PredictionResult::from_probability(0.5, 0))
            .expect("Should serialize");
        assert!(json.contains("\"risk_tier\":\"MEDIUM\""));
    }

    proptest! {
        #[test]
        fn prop_tier_is_total(p in proptest::num::f64::ANY) {
            let t = tier(p);
            prop_assert!(matches!(t, RiskTier::Low | RiskTier::Medium | RiskTier::High));
        }

        #[test]
        fn prop_tier_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tier(lo) <= tier(hi));
        }
    }
}
