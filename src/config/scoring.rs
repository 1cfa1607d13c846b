//! Risk scoring configuration
//!
//! This module contains the weighted-sum configuration for the churn risk
//! score:
//! - Weights for the four component signals
//! - The high-risk cutoff used by portfolio reporting
//! - Fixed scores for shippers without usable history

use serde::{Deserialize, Serialize};

/// Component weights for the churn risk score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskWeights {
    /// Weight for how far past the expected next event the shipper is (0.0-1.0)
    #[serde(default = "default_days_overdue_weight")]
    pub days_overdue: f64,

    /// Weight for recent volume versus historic rate (0.0-1.0)
    #[serde(default = "default_volume_decline_weight")]
    pub volume_decline: f64,

    /// Weight for deviation from the shipper's own cadence (0.0-1.0)
    #[serde(default = "default_pattern_deviation_weight")]
    pub pattern_deviation: f64,

    /// Weight for relationship tenure (0.0-1.0)
    #[serde(default = "default_tenure_weight")]
    pub tenure: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            days_overdue: default_days_overdue_weight(),
            volume_decline: default_volume_decline_weight(),
            pattern_deviation: default_pattern_deviation_weight(),
            tenure: default_tenure_weight(),
        }
    }
}

impl RiskWeights {
    // Pure function: Check if a weight is in valid range
    pub fn is_valid_weight(weight: f64) -> bool {
        (0.0..=1.0).contains(&weight)
    }

    // Pure function: Validate a single weight with name
    pub fn validate_weight(weight: f64, name: &str) -> Result<(), String> {
        if Self::is_valid_weight(weight) {
            Ok(())
        } else {
            Err(format!("{} weight must be between 0.0 and 1.0", name))
        }
    }

    pub fn sum(&self) -> f64 {
        self.days_overdue + self.volume_decline + self.pattern_deviation + self.tenure
    }

    /// Validate ranges, then that weights sum to 1.0 (with small tolerance for floating point)
    pub fn validate(&self) -> Result<(), String> {
        Self::validate_weight(self.days_overdue, "Days overdue")?;
        Self::validate_weight(self.volume_decline, "Volume decline")?;
        Self::validate_weight(self.pattern_deviation, "Pattern deviation")?;
        Self::validate_weight(self.tenure, "Tenure")?;

        let sum = self.sum();
        if (sum - 1.0).abs() > 0.001 {
            return Err(format!(
                "Risk weights must sum to 1.0, but sum to {:.3}",
                sum
            ));
        }
        Ok(())
    }

    /// Normalize weights to ensure they sum to exactly 1.0
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum > 0.0 && (sum - 1.0).abs() > 1e-9 {
            self.days_overdue /= sum;
            self.volume_decline /= sum;
            self.pattern_deviation /= sum;
            self.tenure /= sum;
        }
    }
}

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: RiskWeights,

    /// Scores at or above this are "high risk" in portfolio summaries
    #[serde(default = "default_high_risk_score")]
    pub high_risk_score: f64,

    /// Score reported when metrics are computed over an empty history
    #[serde(default = "default_no_history_score")]
    pub no_history_score: f64,

    /// Score the scorer itself returns when the last event is unknown
    #[serde(default = "default_unknown_last_event_score")]
    pub unknown_last_event_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            high_risk_score: default_high_risk_score(),
            no_history_score: default_no_history_score(),
            unknown_last_event_score: default_unknown_last_event_score(),
        }
    }
}

// Default weights for the weighted sum model - recency dominates
pub fn default_days_overdue_weight() -> f64 {
    0.40
}
pub fn default_volume_decline_weight() -> f64 {
    0.30
}
pub fn default_pattern_deviation_weight() -> f64 {
    0.20
}
pub fn default_tenure_weight() -> f64 {
    0.10
}

pub fn default_high_risk_score() -> f64 {
    70.0
}
pub fn default_no_history_score() -> f64 {
    50.0
}
pub fn default_unknown_last_event_score() -> f64 {
    80.0
}
