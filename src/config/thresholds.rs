use serde::{Deserialize, Serialize};

/// Day thresholds for lifecycle classification.
///
/// Defaults apply to shippers without a reliable pattern; the bounds clamp
/// thresholds derived from a shipper's own cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsConfig {
    /// Minimum historic events before cadence-based thresholds are trusted
    #[serde(default = "default_reliable_pattern_events")]
    pub reliable_pattern_events: usize,

    #[serde(default = "default_at_risk_days")]
    pub default_at_risk_days: u32,

    #[serde(default = "default_churned_days")]
    pub default_churned_days: u32,

    /// Shippers younger than this with no events are NEW
    #[serde(default = "default_new_shipper_days")]
    pub new_shipper_days: u32,

    #[serde(default = "default_min_at_risk_days")]
    pub min_at_risk_days: u32,
    #[serde(default = "default_max_at_risk_days")]
    pub max_at_risk_days: u32,
    #[serde(default = "default_min_churned_days")]
    pub min_churned_days: u32,
    #[serde(default = "default_max_churned_days")]
    pub max_churned_days: u32,

    #[serde(default = "default_at_risk_multiplier")]
    pub at_risk_multiplier: f64,
    #[serde(default = "default_churned_multiplier")]
    pub churned_multiplier: f64,

    /// Gap forced between the two thresholds when clamping collapses them
    #[serde(default = "default_collapse_gap_days")]
    pub collapse_gap_days: u32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            reliable_pattern_events: default_reliable_pattern_events(),
            default_at_risk_days: default_at_risk_days(),
            default_churned_days: default_churned_days(),
            new_shipper_days: default_new_shipper_days(),
            min_at_risk_days: default_min_at_risk_days(),
            max_at_risk_days: default_max_at_risk_days(),
            min_churned_days: default_min_churned_days(),
            max_churned_days: default_max_churned_days(),
            at_risk_multiplier: default_at_risk_multiplier(),
            churned_multiplier: default_churned_multiplier(),
            collapse_gap_days: default_collapse_gap_days(),
        }
    }
}

impl ThresholdsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.reliable_pattern_events < 2 {
            return Err("reliable_pattern_events must be at least 2".to_string());
        }
        if self.default_churned_days <= self.default_at_risk_days {
            return Err(format!(
                "default_churned_days ({}) must exceed default_at_risk_days ({})",
                self.default_churned_days, self.default_at_risk_days
            ));
        }
        if self.min_at_risk_days > self.max_at_risk_days {
            return Err("min_at_risk_days must not exceed max_at_risk_days".to_string());
        }
        if self.min_churned_days > self.max_churned_days {
            return Err("min_churned_days must not exceed max_churned_days".to_string());
        }
        if self.collapse_gap_days == 0 {
            return Err("collapse_gap_days must be positive".to_string());
        }
        if !(self.at_risk_multiplier > 0.0 && self.churned_multiplier > 0.0) {
            return Err("threshold multipliers must be positive".to_string());
        }
        Ok(())
    }
}

fn default_reliable_pattern_events() -> usize {
    3
}
fn default_at_risk_days() -> u32 {
    14
}
fn default_churned_days() -> u32 {
    30
}
fn default_new_shipper_days() -> u32 {
    30
}
fn default_min_at_risk_days() -> u32 {
    7
}
fn default_max_at_risk_days() -> u32 {
    45
}
fn default_min_churned_days() -> u32 {
    14
}
fn default_max_churned_days() -> u32 {
    90
}
fn default_at_risk_multiplier() -> f64 {
    1.5
}
fn default_churned_multiplier() -> f64 {
    3.0
}
fn default_collapse_gap_days() -> u32 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ThresholdsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_defaults_rejected() {
        let config = ThresholdsConfig {
            default_at_risk_days: 30,
            default_churned_days: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = ThresholdsConfig {
            min_churned_days: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
