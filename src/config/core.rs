use serde::{Deserialize, Serialize};

use super::parallel::BatchConfig;
use super::scoring::ScoringConfig;
use super::thresholds::ThresholdsConfig;

/// Root configuration structure for churnmap.
///
/// Built once at startup and passed by reference; nothing mutates it after
/// loading.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChurnmapConfig {
    /// Lifecycle day thresholds
    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    /// Cadence estimation settings
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// Risk scoring weights and fixed scores
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Bulk recompute settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl ChurnmapConfig {
    /// Validate every section, reporting all problems at once
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let errors: Vec<String> = [
            self.thresholds.validate(),
            self.cadence.validate(),
            self.scoring.weights.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Cadence estimation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CadenceConfig {
    /// Fraction of gaps trimmed from each end before averaging
    #[serde(default = "default_trim_fraction")]
    pub trim_fraction: f64,

    /// Trailing window used for the recent event count
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: u32,

    /// Length of a "month" when normalizing event rates.
    ///
    /// A fixed 30-day month is an accepted approximation: it slightly
    /// understates rates across 31-day months.
    #[serde(default = "default_days_per_month")]
    pub days_per_month: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            trim_fraction: default_trim_fraction(),
            recent_window_days: default_recent_window_days(),
            days_per_month: default_days_per_month(),
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(format!(
                "trim_fraction must be in [0.0, 0.5), got {}",
                self.trim_fraction
            ));
        }
        if self.recent_window_days == 0 {
            return Err("recent_window_days must be positive".to_string());
        }
        if self.days_per_month <= 0.0 {
            return Err("days_per_month must be positive".to_string());
        }
        Ok(())
    }

    /// The recent window expressed in months, used to scale the expected count
    pub fn recent_window_months(&self) -> f64 {
        f64::from(self.recent_window_days) / self.days_per_month
    }
}

fn default_trim_fraction() -> f64 {
    0.10
}
fn default_recent_window_days() -> u32 {
    60
}
fn default_days_per_month() -> f64 {
    30.0
}
