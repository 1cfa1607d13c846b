//! Per-shipper lifecycle thresholds derived from cadence.

use crate::config::ThresholdsConfig;
use serde::{Deserialize, Serialize};

/// Days of silence after which a shipper is at risk or churned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub at_risk_days: u32,
    pub churned_days: u32,
}

impl Thresholds {
    pub fn defaults(config: &ThresholdsConfig) -> Self {
        Self {
            at_risk_days: config.default_at_risk_days,
            churned_days: config.default_churned_days,
        }
    }
}

/// Derive thresholds from a cadence estimate.
///
/// Unknown, non-positive, or unreliable cadence falls back to the defaults.
/// Otherwise each threshold is a rounded cadence multiple clamped to its
/// bounds. `churned_days > at_risk_days` always holds on return.
pub fn compute_thresholds(
    cadence_days: Option<f64>,
    total_events: usize,
    config: &ThresholdsConfig,
) -> Thresholds {
    let cadence = match cadence_days {
        Some(days) if days > 0.0 && total_events >= config.reliable_pattern_events => days,
        _ => return Thresholds::defaults(config),
    };

    let at_risk_days = clamp_days(
        cadence * config.at_risk_multiplier,
        config.min_at_risk_days,
        config.max_at_risk_days,
    );
    let mut churned_days = clamp_days(
        cadence * config.churned_multiplier,
        config.min_churned_days,
        config.max_churned_days,
    );

    if churned_days <= at_risk_days {
        churned_days = at_risk_days + config.collapse_gap_days;
    }

    Thresholds {
        at_risk_days,
        churned_days,
    }
}

fn clamp_days(days: f64, min: u32, max: u32) -> u32 {
    // An unvalidated config may carry inverted bounds
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    // Rounded value is clamped in f64 first so huge cadences cannot overflow
    days.round().clamp(f64::from(lo), f64::from(hi)) as u32
}
