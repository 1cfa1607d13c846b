//! Cadence estimation from a shipper's event timeline.
//!
//! Converts an ordered event log into the typical number of days between
//! transactions, a predicted next transaction date, and the rate statistics
//! the risk scorer consumes.
//!
//! The estimate depends on how much history exists:
//!
//! | Events | `cadence_days` |
//! |--------|----------------|
//! | 0 or 1 | `None` |
//! | below the reliable-pattern count | mean gap, capped at the default churned threshold |
//! | reliable pattern | symmetric trimmed mean of all gaps |
//!
//! Any defined cadence is clamped to at least one day.

use crate::config::ChurnmapConfig;
use crate::core::time::{add_days, days_between, whole_days_between};
use crate::core::EventLog;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived cadence statistics for one shipper at a reference time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CadenceMetrics {
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub total_events_historic: usize,
    pub avg_events_per_month: Option<f64>,
    pub cadence_days: Option<f64>,
    pub expected_next_event_at: Option<DateTime<Utc>>,
    pub recent_event_count: usize,
    pub expected_recent_events: f64,
}

impl CadenceMetrics {
    /// Metrics for a shipper that has never transacted
    pub fn empty() -> Self {
        Self {
            first_event_at: None,
            last_event_at: None,
            total_events_historic: 0,
            avg_events_per_month: None,
            cadence_days: None,
            expected_next_event_at: None,
            recent_event_count: 0,
            expected_recent_events: 0.0,
        }
    }

    /// Enough history for trimmed-mean cadence and volume comparison
    pub fn has_reliable_pattern(&self, reliable_pattern_events: usize) -> bool {
        self.total_events_historic >= reliable_pattern_events
    }

    /// Whole days since the last event, if there was one
    pub fn days_since_last_event(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_event_at
            .map(|last| whole_days_between(now, last))
    }

    /// Whole days past the expected next event, only when positive
    pub fn days_overdue(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expected_next_event_at
            .filter(|expected| now > *expected)
            .map(|expected| whole_days_between(now, expected))
    }
}

/// Compute cadence metrics for an event log as of `now`.
pub fn compute_cadence_metrics(
    events: &EventLog,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> CadenceMetrics {
    let (first, last) = match (events.first(), events.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return CadenceMetrics::empty(),
    };

    let total = events.len();
    let cadence_cfg = &config.cadence;

    let days_since_first = days_between(now, first).max(1.0);
    let months_active = days_since_first / cadence_cfg.days_per_month;
    let avg_events_per_month = total as f64 / months_active.max(1.0);

    let cadence_days = estimate_cadence_days(&events.gaps_in_days(), config);
    let expected_next_event_at = cadence_days.map(|days| add_days(last, days));

    let recent_cutoff = now - Duration::days(i64::from(cadence_cfg.recent_window_days));
    let recent_event_count = events.count_since(recent_cutoff);
    let expected_recent_events = avg_events_per_month * cadence_cfg.recent_window_months();

    CadenceMetrics {
        first_event_at: Some(first),
        last_event_at: Some(last),
        total_events_historic: total,
        avg_events_per_month: Some(avg_events_per_month),
        cadence_days,
        expected_next_event_at,
        recent_event_count,
        expected_recent_events,
    }
}

/// Estimate typical days between events from consecutive gaps.
///
/// Returns `None` when there are no gaps (fewer than two events).
pub fn estimate_cadence_days(gaps: &[f64], config: &ChurnmapConfig) -> Option<f64> {
    if gaps.is_empty() {
        return None;
    }

    let event_count = gaps.len() + 1;
    let raw = if event_count >= config.thresholds.reliable_pattern_events {
        trimmed_mean(gaps, config.cadence.trim_fraction)?
    } else {
        // A short history is dominated by its first gap; cap it
        mean(gaps)?.min(f64::from(config.thresholds.default_churned_days))
    };

    Some(raw.max(1.0))
}

/// Symmetric trimmed mean.
///
/// Drops `ceil(len * fraction)` values from each end of the sorted input. If
/// that would leave nothing, the untrimmed mean is returned instead.
pub fn trimmed_mean(values: &[f64], fraction: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let trim = (sorted.len() as f64 * fraction).ceil() as usize;
    if trim * 2 >= sorted.len() {
        return mean(&sorted);
    }
    mean(&sorted[trim..sorted.len() - trim])
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Human-facing bucket for a cadence estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceBand {
    Unknown,
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl CadenceBand {
    pub fn from_days(days: Option<f64>) -> Self {
        match days {
            None => CadenceBand::Unknown,
            Some(d) if d <= 3.0 => CadenceBand::VeryHigh,
            Some(d) if d <= 7.0 => CadenceBand::High,
            Some(d) if d <= 14.0 => CadenceBand::Medium,
            Some(d) if d <= 30.0 => CadenceBand::Low,
            Some(_) => CadenceBand::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CadenceBand::Unknown => "Unknown",
            CadenceBand::VeryHigh => "Very High (1-3 days)",
            CadenceBand::High => "High (Weekly)",
            CadenceBand::Medium => "Medium (Bi-weekly)",
            CadenceBand::Low => "Low (Monthly)",
            CadenceBand::VeryLow => "Very Low (30+ days)",
        }
    }
}

impl fmt::Display for CadenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
