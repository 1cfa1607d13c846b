//! The four churn risk signals.
//!
//! Each function returns a sub-score clamped to `[0, 100]`; the weighted
//! combination lives in the parent module.

use crate::cadence::CadenceMetrics;
use crate::config::ChurnmapConfig;
use crate::core::time::days_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-signal sub-scores before weighting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub days_overdue: f64,
    pub volume_decline: f64,
    pub pattern_deviation: f64,
    pub tenure: f64,
}

impl RiskComponents {
    pub fn evaluate(
        metrics: &CadenceMetrics,
        tenure_anchor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        config: &ChurnmapConfig,
    ) -> Self {
        Self {
            days_overdue: days_overdue_score(metrics, now, config),
            volume_decline: volume_decline_score(metrics, config),
            pattern_deviation: pattern_deviation_score(metrics, now, config),
            tenure: tenure_score(tenure_anchor, now, config),
        }
    }

    /// Unrounded weighted sum
    pub fn weighted_sum(&self, config: &ChurnmapConfig) -> f64 {
        let w = &config.scoring.weights;
        self.days_overdue * w.days_overdue
            + self.volume_decline * w.volume_decline
            + self.pattern_deviation * w.pattern_deviation
            + self.tenure * w.tenure
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Recency signal: how far past the expected next event the shipper is.
///
/// Without an expected date, scales from 0 at the default at-risk threshold
/// to 100 at twice that.
pub fn days_overdue_score(
    metrics: &CadenceMetrics,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> f64 {
    let at_risk = f64::from(config.thresholds.default_at_risk_days);

    if metrics.expected_next_event_at.is_some() {
        return match metrics.days_overdue(now) {
            Some(overdue) => {
                let cadence = metrics.cadence_days.unwrap_or(at_risk);
                clamp_score(overdue as f64 / cadence * 100.0)
            }
            None => 0.0,
        };
    }

    match metrics.days_since_last_event(now) {
        Some(days) if days as f64 > at_risk => clamp_score((days as f64 - at_risk) / at_risk * 100.0),
        _ => 0.0,
    }
}

/// Volume signal: recent event count against the historic rate
pub fn volume_decline_score(metrics: &CadenceMetrics, config: &ChurnmapConfig) -> f64 {
    let reliable = metrics.has_reliable_pattern(config.thresholds.reliable_pattern_events)
        && metrics.expected_recent_events > 0.0;

    if !reliable {
        return if metrics.recent_event_count == 0 && metrics.total_events_historic > 0 {
            70.0
        } else {
            0.0
        };
    }

    let ratio = metrics.recent_event_count as f64 / metrics.expected_recent_events;
    match ratio {
        r if r >= 1.0 => 0.0,
        r if r >= 0.75 => 15.0,
        r if r >= 0.5 => 35.0,
        r if r >= 0.25 => 60.0,
        _ if metrics.recent_event_count == 0 => 100.0,
        _ => 80.0,
    }
}

/// Deviation signal: how many cadence multiples past due the shipper is
pub fn pattern_deviation_score(
    metrics: &CadenceMetrics,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> f64 {
    if let (Some(cadence), Some(_)) = (metrics.cadence_days, metrics.expected_next_event_at) {
        let Some(days_over) = metrics.days_overdue(now) else {
            return 0.0;
        };
        let multiple = days_over as f64 / cadence;
        return match multiple {
            m if m <= 0.5 => 10.0,
            m if m <= 1.0 => 30.0,
            m if m <= 2.0 => 60.0,
            m => clamp_score(60.0 + m * 10.0),
        };
    }

    let at_risk = f64::from(config.thresholds.default_at_risk_days);
    let churned = f64::from(config.thresholds.default_churned_days);
    match metrics.days_since_last_event(now) {
        Some(days) if days as f64 > at_risk => clamp_score(days as f64 / churned * 50.0),
        _ => 0.0,
    }
}

/// Relationship age signal; an unknown anchor is treated as risky
pub fn tenure_score(
    tenure_anchor: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> f64 {
    let Some(anchor) = tenure_anchor else {
        return 40.0;
    };

    let months = days_between(now, anchor) / config.cadence.days_per_month;
    match months {
        m if m < 2.0 => 25.0,
        m if m < 6.0 => 15.0,
        m if m < 12.0 => 5.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn lapsed(days_since_last: i64, cadence: Option<f64>) -> CadenceMetrics {
        let last = now() - Duration::days(days_since_last);
        CadenceMetrics {
            first_event_at: Some(last - Duration::days(100)),
            last_event_at: Some(last),
            total_events_historic: 10,
            avg_events_per_month: Some(3.0),
            cadence_days: cadence,
            expected_next_event_at: cadence.map(|c| crate::core::time::add_days(last, c)),
            recent_event_count: 0,
            expected_recent_events: 6.0,
        }
    }

    #[test]
    fn test_days_overdue_relative_to_cadence() {
        let config = ChurnmapConfig::default();
        // 10 days since last, cadence 5: 5 days overdue = one full cadence
        assert_eq!(days_overdue_score(&lapsed(10, Some(5.0)), now(), &config), 100.0);
        // 12 days since last, cadence 10: 2 days overdue
        assert!((days_overdue_score(&lapsed(12, Some(10.0)), now(), &config) - 20.0).abs() < 1e-9);
        // Not yet due
        assert_eq!(days_overdue_score(&lapsed(20, Some(30.0)), now(), &config), 0.0);
    }

    #[test]
    fn test_days_overdue_without_expected_date() {
        let config = ChurnmapConfig::default();
        assert_eq!(days_overdue_score(&lapsed(14, None), now(), &config), 0.0);
        assert!((days_overdue_score(&lapsed(21, None), now(), &config) - 50.0).abs() < 1e-9);
        assert_eq!(days_overdue_score(&lapsed(60, None), now(), &config), 100.0);
    }

    #[test]
    fn test_volume_bands() {
        let config = ChurnmapConfig::default();
        let mut metrics = lapsed(1, Some(7.0));
        metrics.expected_recent_events = 8.0;

        let cases = [(8, 0.0), (6, 15.0), (4, 35.0), (2, 60.0), (1, 80.0), (0, 100.0)];
        for (recent, expected) in cases {
            metrics.recent_event_count = recent;
            assert_eq!(
                volume_decline_score(&metrics, &config),
                expected,
                "recent count {}",
                recent
            );
        }
    }

    #[test]
    fn test_volume_unreliable_history() {
        let config = ChurnmapConfig::default();
        let mut metrics = lapsed(90, None);
        metrics.total_events_historic = 2;
        assert_eq!(volume_decline_score(&metrics, &config), 70.0);

        metrics.recent_event_count = 1;
        assert_eq!(volume_decline_score(&metrics, &config), 0.0);

        assert_eq!(volume_decline_score(&CadenceMetrics::empty(), &config), 0.0);
    }

    #[test]
    fn test_pattern_deviation_bands() {
        let config = ChurnmapConfig::default();
        // cadence 10: overdue 5 / 10 / 20 / 40 days
        assert_eq!(pattern_deviation_score(&lapsed(15, Some(10.0)), now(), &config), 10.0);
        assert_eq!(pattern_deviation_score(&lapsed(20, Some(10.0)), now(), &config), 30.0);
        assert_eq!(pattern_deviation_score(&lapsed(30, Some(10.0)), now(), &config), 60.0);
        assert_eq!(pattern_deviation_score(&lapsed(40, Some(10.0)), now(), &config), 90.0);
        assert_eq!(pattern_deviation_score(&lapsed(80, Some(10.0)), now(), &config), 100.0);
        assert_eq!(pattern_deviation_score(&lapsed(5, Some(10.0)), now(), &config), 0.0);
    }

    #[test]
    fn test_pattern_deviation_fallback() {
        let config = ChurnmapConfig::default();
        assert_eq!(pattern_deviation_score(&lapsed(10, None), now(), &config), 0.0);
        assert!((pattern_deviation_score(&lapsed(30, None), now(), &config) - 50.0).abs() < 1e-9);
        assert_eq!(pattern_deviation_score(&lapsed(90, None), now(), &config), 100.0);
    }

    #[test]
    fn test_tenure_bands() {
        let config = ChurnmapConfig::default();
        let at = |days: i64| Some(now() - Duration::days(days));
        assert_eq!(tenure_score(at(10), now(), &config), 25.0);
        assert_eq!(tenure_score(at(90), now(), &config), 15.0);
        assert_eq!(tenure_score(at(200), now(), &config), 5.0);
        assert_eq!(tenure_score(at(400), now(), &config), 0.0);
        assert_eq!(tenure_score(None, now(), &config), 40.0);
    }
}
