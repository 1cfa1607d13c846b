pub mod components;

pub use components::RiskComponents;

use crate::cadence::{compute_cadence_metrics, CadenceMetrics};
use crate::config::ChurnmapConfig;
use crate::core::{EventLog, MetricsUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score churn risk on a 0-100 scale, higher meaning more likely lapsed.
///
/// A shipper whose last event is unknown gets the fixed
/// `unknown_last_event_score`; otherwise the four weighted components are
/// summed, rounded and clamped.
pub fn score_churn_risk(
    metrics: &CadenceMetrics,
    tenure_anchor: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> f64 {
    explain_churn_risk(metrics, tenure_anchor, now, config).score
}

/// A score together with the components that produced it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub score: f64,
    /// Absent when the fixed unknown-last-event score was used
    pub components: Option<RiskComponents>,
}

pub fn explain_churn_risk(
    metrics: &CadenceMetrics,
    tenure_anchor: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> RiskBreakdown {
    if metrics.last_event_at.is_none() {
        return RiskBreakdown {
            score: config.scoring.unknown_last_event_score,
            components: None,
        };
    }

    let components = RiskComponents::evaluate(metrics, tenure_anchor, now, config);
    let score = components.weighted_sum(config).round().clamp(0.0, 100.0);
    RiskBreakdown {
        score,
        components: Some(components),
    }
}

/// Cadence metrics plus the score derived from them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipperMetrics {
    pub cadence: CadenceMetrics,
    pub risk_score: f64,
}

impl ShipperMetrics {
    pub fn to_update(&self, calculated_at: DateTime<Utc>) -> MetricsUpdate {
        MetricsUpdate {
            first_event_at: self.cadence.first_event_at,
            last_event_at: self.cadence.last_event_at,
            total_events_historic: self.cadence.total_events_historic,
            avg_events_per_month: self.cadence.avg_events_per_month,
            cadence_days: self.cadence.cadence_days,
            expected_next_event_at: self.cadence.expected_next_event_at,
            risk_score: self.risk_score,
            calculated_at,
        }
    }
}

/// Compute cadence and risk for one event history.
///
/// An empty history short-circuits to `no_history_score`, which differs from
/// the scorer's own unknown-last-event score. Both values are intentional.
pub fn compute_shipper_metrics(
    events: &EventLog,
    tenure_anchor: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> ShipperMetrics {
    if events.is_empty() {
        return ShipperMetrics {
            cadence: CadenceMetrics::empty(),
            risk_score: config.scoring.no_history_score,
        };
    }

    let cadence = compute_cadence_metrics(events, now, config);
    let risk_score = score_churn_risk(&cadence, tenure_anchor, now, config);
    ShipperMetrics {
        cadence,
        risk_score,
    }
}

/// Outreach priority bucket for a stored score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Shippers never scored sit in the middle
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => RiskLevel::Medium,
            Some(s) if s >= 80.0 => RiskLevel::Critical,
            Some(s) if s >= 60.0 => RiskLevel::High,
            Some(s) if s >= 40.0 => RiskLevel::Medium,
            Some(_) => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
