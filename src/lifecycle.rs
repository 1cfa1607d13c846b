//! Lifecycle status state machine.
//!
//! Rules, in order:
//!
//! 1. No events and created within the new-shipper window: `NEW`.
//! 2. No events and older than that: `CHURNED` past the default churned
//!    threshold, else `AT_RISK`.
//! 3. Otherwise days since the last event against the shipper's thresholds
//!    gives a candidate `CHURNED`, `AT_RISK` or `ACTIVE`.
//! 4. A candidate `ACTIVE` after `CHURNED` becomes `REACTIVATED`, and stays
//!    `REACTIVATED` until the shipper declines again.
//!
//! `churned_at` is stamped on entry into `CHURNED`, `reactivated_at` on
//! `CHURNED -> REACTIVATED`. An unchanged status produces no write.

use crate::cadence::CadenceMetrics;
use crate::config::{ChurnmapConfig, ThresholdsConfig};
use crate::core::time::whole_days_between;
use crate::core::{EventLog, LifecycleStatus, StatusUpdate};
use crate::risk::{compute_shipper_metrics, ShipperMetrics};
use crate::thresholds::{compute_thresholds, Thresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one status evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDecision {
    pub previous: LifecycleStatus,
    pub status: LifecycleStatus,
    pub churned_at: Option<DateTime<Utc>>,
    pub reactivated_at: Option<DateTime<Utc>>,
}

impl StatusDecision {
    pub fn changed(&self) -> bool {
        self.status != self.previous
    }

    /// The write to persist, or `None` when nothing changed
    pub fn to_update(&self) -> Option<StatusUpdate> {
        self.changed().then(|| StatusUpdate {
            status: self.status,
            churned_at: self.churned_at,
            reactivated_at: self.reactivated_at,
        })
    }
}

/// Status implied by recency alone, before hysteresis (rules 1-3)
pub fn candidate_status(
    last_event_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
    config: &ThresholdsConfig,
) -> LifecycleStatus {
    let Some(last_event_at) = last_event_at else {
        let days_since_creation = whole_days_between(now, created_at);
        return if days_since_creation <= i64::from(config.new_shipper_days) {
            LifecycleStatus::New
        } else if days_since_creation > i64::from(config.default_churned_days) {
            LifecycleStatus::Churned
        } else {
            LifecycleStatus::AtRisk
        };
    };

    let days_since_last = whole_days_between(now, last_event_at);
    if days_since_last > i64::from(thresholds.churned_days) {
        LifecycleStatus::Churned
    } else if days_since_last > i64::from(thresholds.at_risk_days) {
        LifecycleStatus::AtRisk
    } else {
        LifecycleStatus::Active
    }
}

/// Rule 4: a won-back shipper cannot jump straight to plain `ACTIVE`
pub fn apply_hysteresis(previous: LifecycleStatus, candidate: LifecycleStatus) -> LifecycleStatus {
    match (previous, candidate) {
        (LifecycleStatus::Churned | LifecycleStatus::Reactivated, LifecycleStatus::Active) => {
            LifecycleStatus::Reactivated
        }
        _ => candidate,
    }
}

/// Decide the next lifecycle status and which stamps to set.
pub fn transition_status(
    last_event_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    thresholds: &Thresholds,
    previous: LifecycleStatus,
    now: DateTime<Utc>,
    config: &ThresholdsConfig,
) -> StatusDecision {
    let candidate = candidate_status(last_event_at, created_at, thresholds, now, config);
    let status = apply_hysteresis(previous, candidate);

    let entering = |target: LifecycleStatus| status == target && previous != target;
    let churned_at = entering(LifecycleStatus::Churned).then_some(now);
    let reactivated_at = (entering(LifecycleStatus::Reactivated)
        && previous == LifecycleStatus::Churned)
        .then_some(now);

    StatusDecision {
        previous,
        status,
        churned_at,
        reactivated_at,
    }
}

/// Everything one recompute derives for a shipper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipperAssessment {
    pub metrics: ShipperMetrics,
    pub thresholds: Thresholds,
    pub decision: StatusDecision,
}

/// Pure per-shipper recompute: event log, tenure anchor and previous status
/// in; metrics, score and next status out.
pub fn assess_shipper(
    events: &EventLog,
    created_at: DateTime<Utc>,
    previous: LifecycleStatus,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> ShipperAssessment {
    let metrics = compute_shipper_metrics(events, Some(created_at), now, config);
    let (thresholds, decision) = decide_from_metrics(&metrics.cadence, created_at, previous, now, config);
    ShipperAssessment {
        metrics,
        thresholds,
        decision,
    }
}

/// Status decision from already-known cadence fields
pub fn decide_from_metrics(
    cadence: &CadenceMetrics,
    created_at: DateTime<Utc>,
    previous: LifecycleStatus,
    now: DateTime<Utc>,
    config: &ChurnmapConfig,
) -> (Thresholds, StatusDecision) {
    let thresholds = compute_thresholds(
        cadence.cadence_days,
        cadence.total_events_historic,
        &config.thresholds,
    );
    let decision = transition_status(
        cadence.last_event_at,
        created_at,
        &thresholds,
        previous,
        now,
        &config.thresholds,
    );
    (thresholds, decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        reference() - Duration::days(days)
    }

    fn default_thresholds() -> Thresholds {
        Thresholds::defaults(&ThresholdsConfig::default())
    }

    #[test]
    fn test_no_events_young_shipper_is_new() {
        let config = ThresholdsConfig::default();
        let status = candidate_status(None, days_ago(30), &default_thresholds(), reference(), &config);
        assert_eq!(status, LifecycleStatus::New);
    }

    #[test]
    fn test_no_events_old_shipper_is_churned() {
        let config = ThresholdsConfig::default();
        let status = candidate_status(None, days_ago(31), &default_thresholds(), reference(), &config);
        assert_eq!(status, LifecycleStatus::Churned);
    }

    #[test]
    fn test_no_events_between_windows_is_at_risk() {
        let config = ThresholdsConfig {
            new_shipper_days: 10,
            ..Default::default()
        };
        let status = candidate_status(None, days_ago(20), &default_thresholds(), reference(), &config);
        assert_eq!(status, LifecycleStatus::AtRisk);
    }

    #[test]
    fn test_recency_candidates() {
        let config = ThresholdsConfig::default();
        let t = default_thresholds();
        let created = days_ago(365);
        let at = |d| candidate_status(Some(days_ago(d)), created, &t, reference(), &config);

        assert_eq!(at(14), LifecycleStatus::Active);
        assert_eq!(at(15), LifecycleStatus::AtRisk);
        assert_eq!(at(30), LifecycleStatus::AtRisk);
        assert_eq!(at(31), LifecycleStatus::Churned);
    }

    #[test]
    fn test_churned_to_active_becomes_reactivated() {
        let config = ThresholdsConfig::default();
        let decision = transition_status(
            Some(days_ago(1)),
            days_ago(365),
            &default_thresholds(),
            LifecycleStatus::Churned,
            reference(),
            &config,
        );
        assert_eq!(decision.status, LifecycleStatus::Reactivated);
        assert_eq!(decision.reactivated_at, Some(reference()));
        assert_eq!(decision.churned_at, None);
        assert!(decision.changed());
    }

    #[test]
    fn test_reactivated_stays_reactivated_while_active() {
        let config = ThresholdsConfig::default();
        let decision = transition_status(
            Some(days_ago(2)),
            days_ago(365),
            &default_thresholds(),
            LifecycleStatus::Reactivated,
            reference(),
            &config,
        );
        assert_eq!(decision.status, LifecycleStatus::Reactivated);
        assert_eq!(decision.reactivated_at, None);
        assert_eq!(decision.to_update(), None);
    }

    #[test]
    fn test_reactivated_can_decline_again() {
        let config = ThresholdsConfig::default();
        let decision = transition_status(
            Some(days_ago(20)),
            days_ago(365),
            &default_thresholds(),
            LifecycleStatus::Reactivated,
            reference(),
            &config,
        );
        assert_eq!(decision.status, LifecycleStatus::AtRisk);
    }

    #[test]
    fn test_entering_churned_stamps_once() {
        let config = ThresholdsConfig::default();
        let first = transition_status(
            Some(days_ago(45)),
            days_ago(365),
            &default_thresholds(),
            LifecycleStatus::AtRisk,
            reference(),
            &config,
        );
        assert_eq!(
            first.to_update(),
            Some(StatusUpdate {
                status: LifecycleStatus::Churned,
                churned_at: Some(reference()),
                reactivated_at: None,
            })
        );

        let second = transition_status(
            Some(days_ago(46)),
            days_ago(365),
            &default_thresholds(),
            LifecycleStatus::Churned,
            reference() + Duration::days(1),
            &config,
        );
        assert!(!second.changed());
        assert_eq!(second.churned_at, None);
    }

    #[test]
    fn test_weekly_shipper_lapses_to_churned() {
        // created 200 days ago, weekly events for ~100 days, silent for 40
        let config = ChurnmapConfig::default();
        let last = days_ago(40);
        let timestamps: Vec<_> = (0..15).rev().map(|i| last - Duration::days(i * 7)).collect();
        let events = EventLog::new(timestamps).unwrap();

        let assessment = assess_shipper(
            &events,
            days_ago(200),
            LifecycleStatus::Active,
            reference(),
            &config,
        );

        let cadence = assessment.metrics.cadence.cadence_days.unwrap();
        assert!((cadence - 7.0).abs() < 1e-9);
        assert_eq!(
            assessment.thresholds,
            Thresholds {
                at_risk_days: 11,
                churned_days: 21
            }
        );
        assert_eq!(assessment.decision.status, LifecycleStatus::Churned);
        assert_eq!(assessment.decision.churned_at, Some(reference()));
    }

    #[test]
    fn test_empty_history_assessment() {
        let config = ChurnmapConfig::default();
        let young = assess_shipper(
            &EventLog::empty(),
            days_ago(5),
            LifecycleStatus::New,
            reference(),
            &config,
        );
        assert_eq!(young.metrics.risk_score, 50.0);
        assert_eq!(young.metrics.cadence.cadence_days, None);
        assert_eq!(young.decision.status, LifecycleStatus::New);
        assert!(!young.decision.changed());

        let old = assess_shipper(
            &EventLog::empty(),
            days_ago(90),
            LifecycleStatus::New,
            reference(),
            &config,
        );
        assert_eq!(old.decision.status, LifecycleStatus::Churned);
    }

    #[test]
    fn test_recompute_twice_is_a_no_op() {
        let config = ChurnmapConfig::default();
        let events = EventLog::new(vec![days_ago(60), days_ago(50), days_ago(45)]).unwrap();

        let first = assess_shipper(&events, days_ago(100), LifecycleStatus::Active, reference(), &config);
        assert!(first.decision.changed());

        let second = assess_shipper(
            &events,
            days_ago(100),
            first.decision.status,
            reference(),
            &config,
        );
        assert!(!second.decision.changed());
        assert_eq!(second.decision.to_update(), None);
        assert_eq!(first.metrics, second.metrics);
    }
}
