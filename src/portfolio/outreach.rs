//! Prioritized shipper lists for outreach.

use crate::core::time::whole_days_between;
use crate::core::{LifecycleStatus, ShipperId, ShipperRecord, VentureId};
use crate::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which outreach list to build
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutreachList {
    /// `AT_RISK` shippers, highest score first, then longest silent
    AtRisk,
    /// `CHURNED` shippers, most recently churned first
    Churned,
    /// Scores at or above a minimum among shippers still worth saving
    HighRisk,
}

impl OutreachList {
    pub fn label(&self) -> &'static str {
        match self {
            OutreachList::AtRisk => "At-risk shippers",
            OutreachList::Churned => "Churned shippers",
            OutreachList::HighRisk => "High-risk shippers",
        }
    }
}

impl fmt::Display for OutreachList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub venture_id: VentureId,
    pub limit: usize,
    pub include_test: bool,
    /// Only used by [`OutreachList::HighRisk`]
    pub min_score: f64,
}

impl ListQuery {
    pub fn new(venture_id: VentureId) -> Self {
        Self {
            venture_id,
            limit: 50,
            include_test: false,
            min_score: 70.0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_test_data(mut self, include_test: bool) -> Self {
        self.include_test = include_test;
        self
    }
}

/// One row of an outreach list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipperChurnInfo {
    pub id: ShipperId,
    pub name: String,
    pub venture_id: VentureId,
    pub last_event_at: Option<DateTime<Utc>>,
    pub status: LifecycleStatus,
    pub days_since_last_event: Option<i64>,
    pub event_count: usize,
    pub avg_events_per_month: Option<f64>,
    pub cadence_days: Option<f64>,
    pub expected_next_event_at: Option<DateTime<Utc>>,
    pub risk_score: Option<f64>,
    pub risk_level: RiskLevel,
    /// Whole days past the expected next event, only when positive
    pub days_overdue: Option<i64>,
}

impl ShipperChurnInfo {
    pub fn from_record(record: &ShipperRecord, event_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            venture_id: record.venture_id,
            last_event_at: record.last_event_at,
            status: record.status,
            days_since_last_event: record
                .last_event_at
                .map(|last| whole_days_between(now, last)),
            event_count,
            avg_events_per_month: record.avg_events_per_month,
            cadence_days: record.cadence_days,
            expected_next_event_at: record.expected_next_event_at,
            risk_score: record.risk_score,
            risk_level: RiskLevel::from_score(record.risk_score),
            days_overdue: record
                .expected_next_event_at
                .filter(|expected| now > *expected)
                .map(|expected| whole_days_between(now, expected)),
        }
    }
}

/// Filter and order candidate records for a list, then apply the limit.
///
/// Candidates are expected to be pre-filtered by venture, active flag and
/// test flag.
pub fn select_for_list(
    mut records: Vec<ShipperRecord>,
    list: OutreachList,
    query: &ListQuery,
) -> Vec<ShipperRecord> {
    match list {
        OutreachList::AtRisk => {
            records.retain(|r| r.status == LifecycleStatus::AtRisk);
            records.sort_by(|a, b| {
                desc_nulls_last(a.risk_score, b.risk_score)
                    .then_with(|| asc_nulls_last(a.last_event_at, b.last_event_at))
            });
        }
        OutreachList::Churned => {
            records.retain(|r| r.status == LifecycleStatus::Churned);
            records.sort_by(|a, b| desc_nulls_last(a.churned_at, b.churned_at));
        }
        OutreachList::HighRisk => {
            records.retain(|r| {
                matches!(
                    r.status,
                    LifecycleStatus::Active | LifecycleStatus::AtRisk | LifecycleStatus::Reactivated
                ) && r.risk_score.is_some_and(|s| s >= query.min_score)
            });
            records.sort_by(|a, b| desc_nulls_last(a.risk_score, b.risk_score));
        }
    }
    records.truncate(query.limit);
    records
}

fn desc_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn record(
        id: u64,
        status: LifecycleStatus,
        score: Option<f64>,
        last_days_ago: Option<i64>,
    ) -> ShipperRecord {
        let mut record = ShipperRecord::new(id, format!("S{}", id), 1, now() - Duration::days(500));
        record.status = status;
        record.risk_score = score;
        record.last_event_at = last_days_ago.map(|d| now() - Duration::days(d));
        record
    }

    fn ids(records: &[ShipperRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_at_risk_ordering() {
        let records = vec![
            record(1, LifecycleStatus::AtRisk, Some(50.0), Some(20)),
            record(2, LifecycleStatus::AtRisk, Some(70.0), Some(15)),
            record(3, LifecycleStatus::AtRisk, Some(50.0), Some(40)),
            record(4, LifecycleStatus::Active, Some(99.0), Some(1)),
            record(5, LifecycleStatus::AtRisk, None, Some(30)),
        ];
        let selected = select_for_list(records, OutreachList::AtRisk, &ListQuery::new(1));
        assert_eq!(ids(&selected), vec![2, 3, 1, 5]);
    }

    #[test]
    fn test_churned_ordering_and_limit() {
        let mut records: Vec<ShipperRecord> = (1..=4)
            .map(|id| record(id, LifecycleStatus::Churned, Some(90.0), Some(60)))
            .collect();
        for (i, r) in records.iter_mut().enumerate() {
            r.churned_at = Some(now() - Duration::days(i as i64 * 10));
        }
        let selected = select_for_list(
            records,
            OutreachList::Churned,
            &ListQuery::new(1).with_limit(2),
        );
        assert_eq!(ids(&selected), vec![1, 2]);
    }

    #[test]
    fn test_high_risk_excludes_churned_and_new() {
        let records = vec![
            record(1, LifecycleStatus::Active, Some(72.0), Some(10)),
            record(2, LifecycleStatus::Churned, Some(95.0), Some(90)),
            record(3, LifecycleStatus::Reactivated, Some(88.0), Some(5)),
            record(4, LifecycleStatus::AtRisk, Some(69.0), Some(20)),
            record(5, LifecycleStatus::New, Some(80.0), None),
        ];
        let selected = select_for_list(records, OutreachList::HighRisk, &ListQuery::new(1));
        assert_eq!(ids(&selected), vec![3, 1]);

        let lowered = vec![record(4, LifecycleStatus::AtRisk, Some(69.0), Some(20))];
        let selected = select_for_list(
            lowered,
            OutreachList::HighRisk,
            &ListQuery::new(1).with_min_score(60.0),
        );
        assert_eq!(ids(&selected), vec![4]);
    }

    #[test]
    fn test_info_days_overdue() {
        let mut r = record(1, LifecycleStatus::AtRisk, Some(55.0), Some(20));
        r.expected_next_event_at = Some(now() - Duration::hours(36));
        let info = ShipperChurnInfo::from_record(&r, 12, now());
        assert_eq!(info.days_since_last_event, Some(20));
        assert_eq!(info.days_overdue, Some(1));
        assert_eq!(info.risk_level, RiskLevel::Medium);

        r.expected_next_event_at = Some(now() + Duration::days(2));
        assert_eq!(ShipperChurnInfo::from_record(&r, 12, now()).days_overdue, None);
    }
}
