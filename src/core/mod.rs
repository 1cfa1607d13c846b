pub mod time;
pub mod types;

pub use types::{LifecycleStatus, ShipperId, StatusCounts, VentureId};

use crate::errors::{ChurnError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single historic transaction (load) for a shipper
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub shipper_id: ShipperId,
    pub occurred_at: DateTime<Utc>,
}

/// A shipper's transaction timestamps in ascending order.
///
/// Construction validates ordering once, so the cadence estimator and scorer
/// can rely on it without re-checking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    timestamps: Vec<DateTime<Utc>>,
}

impl EventLog {
    /// Build a log from timestamps that must already be in non-decreasing order.
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        if let Some(pos) = timestamps.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(ChurnError::invalid_input(format!(
                "event timestamps out of order at position {}: {} precedes {}",
                pos + 1,
                timestamps[pos + 1],
                timestamps[pos]
            )));
        }
        Ok(Self { timestamps })
    }

    /// Build a log from timestamps in any order.
    pub fn from_unordered(mut timestamps: Vec<DateTime<Utc>>) -> Self {
        timestamps.sort_unstable();
        Self { timestamps }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Consecutive gaps in fractional days (n - 1 gaps for n events)
    pub fn gaps_in_days(&self) -> Vec<f64> {
        self.timestamps
            .windows(2)
            .map(|pair| time::days_between(pair[1], pair[0]))
            .collect()
    }

    /// Number of events at or after `cutoff`
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        // Ascending order: everything from the first qualifying index onward
        let start = self.timestamps.partition_point(|ts| *ts < cutoff);
        self.timestamps.len() - start
    }
}

/// Persisted shipper entity.
///
/// Identity, tenure and the `is_active`/`is_test` flags belong to the storage
/// layer; this crate only writes the metric and lifecycle fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipperRecord {
    pub id: ShipperId,
    pub name: String,
    pub venture_id: VentureId,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_test: bool,

    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub churned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactivated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub first_event_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_event_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_events_historic: usize,
    #[serde(default)]
    pub avg_events_per_month: Option<f64>,
    #[serde(default)]
    pub cadence_days: Option<f64>,
    #[serde(default)]
    pub expected_next_event_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub metrics_calculated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl ShipperRecord {
    /// A freshly created shipper with no computed metrics
    pub fn new(
        id: impl Into<ShipperId>,
        name: impl Into<String>,
        venture_id: VentureId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            venture_id,
            created_at,
            is_active: true,
            is_test: false,
            status: LifecycleStatus::New,
            churned_at: None,
            reactivated_at: None,
            first_event_at: None,
            last_event_at: None,
            total_events_historic: 0,
            avg_events_per_month: None,
            cadence_days: None,
            expected_next_event_at: None,
            risk_score: None,
            metrics_calculated_at: None,
        }
    }

    /// Apply a metrics write in place (used by stores)
    pub fn apply_metrics(&mut self, update: &MetricsUpdate) {
        self.first_event_at = update.first_event_at;
        self.last_event_at = update.last_event_at;
        self.total_events_historic = update.total_events_historic;
        self.avg_events_per_month = update.avg_events_per_month;
        self.cadence_days = update.cadence_days;
        self.expected_next_event_at = update.expected_next_event_at;
        self.risk_score = Some(update.risk_score);
        self.metrics_calculated_at = Some(update.calculated_at);
    }

    /// Apply a status write in place (used by stores)
    pub fn apply_status(&mut self, update: &StatusUpdate) {
        self.status = update.status;
        if let Some(churned_at) = update.churned_at {
            self.churned_at = Some(churned_at);
        }
        if let Some(reactivated_at) = update.reactivated_at {
            self.reactivated_at = Some(reactivated_at);
        }
    }
}

/// Partial write of the derived metric fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub total_events_historic: usize,
    pub avg_events_per_month: Option<f64>,
    pub cadence_days: Option<f64>,
    pub expected_next_event_at: Option<DateTime<Utc>>,
    pub risk_score: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Partial write of the lifecycle fields.
///
/// `None` stamps leave the stored value untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: LifecycleStatus,
    pub churned_at: Option<DateTime<Utc>>,
    pub reactivated_at: Option<DateTime<Utc>>,
}

/// Read-side filter for bulk shipper queries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperFilter {
    pub venture_id: Option<VentureId>,
    pub active_only: bool,
    pub include_test: bool,
    pub status: Option<LifecycleStatus>,
}

impl ShipperFilter {
    /// Active, non-test shippers, optionally within one venture
    pub fn portfolio(venture_id: Option<VentureId>) -> Self {
        Self {
            venture_id,
            active_only: true,
            include_test: false,
            status: None,
        }
    }

    /// Every shipper, optionally within one venture
    pub fn everything(venture_id: Option<VentureId>) -> Self {
        Self {
            venture_id,
            active_only: false,
            include_test: true,
            status: None,
        }
    }

    pub fn with_test_data(mut self, include_test: bool) -> Self {
        self.include_test = include_test;
        self
    }

    pub fn with_status(mut self, status: LifecycleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &ShipperRecord) -> bool {
        self.venture_id.is_none_or(|v| v == record.venture_id)
            && (!self.active_only || record.is_active)
            && (self.include_test || !record.is_test)
            && self.status.is_none_or(|s| s == record.status)
    }
}
