//! Storage trait definitions for churn computation.
//!
//! The engine never talks to a database directly. It reads ordered event
//! logs and shipper records, and writes partial metric and status updates,
//! through these traits. That keeps the scoring core pure and lets tests
//! swap in [`crate::io::MemoryStore`] or a failing double.
//!
//! # Example
//!
//! ```rust,ignore
//! use churnmap::io::traits::EventSource;
//!
//! fn last_event<E: EventSource>(source: &E, id: ShipperId) -> Result<Option<DateTime<Utc>>> {
//!     Ok(source.events_for(id)?.last())
//! }
//! ```

use crate::core::{
    EventLog, LifecycleStatus, MetricsUpdate, ShipperFilter, ShipperId, ShipperRecord,
    StatusCounts, StatusUpdate, VentureId,
};
use crate::errors::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered transaction reads keyed by shipper.
///
/// Implementations must be thread-safe (`Send + Sync`); bulk recompute reads
/// many shippers in parallel.
pub trait EventSource: Send + Sync {
    /// All events for a shipper in ascending time order.
    ///
    /// A shipper with no events yields an empty log, not an error.
    ///
    /// # Errors
    ///
    /// Returns `ChurnError::Storage` when the underlying read fails.
    fn events_for(&self, shipper_id: ShipperId) -> Result<EventLog>;
}

/// Shipper record reads and partial writes.
pub trait ShipperStore: Send + Sync {
    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns `ChurnError::ShipperNotFound` for an unknown id.
    fn get(&self, id: ShipperId) -> Result<ShipperRecord>;

    /// Records matching a filter, ordered by id.
    fn list(&self, filter: &ShipperFilter) -> Result<Vec<ShipperRecord>>;

    /// Overwrite the derived metric fields.
    fn update_metrics(&self, id: ShipperId, update: &MetricsUpdate) -> Result<()>;

    /// Conditionally write lifecycle fields.
    ///
    /// The write only happens while the stored status still equals
    /// `expected_previous`; returns whether it happened. This is the
    /// single-row read-compare-write that prevents lost updates.
    fn apply_status(
        &self,
        id: ShipperId,
        expected_previous: LifecycleStatus,
        update: &StatusUpdate,
    ) -> Result<bool>;
}

/// Daily KPI snapshot persistence.
pub trait KpiStore: Send + Sync {
    /// Insert or replace the snapshot for `(venture_id, date)`.
    fn upsert_daily_kpis(&self, kpis: &DailyChurnKpis) -> Result<()>;

    /// All stored snapshots for a venture, oldest first.
    fn daily_kpis(&self, venture_id: VentureId) -> Result<Vec<DailyChurnKpis>>;
}

/// One day's portfolio status counts for a venture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChurnKpis {
    pub venture_id: VentureId,
    pub date: NaiveDate,
    pub counts: StatusCounts,
    pub retention_rate: f64,
    pub avg_risk_score: f64,
    pub high_risk_count: usize,
}

impl DailyChurnKpis {
    pub fn key(&self) -> (VentureId, NaiveDate) {
        (self.venture_id, self.date)
    }
}

/// Anything that can serve the full engine
pub trait ChurnStore: EventSource + ShipperStore + KpiStore {}

impl<T: EventSource + ShipperStore + KpiStore> ChurnStore for T {}
