//! Shared fixtures for churnmap integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use churnmap::core::{EventLog, MetricsUpdate, ShipperFilter, StatusUpdate};
use churnmap::errors::{ChurnError, Result};
use churnmap::io::traits::{DailyChurnKpis, EventSource, KpiStore, ShipperStore};
use churnmap::{LifecycleStatus, MemoryStore, ShipperId, ShipperRecord, VentureId};
use std::collections::HashSet;

/// Fixed reference time for every scenario
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn shipper(id: u64, venture_id: VentureId, created_days_ago: i64) -> ShipperRecord {
    ShipperRecord::new(id, format!("Shipper {}", id), venture_id, days_ago(created_days_ago))
}

/// `count` events `every` days apart, the most recent `last_days_ago` days back
pub fn regular_history(last_days_ago: i64, every: i64, count: i64) -> Vec<i64> {
    (0..count).rev().map(|i| last_days_ago + i * every).collect()
}

pub fn seed(store: &MemoryStore, record: ShipperRecord, history_days_ago: &[i64]) {
    let id = record.id;
    store.insert_shipper(record);
    store
        .add_events(id, history_days_ago.iter().map(|d| days_ago(*d)))
        .expect("seeded shipper exists");
}

pub fn seed_with_status(
    store: &MemoryStore,
    mut record: ShipperRecord,
    status: LifecycleStatus,
    history_days_ago: &[i64],
) {
    record.status = status;
    seed(store, record, history_days_ago);
}

/// Store double whose event reads fail for chosen shippers
pub struct FailingStore {
    pub inner: MemoryStore,
    failing: HashSet<ShipperId>,
    retryable: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, failing: impl IntoIterator<Item = u64>, retryable: bool) -> Self {
        Self {
            inner,
            failing: failing.into_iter().map(ShipperId).collect(),
            retryable,
        }
    }
}

impl EventSource for FailingStore {
    fn events_for(&self, shipper_id: ShipperId) -> Result<EventLog> {
        if self.failing.contains(&shipper_id) {
            return Err(ChurnError::storage(
                format!("event read for {} timed out", shipper_id),
                self.retryable,
            ));
        }
        self.inner.events_for(shipper_id)
    }
}

impl ShipperStore for FailingStore {
    fn get(&self, id: ShipperId) -> Result<ShipperRecord> {
        self.inner.get(id)
    }

    fn list(&self, filter: &ShipperFilter) -> Result<Vec<ShipperRecord>> {
        self.inner.list(filter)
    }

    fn update_metrics(&self, id: ShipperId, update: &MetricsUpdate) -> Result<()> {
        self.inner.update_metrics(id, update)
    }

    fn apply_status(
        &self,
        id: ShipperId,
        expected_previous: LifecycleStatus,
        update: &StatusUpdate,
    ) -> Result<bool> {
        self.inner.apply_status(id, expected_previous, update)
    }
}

impl KpiStore for FailingStore {
    fn upsert_daily_kpis(&self, kpis: &DailyChurnKpis) -> Result<()> {
        self.inner.upsert_daily_kpis(kpis)
    }

    fn daily_kpis(&self, venture_id: VentureId) -> Result<Vec<DailyChurnKpis>> {
        self.inner.daily_kpis(venture_id)
    }
}
