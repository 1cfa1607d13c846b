//! In-memory implementation of the storage traits.
//!
//! Backs the CLI (loaded from and saved to a JSON dataset) and the test
//! suite. All maps sit behind `parking_lot::RwLock` so the store can be
//! shared across the recompute thread pool.

use crate::core::{
    EventLog, LifecycleStatus, MetricsUpdate, ShipperFilter, ShipperId, ShipperRecord,
    StatusUpdate, TransactionEvent, VentureId,
};
use crate::errors::{ChurnError, Result};
use crate::io::traits::{DailyChurnKpis, EventSource, KpiStore, ShipperStore};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStore {
    shippers: RwLock<BTreeMap<ShipperId, ShipperRecord>>,
    events: RwLock<HashMap<ShipperId, Vec<DateTime<Utc>>>>,
    kpis: RwLock<BTreeMap<(VentureId, NaiveDate), DailyChurnKpis>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a shipper record
    pub fn insert_shipper(&self, record: ShipperRecord) {
        self.shippers.write().insert(record.id, record);
    }

    /// Record an event, keeping the shipper's timeline sorted.
    ///
    /// # Errors
    ///
    /// Returns `ChurnError::ShipperNotFound` if the shipper is unknown.
    pub fn add_event(&self, shipper_id: ShipperId, occurred_at: DateTime<Utc>) -> Result<()> {
        if !self.shippers.read().contains_key(&shipper_id) {
            return Err(ChurnError::ShipperNotFound(shipper_id));
        }
        let mut events = self.events.write();
        let timeline = events.entry(shipper_id).or_default();
        let pos = timeline.partition_point(|ts| *ts <= occurred_at);
        timeline.insert(pos, occurred_at);
        Ok(())
    }

    pub fn add_events(
        &self,
        shipper_id: ShipperId,
        timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Result<()> {
        timestamps
            .into_iter()
            .try_for_each(|ts| self.add_event(shipper_id, ts))
    }

    /// Number of metric and status writes performed so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn shippers(&self) -> Vec<ShipperRecord> {
        self.shippers.read().values().cloned().collect()
    }

    /// Every event as a flat list, ordered by shipper then time
    pub fn all_events(&self) -> Vec<TransactionEvent> {
        let events = self.events.read();
        let mut ids: Vec<&ShipperId> = events.keys().collect();
        ids.sort();
        ids.into_iter()
            .flat_map(|id| {
                events[id].iter().map(move |ts| TransactionEvent {
                    shipper_id: *id,
                    occurred_at: *ts,
                })
            })
            .collect()
    }

    pub fn all_kpis(&self) -> Vec<DailyChurnKpis> {
        self.kpis.read().values().cloned().collect()
    }

    fn bump_writes(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl EventSource for MemoryStore {
    fn events_for(&self, shipper_id: ShipperId) -> Result<EventLog> {
        let events = self.events.read();
        // Timelines are kept sorted on insert
        EventLog::new(events.get(&shipper_id).cloned().unwrap_or_default())
    }
}

impl ShipperStore for MemoryStore {
    fn get(&self, id: ShipperId) -> Result<ShipperRecord> {
        self.shippers
            .read()
            .get(&id)
            .cloned()
            .ok_or(ChurnError::ShipperNotFound(id))
    }

    fn list(&self, filter: &ShipperFilter) -> Result<Vec<ShipperRecord>> {
        Ok(self
            .shippers
            .read()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn update_metrics(&self, id: ShipperId, update: &MetricsUpdate) -> Result<()> {
        let mut shippers = self.shippers.write();
        let record = shippers
            .get_mut(&id)
            .ok_or(ChurnError::ShipperNotFound(id))?;
        record.apply_metrics(update);
        self.bump_writes();
        Ok(())
    }

    fn apply_status(
        &self,
        id: ShipperId,
        expected_previous: LifecycleStatus,
        update: &StatusUpdate,
    ) -> Result<bool> {
        let mut shippers = self.shippers.write();
        let record = shippers
            .get_mut(&id)
            .ok_or(ChurnError::ShipperNotFound(id))?;
        if record.status != expected_previous {
            return Ok(false);
        }
        record.apply_status(update);
        self.bump_writes();
        Ok(true)
    }
}

impl KpiStore for MemoryStore {
    fn upsert_daily_kpis(&self, kpis: &DailyChurnKpis) -> Result<()> {
        self.kpis.write().insert(kpis.key(), kpis.clone());
        self.bump_writes();
        Ok(())
    }

    fn daily_kpis(&self, venture_id: VentureId) -> Result<Vec<DailyChurnKpis>> {
        Ok(self
            .kpis
            .read()
            .values()
            .filter(|k| k.venture_id == venture_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StatusCounts;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    fn store_with_shipper() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_shipper(ShipperRecord::new(1, "Acme", 3, day(1)));
        store
    }

    #[test]
    fn test_events_kept_sorted() {
        let store = store_with_shipper();
        store
            .add_events(ShipperId(1), [day(9), day(2), day(5)])
            .unwrap();
        let log = store.events_for(ShipperId(1)).unwrap();
        assert_eq!(log.as_slice(), &[day(2), day(5), day(9)]);
    }

    #[test]
    fn test_unknown_shipper() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.add_event(ShipperId(9), day(1)),
            Err(ChurnError::ShipperNotFound(ShipperId(9)))
        ));
        assert!(store.get(ShipperId(9)).is_err());
        assert!(store.events_for(ShipperId(9)).unwrap().is_empty());
    }

    #[test]
    fn test_apply_status_compares_previous() {
        let store = store_with_shipper();
        let update = StatusUpdate {
            status: LifecycleStatus::Churned,
            churned_at: Some(day(20)),
            reactivated_at: None,
        };

        assert!(!store
            .apply_status(ShipperId(1), LifecycleStatus::Active, &update)
            .unwrap());
        assert_eq!(store.write_count(), 0);

        assert!(store
            .apply_status(ShipperId(1), LifecycleStatus::New, &update)
            .unwrap());
        let record = store.get(ShipperId(1)).unwrap();
        assert_eq!(record.status, LifecycleStatus::Churned);
        assert_eq!(record.churned_at, Some(day(20)));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_kpi_upsert_replaces_same_day() {
        let store = MemoryStore::new();
        let mut kpis = DailyChurnKpis {
            venture_id: 3,
            date: day(4).date_naive(),
            counts: StatusCounts::default(),
            retention_rate: 100.0,
            avg_risk_score: 0.0,
            high_risk_count: 0,
        };
        store.upsert_daily_kpis(&kpis).unwrap();
        kpis.high_risk_count = 2;
        store.upsert_daily_kpis(&kpis).unwrap();

        let stored = store.daily_kpis(3).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].high_risk_count, 2);
        assert!(store.daily_kpis(4).unwrap().is_empty());
    }
}
