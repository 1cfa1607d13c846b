//! Per-shipper recompute and portfolio-wide batch operations.
//!
//! [`ChurnEngine`] wires the pure scoring core to a store. Every method takes
//! the reference time `now` explicitly.
//!
//! # Concurrency
//!
//! Bulk runs fan out over a rayon pool sized by `batch.max_concurrency`.
//! Each shipper's read-compute-write runs under a per-shipper mutex from a
//! lock table, so two recomputes of the same shipper never interleave, and
//! the status write itself is a conditional [`ShipperStore::apply_status`].
//! Cancellation and the deadline are checked before each shipper starts.

pub mod outreach;
pub mod report;
pub mod summary;

pub use outreach::{select_for_list, ListQuery, OutreachList, ShipperChurnInfo};
pub use report::{
    BackfillReport, CancellationToken, RecomputeOptions, RecomputeReport, ShipperFailure,
    ShipperOutcome,
};
pub use summary::PortfolioSummary;

use crate::cadence::{compute_cadence_metrics, CadenceMetrics};
use crate::config::ChurnmapConfig;
use crate::core::{ShipperFilter, ShipperId, ShipperRecord, VentureId};
use crate::errors::{ChurnError, Result};
use crate::io::traits::{ChurnStore, DailyChurnKpis};
use crate::lifecycle::decide_from_metrics;
use crate::progress::{ProgressSink, SilentProgressSink};
use crate::risk::{compute_shipper_metrics, ShipperMetrics};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, info, info_span, warn};

const STAGE_RECOMPUTE: &str = "Recomputing churn status";
const STAGE_BACKFILL: &str = "Backfilling churn metrics";

/// When a shipper's metrics are recomputed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetricsMode {
    /// Always recompute
    Force,
    /// Recompute only when absent or older than the staleness window
    IfStale,
}

pub struct ChurnEngine<S> {
    store: Arc<S>,
    config: ChurnmapConfig,
    progress: Arc<dyn ProgressSink>,
    locks: DashMap<ShipperId, Arc<Mutex<()>>>,
}

impl<S: ChurnStore> ChurnEngine<S> {
    pub fn new(store: Arc<S>, config: ChurnmapConfig) -> Self {
        Self {
            store,
            config,
            progress: Arc::new(SilentProgressSink),
            locks: DashMap::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ChurnmapConfig {
        &self.config
    }

    /// Cadence metrics straight from the event log; nothing is persisted
    pub fn compute_cadence_metrics(
        &self,
        shipper_id: ShipperId,
        now: DateTime<Utc>,
    ) -> Result<CadenceMetrics> {
        let events = self.store.events_for(shipper_id)?;
        Ok(compute_cadence_metrics(&events, now, &self.config))
    }

    /// Cadence and risk score for a stored shipper; nothing is persisted
    pub fn compute_shipper_metrics(
        &self,
        shipper_id: ShipperId,
        now: DateTime<Utc>,
    ) -> Result<ShipperMetrics> {
        let record = self.store.get(shipper_id)?;
        let events = self.store.events_for(shipper_id)?;
        Ok(compute_shipper_metrics(
            &events,
            Some(record.created_at),
            now,
            &self.config,
        ))
    }

    /// Recompute and persist one shipper's metrics and status.
    pub fn recompute_shipper(&self, shipper_id: ShipperId, now: DateTime<Utc>) -> Result<ShipperOutcome> {
        self.process_shipper(shipper_id, MetricsMode::Force, false, now)
    }

    /// Recompute every active shipper in scope.
    ///
    /// Per-shipper failures are collected in the report rather than
    /// returned; only failing to list the scope is an error.
    pub fn recompute_all_shippers(
        &self,
        venture_id: Option<VentureId>,
        options: &RecomputeOptions,
        now: DateTime<Utc>,
    ) -> Result<RecomputeReport> {
        let filter = ShipperFilter::portfolio(venture_id).with_test_data(options.include_test);
        let shippers = self.store.list(&filter)?;
        let total = shippers.len();

        let _span = info_span!(
            "recompute_all",
            venture = ?venture_id,
            shippers = total,
            dry_run = options.dry_run,
        )
        .entered();
        info!(shippers = total, "Starting churn recompute");

        let fail_fast = self.config.batch.fail_fast;
        let aborted = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);

        self.progress.start_stage(STAGE_RECOMPUTE);
        let slots: Vec<Slot> = self.run_parallel(|| {
            shippers
                .par_iter()
                .map(|record| {
                    if aborted.load(Ordering::SeqCst) || options.should_stop(Instant::now()) {
                        return Slot::Skipped;
                    }
                    let slot = match self.process_shipper(
                        record.id,
                        MetricsMode::IfStale,
                        options.dry_run,
                        now,
                    ) {
                        Ok(outcome) => Slot::Done(outcome),
                        Err(e) => {
                            warn!(shipper = %record.id, category = e.category(), error = %e, "Shipper recompute failed");
                            self.progress
                                .warn(&format!("shipper {}: {}", record.id, e));
                            if fail_fast {
                                aborted.store(true, Ordering::SeqCst);
                            }
                            Slot::Failed(ShipperFailure::new(record.id, &e))
                        }
                    };
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.report(STAGE_RECOMPUTE, done, total);
                    slot
                })
                .collect()
        })?;
        self.progress.complete_stage(STAGE_RECOMPUTE);

        let mut report = RecomputeReport {
            dry_run: options.dry_run,
            ..Default::default()
        };
        for slot in slots {
            match slot {
                Slot::Done(outcome) => report.record(&outcome),
                Slot::Failed(failure) => report.failures.push(failure),
                Slot::Skipped => report.skipped += 1,
            }
        }
        report.cancelled = report.skipped > 0;

        info!(
            processed = report.processed,
            updated = report.updated_count,
            metrics_updated = report.metrics_updated_count,
            failures = report.failures.len(),
            skipped = report.skipped,
            "Churn recompute finished"
        );
        Ok(report)
    }

    /// Recompute and persist metrics for every shipper in scope, including
    /// inactive and test shippers. Status is left untouched.
    ///
    /// Per-shipper failures are collected in the report; only failing to
    /// list the scope is an error.
    pub fn backfill_metrics(
        &self,
        venture_id: Option<VentureId>,
        now: DateTime<Utc>,
    ) -> Result<BackfillReport> {
        let shippers = self.store.list(&ShipperFilter::everything(venture_id))?;
        let total = shippers.len();
        let _span = info_span!("backfill_metrics", venture = ?venture_id, shippers = total).entered();

        let completed = AtomicUsize::new(0);
        self.progress.start_stage(STAGE_BACKFILL);
        let results: Vec<std::result::Result<(), ShipperFailure>> = self.run_parallel(|| {
            shippers
                .par_iter()
                .map(|record| {
                    let result = self.with_shipper_lock(record.id, || {
                        let events = self.store.events_for(record.id)?;
                        let metrics =
                            compute_shipper_metrics(&events, Some(record.created_at), now, &self.config);
                        self.store.update_metrics(record.id, &metrics.to_update(now))
                    });
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.report(STAGE_BACKFILL, done, total);
                    result.map_err(|e| {
                        warn!(shipper = %record.id, category = e.category(), error = %e, "Metrics backfill failed");
                        self.progress.warn(&format!("shipper {}: {}", record.id, e));
                        ShipperFailure::new(record.id, &e)
                    })
                })
                .collect()
        })?;
        self.progress.complete_stage(STAGE_BACKFILL);

        let mut report = BackfillReport::default();
        for result in results {
            match result {
                Ok(()) => report.updated += 1,
                Err(failure) => report.failures.push(failure),
            }
        }
        info!(
            updated = report.updated,
            failures = report.failures.len(),
            "Metrics backfill finished"
        );
        Ok(report)
    }

    /// Aggregate the stored state of active shippers in scope
    pub fn portfolio_summary(
        &self,
        venture_id: Option<VentureId>,
        include_test: bool,
        now: DateTime<Utc>,
    ) -> Result<PortfolioSummary> {
        let filter = ShipperFilter::portfolio(venture_id).with_test_data(include_test);
        let records = self.store.list(&filter)?;
        Ok(PortfolioSummary::from_records(
            &records,
            venture_id,
            now,
            &self.config,
        ))
    }

    /// Snapshot the venture's summary counts for the UTC date of `now`
    pub fn record_daily_kpis(&self, venture_id: VentureId, now: DateTime<Utc>) -> Result<DailyChurnKpis> {
        let kpis = self
            .portfolio_summary(Some(venture_id), false, now)?
            .to_daily_kpis(venture_id);
        self.store.upsert_daily_kpis(&kpis)?;
        debug!(venture = venture_id, date = %kpis.date, "Recorded daily churn KPIs");
        Ok(kpis)
    }

    pub fn outreach_list(
        &self,
        list: OutreachList,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShipperChurnInfo>> {
        let filter = ShipperFilter::portfolio(Some(query.venture_id)).with_test_data(query.include_test);
        let candidates = self.store.list(&filter)?;
        select_for_list(candidates, list, query)
            .iter()
            .map(|record| {
                let event_count = self.store.events_for(record.id)?.len();
                Ok(ShipperChurnInfo::from_record(record, event_count, now))
            })
            .collect()
    }

    pub fn at_risk_shippers(&self, query: &ListQuery, now: DateTime<Utc>) -> Result<Vec<ShipperChurnInfo>> {
        self.outreach_list(OutreachList::AtRisk, query, now)
    }

    pub fn churned_shippers(&self, query: &ListQuery, now: DateTime<Utc>) -> Result<Vec<ShipperChurnInfo>> {
        self.outreach_list(OutreachList::Churned, query, now)
    }

    pub fn high_risk_shippers(&self, query: &ListQuery, now: DateTime<Utc>) -> Result<Vec<ShipperChurnInfo>> {
        self.outreach_list(OutreachList::HighRisk, query, now)
    }

    fn run_parallel<T: Send>(&self, op: impl FnOnce() -> T + Send) -> Result<T> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.batch.effective_concurrency())
            .thread_name(|i| format!("churnmap-worker-{}", i))
            .build()
            .map_err(|e| ChurnError::configuration(format!("failed to build worker pool: {}", e)))?;
        Ok(pool.install(op))
    }

    /// Run `op` holding the shipper's mutex. The table entry is dropped
    /// again once no other caller holds or awaits it.
    fn with_shipper_lock<T>(&self, shipper_id: ShipperId, op: impl FnOnce() -> T) -> T {
        let lock = self
            .locks
            .entry(shipper_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock();
            op()
        };
        // Table plus this clone; any waiter holds a third reference
        self.locks.remove_if(&shipper_id, |_, held| {
            Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
        });
        result
    }

    fn process_shipper(
        &self,
        shipper_id: ShipperId,
        mode: MetricsMode,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<ShipperOutcome> {
        let _span = debug_span!("recompute_shipper", shipper = %shipper_id).entered();

        self.with_shipper_lock(shipper_id, || {
            // Re-read under the lock; the listed copy may be stale
            let record = self.store.get(shipper_id)?;

            let fresh = match mode {
                MetricsMode::Force => None,
                MetricsMode::IfStale => {
                    (!self.metrics_stale(&record, now)).then(|| persisted_cadence(&record))
                }
            };
            let metrics_updated = fresh.is_none();
            let (cadence, risk_score) = match fresh {
                Some(cadence) => (cadence, record.risk_score),
                None => {
                    let events = self.store.events_for(shipper_id)?;
                    let metrics =
                        compute_shipper_metrics(&events, Some(record.created_at), now, &self.config);
                    if !dry_run {
                        self.store.update_metrics(shipper_id, &metrics.to_update(now))?;
                    }
                    (metrics.cadence, Some(metrics.risk_score))
                }
            };

            let (_, decision) =
                decide_from_metrics(&cadence, record.created_at, record.status, now, &self.config);

            let mut status = decision.status;
            let mut status_changed = false;
            if let Some(update) = decision.to_update() {
                if dry_run {
                    status_changed = true;
                } else if self.store.apply_status(shipper_id, record.status, &update)? {
                    status_changed = true;
                    debug!(from = %record.status, to = %decision.status, "Status transition");
                } else {
                    // Someone outside this engine changed the row first
                    status = self.store.get(shipper_id)?.status;
                    debug!(expected = %record.status, found = %status, "Status write skipped");
                }
            }

            Ok(ShipperOutcome {
                shipper_id,
                previous_status: record.status,
                status,
                status_changed,
                metrics_updated,
                risk_score,
            })
        })
    }

    fn metrics_stale(&self, record: &ShipperRecord, now: DateTime<Utc>) -> bool {
        record
            .metrics_calculated_at
            .is_none_or(|at| now - at > self.config.batch.stale_after())
    }
}

/// Cadence fields as last persisted, enough to re-derive status
fn persisted_cadence(record: &ShipperRecord) -> CadenceMetrics {
    CadenceMetrics {
        first_event_at: record.first_event_at,
        last_event_at: record.last_event_at,
        total_events_historic: record.total_events_historic,
        avg_events_per_month: record.avg_events_per_month,
        cadence_days: record.cadence_days,
        expected_next_event_at: record.expected_next_event_at,
        recent_event_count: 0,
        expected_recent_events: 0.0,
    }
}

enum Slot {
    Done(ShipperOutcome),
    Failed(ShipperFailure),
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LifecycleStatus;
    use crate::io::traits::ShipperStore;
    use crate::io::MemoryStore;
    use crate::progress::RecordingProgressSink;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
    }

    fn engine_with(records: Vec<(ShipperRecord, Vec<i64>)>) -> ChurnEngine<MemoryStore> {
        let store = MemoryStore::new();
        for (record, days_ago) in records {
            let id = record.id;
            store.insert_shipper(record);
            store
                .add_events(id, days_ago.into_iter().map(|d| now() - Duration::days(d)))
                .unwrap();
        }
        ChurnEngine::new(Arc::new(store), ChurnmapConfig::default())
    }

    fn shipper(id: u64, created_days_ago: i64) -> ShipperRecord {
        ShipperRecord::new(id, format!("Shipper {}", id), 1, now() - Duration::days(created_days_ago))
    }

    #[test]
    fn test_recompute_shipper_persists_metrics_and_status() {
        let engine = engine_with(vec![(shipper(1, 200), vec![60, 50, 45])]);
        let outcome = engine.recompute_shipper(ShipperId(1), now()).unwrap();

        assert_eq!(outcome.status, LifecycleStatus::Churned);
        assert!(outcome.status_changed);
        assert!(outcome.metrics_updated);

        let record = engine.store().get(ShipperId(1)).unwrap();
        assert_eq!(record.status, LifecycleStatus::Churned);
        assert_eq!(record.churned_at, Some(now()));
        assert_eq!(record.total_events_historic, 3);
        assert_eq!(record.metrics_calculated_at, Some(now()));
    }

    #[test]
    fn test_fresh_metrics_reused_in_bulk_run() {
        let engine = engine_with(vec![(shipper(1, 200), vec![30, 20, 10])]);
        engine.recompute_shipper(ShipperId(1), now()).unwrap();

        let later = now() + Duration::hours(2);
        let report = engine
            .recompute_all_shippers(None, &RecomputeOptions::default(), later)
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.metrics_updated_count, 0);

        let much_later = now() + Duration::hours(25);
        let report = engine
            .recompute_all_shippers(None, &RecomputeOptions::default(), much_later)
            .unwrap();
        assert_eq!(report.metrics_updated_count, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let engine = engine_with(vec![(shipper(1, 200), vec![100]), (shipper(2, 5), vec![])]);
        let report = engine
            .recompute_all_shippers(None, &RecomputeOptions::default().dry_run(true), now())
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.counts_by_status.churned, 1);
        assert_eq!(report.counts_by_status.new, 1);
        assert_eq!(engine.store().write_count(), 0);
    }

    #[test]
    fn test_pre_cancelled_run_skips_everything() {
        let engine = engine_with(vec![(shipper(1, 200), vec![3]), (shipper(2, 200), vec![4])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = engine
            .recompute_all_shippers(None, &RecomputeOptions::default().with_cancel(cancel), now())
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 2);
        assert!(report.cancelled);
        assert_eq!(engine.store().write_count(), 0);
    }

    #[test]
    fn test_progress_reported_per_shipper() {
        let recorder = RecordingProgressSink::new();
        let engine = engine_with(vec![(shipper(1, 200), vec![3]), (shipper(2, 200), vec![4])])
            .with_progress(Arc::new(recorder.clone()));

        engine
            .recompute_all_shippers(None, &RecomputeOptions::default(), now())
            .unwrap();
        assert_eq!(recorder.max_reported(STAGE_RECOMPUTE), Some(2));
    }

    #[test]
    fn test_backfill_ignores_status_and_filters() {
        let mut inactive = shipper(2, 100);
        inactive.is_active = false;
        let mut test_data = shipper(3, 100);
        test_data.is_test = true;
        let engine = engine_with(vec![
            (shipper(1, 100), vec![80]),
            (inactive, vec![10]),
            (test_data, vec![]),
        ]);

        let report = engine.backfill_metrics(Some(1), now()).unwrap();
        assert_eq!(report.updated, 3);
        assert!(report.is_clean());
        for id in 1..=3 {
            let record = engine.store().get(ShipperId(id)).unwrap();
            assert_eq!(record.status, LifecycleStatus::New);
            assert!(record.risk_score.is_some());
        }
    }

    #[test]
    fn test_lock_table_drained_after_runs() {
        let engine = engine_with(vec![(shipper(1, 200), vec![3]), (shipper(2, 200), vec![4])]);
        engine.recompute_shipper(ShipperId(1), now()).unwrap();
        engine
            .recompute_all_shippers(None, &RecomputeOptions::default(), now())
            .unwrap();
        engine.backfill_metrics(None, now()).unwrap();
        assert!(engine.locks.is_empty());
    }

    #[test]
    fn test_unknown_shipper_is_not_found() {
        let engine = engine_with(vec![]);
        assert!(matches!(
            engine.recompute_shipper(ShipperId(7), now()),
            Err(ChurnError::ShipperNotFound(ShipperId(7)))
        ));
    }
}
