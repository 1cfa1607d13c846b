//! Options and results for bulk recompute runs.

use crate::core::{LifecycleStatus, ShipperId, StatusCounts};
use crate::errors::ChurnError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared flag for stopping a bulk run between shippers
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Knobs for [`crate::portfolio::ChurnEngine::recompute_all_shippers`]
#[derive(Clone, Debug, Default)]
pub struct RecomputeOptions {
    /// Include shippers flagged as test data
    pub include_test: bool,
    /// Compute and report without writing anything
    pub dry_run: bool,
    /// Wall-clock limit; shippers not started by then are skipped
    pub deadline: Option<Instant>,
    pub cancel: CancellationToken,
}

impl RecomputeOptions {
    pub fn with_test_data(mut self, include_test: bool) -> Self {
        self.include_test = include_test;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn should_stop(&self, at: Instant) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| at >= d)
    }
}

/// What happened to one shipper during a recompute
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipperOutcome {
    pub shipper_id: ShipperId,
    pub previous_status: LifecycleStatus,
    pub status: LifecycleStatus,
    /// Status was written (or would have been, on a dry run)
    pub status_changed: bool,
    pub metrics_updated: bool,
    pub risk_score: Option<f64>,
}

/// A shipper whose recompute failed; the rest of the batch continued
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperFailure {
    pub shipper_id: ShipperId,
    pub error: String,
    pub retryable: bool,
}

impl ShipperFailure {
    pub fn new(shipper_id: ShipperId, error: &ChurnError) -> Self {
        Self {
            shipper_id,
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
    /// Shippers fully processed
    pub processed: usize,
    /// Shippers whose status changed
    pub updated_count: usize,
    /// Shippers whose metrics were recomputed
    pub metrics_updated_count: usize,
    /// Final status of every processed shipper
    pub counts_by_status: StatusCounts,
    pub failures: Vec<ShipperFailure>,
    /// Shippers never started because the run was cancelled or timed out
    pub skipped: usize,
    pub cancelled: bool,
    pub dry_run: bool,
}

impl RecomputeReport {
    pub fn record(&mut self, outcome: &ShipperOutcome) {
        self.processed += 1;
        if outcome.status_changed {
            self.updated_count += 1;
        }
        if outcome.metrics_updated {
            self.metrics_updated_count += 1;
        }
        self.counts_by_status.record(outcome.status);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Result of a metrics backfill; status is never touched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Shippers whose metrics were written
    pub updated: usize,
    pub failures: Vec<ShipperFailure>,
}

impl BackfillReport {
    pub fn attempted(&self) -> usize {
        self.updated + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
