use super::{save_store, CommandContext};
use crate::core::VentureId;
use crate::portfolio::BackfillReport;
use anyhow::{Context, Result};
use std::path::Path;

/// Refresh stored metrics for every shipper in scope; status is left alone.
///
/// Successful writes are saved and the report printed before any failure is
/// turned into an error.
pub fn run_backfill(
    ctx: &CommandContext,
    data: &Path,
    venture: Option<VentureId>,
) -> Result<BackfillReport> {
    let engine = ctx.open_engine(data)?;
    let report = engine
        .backfill_metrics(venture, ctx.now)
        .context("Metrics backfill failed")?;
    save_store(engine.store(), data)?;
    ctx.print(&report)?;

    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} shippers failed to backfill",
            report.failures.len(),
            report.attempted()
        );
    }
    Ok(report)
}
