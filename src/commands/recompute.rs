use super::{save_store, CommandContext};
use crate::core::VentureId;
use crate::portfolio::{RecomputeOptions, RecomputeReport};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RecomputeConfig {
    pub data: PathBuf,
    pub venture: Option<VentureId>,
    pub include_test: bool,
    pub dry_run: bool,
    /// Overrides `batch.max_concurrency`; 0 means all cores
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub fail_fast: bool,
}

impl RecomputeConfig {
    fn options(&self) -> RecomputeOptions {
        let options = RecomputeOptions::default()
            .with_test_data(self.include_test)
            .dry_run(self.dry_run);
        match self.timeout_secs {
            Some(secs) => options.with_deadline(Instant::now() + Duration::from_secs(secs)),
            None => options,
        }
    }
}

/// Run the bulk recompute and write the dataset back unless this is a dry run.
///
/// The report is printed before any failure is turned into an error, so a
/// partially failed run still shows what happened.
pub fn run_recompute(ctx: &CommandContext, config: RecomputeConfig) -> Result<RecomputeReport> {
    let mut ctx = ctx.clone();
    if let Some(jobs) = config.jobs {
        ctx.config.batch.max_concurrency = (jobs > 0).then_some(jobs);
    }
    ctx.config.batch.fail_fast |= config.fail_fast;

    let engine = ctx.open_engine(&config.data)?;
    let report = engine
        .recompute_all_shippers(config.venture, &config.options(), ctx.now)
        .context("Recompute failed")?;

    if !config.dry_run {
        save_store(engine.store(), &config.data)?;
    }
    ctx.print(&report)?;

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} shippers failed to recompute",
            report.failures.len(),
            report.processed + report.failures.len()
        );
    }
    Ok(report)
}
