use super::{save_store, CommandContext};
use crate::core::VentureId;
use crate::portfolio::PortfolioSummary;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Print the portfolio summary, optionally storing today's KPI snapshot.
pub fn run_summary(
    ctx: &CommandContext,
    data: &Path,
    venture: Option<VentureId>,
    include_test: bool,
    record_kpis: bool,
) -> Result<PortfolioSummary> {
    let engine = ctx.open_engine(data)?;
    let summary = engine
        .portfolio_summary(venture, include_test, ctx.now)
        .context("Failed to build portfolio summary")?;

    if let (true, Some(venture_id)) = (record_kpis, venture) {
        let kpis = engine
            .record_daily_kpis(venture_id, ctx.now)
            .context("Failed to record daily KPIs")?;
        save_store(engine.store(), data)?;
        info!(venture = venture_id, date = %kpis.date, "Stored daily churn KPIs");
    }

    ctx.print(&summary)?;
    Ok(summary)
}
