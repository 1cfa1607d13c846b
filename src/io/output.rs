use crate::core::LifecycleStatus;
use crate::errors::Result;
use crate::portfolio::{
    BackfillReport, OutreachList, PortfolioSummary, RecomputeReport, ShipperChurnInfo,
    ShipperFailure,
};
use crate::risk::RiskLevel;
use chrono::{DateTime, Utc};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

/// Something the CLI can print in either format
pub trait Render: Serialize {
    fn render_terminal(&self, w: &mut dyn Write) -> Result<()>;
}

/// Write `value` in the requested format
pub fn emit<T: Render>(value: &T, format: OutputFormat, w: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            writeln!(w, "{}", json)?;
        }
        OutputFormat::Terminal => value.render_terminal(w)?,
    }
    Ok(())
}

pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn status_cell(status: LifecycleStatus) -> Cell {
    let color = match status {
        LifecycleStatus::New => Color::Blue,
        LifecycleStatus::Active => Color::Green,
        LifecycleStatus::AtRisk => Color::Yellow,
        LifecycleStatus::Churned => Color::Red,
        LifecycleStatus::Reactivated => Color::Cyan,
    };
    Cell::new(status.as_str()).fg(color)
}

pub fn risk_cell(score: Option<f64>) -> Cell {
    let level = RiskLevel::from_score(score);
    let text = match score {
        Some(s) => format!("{:.0} ({})", s, level),
        None => format!("- ({})", level),
    };
    let color = match level {
        RiskLevel::Critical => Color::Red,
        RiskLevel::High => Color::DarkYellow,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::Low => Color::Green,
    };
    Cell::new(text).fg(color)
}

pub fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn status_counts_table(counts: &crate::core::StatusCounts) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Status", "Shippers"]);
    for status in LifecycleStatus::ALL {
        table.add_row(vec![status_cell(status), Cell::new(counts.get(status))]);
    }
    table
}

impl Render for RecomputeReport {
    fn render_terminal(&self, w: &mut dyn Write) -> Result<()> {
        let title = if self.dry_run {
            "Churn recompute (dry run)"
        } else {
            "Churn recompute"
        };
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "  Processed:        {}", self.processed)?;
        writeln!(w, "  Status changes:   {}", self.updated_count)?;
        writeln!(w, "  Metrics updated:  {}", self.metrics_updated_count)?;
        if self.skipped > 0 {
            writeln!(
                w,
                "  {}",
                format!("Cancelled: {} shippers not processed", self.skipped).yellow()
            )?;
        }
        writeln!(w, "{}", status_counts_table(&self.counts_by_status))?;

        write_failures(w, &self.failures)
    }
}

fn write_failures(w: &mut dyn Write, failures: &[ShipperFailure]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(w, "{}", format!("{} failures", failures.len()).red().bold())?;
    let mut table = new_table();
    table.set_header(vec!["Shipper", "Error", "Retryable"]);
    for failure in failures {
        table.add_row(vec![
            Cell::new(failure.shipper_id),
            Cell::new(&failure.error),
            Cell::new(if failure.retryable { "yes" } else { "no" }),
        ]);
    }
    writeln!(w, "{}", table)?;
    Ok(())
}

impl Render for BackfillReport {
    fn render_terminal(&self, w: &mut dyn Write) -> Result<()> {
        writeln!(w, "{}", "Metrics backfill".bold())?;
        writeln!(w, "  Updated:   {} of {}", self.updated, self.attempted())?;
        write_failures(w, &self.failures)
    }
}

impl Render for PortfolioSummary {
    fn render_terminal(&self, w: &mut dyn Write) -> Result<()> {
        let scope = self
            .venture_id
            .map(|v| format!("venture {}", v))
            .unwrap_or_else(|| "all ventures".to_string());
        writeln!(
            w,
            "{} ({}, as of {})",
            "Portfolio churn summary".bold(),
            scope,
            self.as_of.format("%Y-%m-%d %H:%M UTC")
        )?;

        let retention = format!("{:.1}%", self.retention_rate);
        let retention = if self.retention_rate >= 80.0 {
            retention.green()
        } else if self.retention_rate >= 60.0 {
            retention.yellow()
        } else {
            retention.red()
        };
        writeln!(w, "  Shippers:        {}", self.total_shippers)?;
        writeln!(w, "  Retention rate:  {}", retention)?;
        writeln!(w, "  Avg risk score:  {:.0}", self.avg_risk_score)?;
        writeln!(w, "  High risk:       {}", self.high_risk_count)?;
        writeln!(w, "{}", status_counts_table(&self.counts))?;
        Ok(())
    }
}

/// An outreach list together with its rows, for printing
#[derive(Debug, Clone, Serialize)]
pub struct OutreachView {
    pub list: OutreachList,
    pub shippers: Vec<ShipperChurnInfo>,
}

impl Render for OutreachView {
    fn render_terminal(&self, w: &mut dyn Write) -> Result<()> {
        writeln!(w, "{} ({})", self.list.label().bold(), self.shippers.len())?;
        if self.shippers.is_empty() {
            writeln!(w, "  none")?;
            return Ok(());
        }

        let mut table = new_table();
        table.set_header(vec![
            "ID",
            "Name",
            "Status",
            "Last event",
            "Days silent",
            "Overdue",
            "Events",
            "Cadence",
            "Risk",
        ]);
        for row in &self.shippers {
            table.add_row(vec![
                Cell::new(row.id),
                Cell::new(&row.name),
                status_cell(row.status),
                Cell::new(format_date(row.last_event_at)),
                Cell::new(format_opt(row.days_since_last_event)),
                Cell::new(format_opt(row.days_overdue)),
                Cell::new(row.event_count),
                Cell::new(format_opt(row.cadence_days.map(|c| format!("{:.1}d", c)))),
                risk_cell(row.risk_score),
            ]);
        }
        writeln!(w, "{}", table)?;
        Ok(())
    }
}
