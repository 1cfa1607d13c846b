//! Ad-hoc scoring of an event history, with every intermediate shown.

use super::CommandContext;
use crate::cadence::{CadenceBand, CadenceMetrics};
use crate::config::ChurnmapConfig;
use crate::core::{EventLog, LifecycleStatus};
use crate::errors;
use crate::io::output::{format_date, format_opt, new_table, risk_cell, status_cell};
use crate::io::Render;
use crate::lifecycle::candidate_status;
use crate::risk::{compute_shipper_metrics, explain_churn_risk, RiskComponents, RiskLevel};
use crate::thresholds::{compute_thresholds, Thresholds};
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::*;
use comfy_table::Cell;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub as_of: DateTime<Utc>,
    /// Anchor used for the tenure component
    pub created_at: DateTime<Utc>,
    pub metrics: CadenceMetrics,
    pub cadence_band: CadenceBand,
    pub days_since_last_event: Option<i64>,
    pub days_overdue: Option<i64>,
    pub thresholds: Thresholds,
    /// Recency-only status, before any hysteresis
    pub candidate_status: LifecycleStatus,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Absent for an empty history
    pub components: Option<RiskComponents>,
}

impl ScoreReport {
    /// Score `events` as if they belonged to a shipper created at
    /// `created_at`, falling back to the first event, then to `now`.
    pub fn build(
        events: Vec<DateTime<Utc>>,
        created_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        config: &ChurnmapConfig,
    ) -> Self {
        let events = EventLog::from_unordered(events);
        let created_at = created_at.or(events.first()).unwrap_or(now);

        let metrics = compute_shipper_metrics(&events, Some(created_at), now, config);
        let components = if events.is_empty() {
            None
        } else {
            explain_churn_risk(&metrics.cadence, Some(created_at), now, config).components
        };

        let cadence = metrics.cadence;
        let thresholds = compute_thresholds(
            cadence.cadence_days,
            cadence.total_events_historic,
            &config.thresholds,
        );
        let candidate_status = candidate_status(
            cadence.last_event_at,
            created_at,
            &thresholds,
            now,
            &config.thresholds,
        );

        Self {
            as_of: now,
            created_at,
            cadence_band: CadenceBand::from_days(cadence.cadence_days),
            days_since_last_event: cadence.days_since_last_event(now),
            days_overdue: cadence.days_overdue(now),
            metrics: cadence,
            thresholds,
            candidate_status,
            risk_score: metrics.risk_score,
            risk_level: RiskLevel::from_score(Some(metrics.risk_score)),
            components,
        }
    }
}

impl Render for ScoreReport {
    fn render_terminal(&self, w: &mut dyn Write) -> errors::Result<()> {
        writeln!(
            w,
            "{} (as of {})",
            "Churn risk".bold(),
            self.as_of.format("%Y-%m-%d %H:%M UTC")
        )?;

        let mut table = new_table();
        table.set_header(vec!["Metric", "Value"]);
        let m = &self.metrics;
        let rows: Vec<(&str, Cell)> = vec![
            ("Events", Cell::new(m.total_events_historic)),
            ("First event", Cell::new(format_date(m.first_event_at))),
            ("Last event", Cell::new(format_date(m.last_event_at))),
            ("Days since last", Cell::new(format_opt(self.days_since_last_event))),
            (
                "Cadence",
                Cell::new(format!(
                    "{} ({})",
                    format_opt(m.cadence_days.map(|c| format!("{:.1}d", c))),
                    self.cadence_band
                )),
            ),
            (
                "Events / month",
                Cell::new(format_opt(m.avg_events_per_month.map(|r| format!("{:.2}", r)))),
            ),
            ("Expected next", Cell::new(format_date(m.expected_next_event_at))),
            ("Days overdue", Cell::new(format_opt(self.days_overdue))),
            (
                "Recent events",
                Cell::new(format!(
                    "{} (expected {:.1})",
                    m.recent_event_count, m.expected_recent_events
                )),
            ),
            (
                "Thresholds",
                Cell::new(format!(
                    "at risk > {}d, churned > {}d",
                    self.thresholds.at_risk_days, self.thresholds.churned_days
                )),
            ),
            ("Candidate status", status_cell(self.candidate_status)),
            ("Risk score", risk_cell(Some(self.risk_score))),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), value]);
        }
        writeln!(w, "{}", table)?;

        if let Some(c) = &self.components {
            let mut table = new_table();
            table.set_header(vec!["Component", "Score"]);
            table.add_row(vec!["Days overdue".to_string(), format!("{:.0}", c.days_overdue)]);
            table.add_row(vec!["Volume decline".to_string(), format!("{:.0}", c.volume_decline)]);
            table.add_row(vec![
                "Pattern deviation".to_string(),
                format!("{:.0}", c.pattern_deviation),
            ]);
            table.add_row(vec!["Tenure".to_string(), format!("{:.0}", c.tenure)]);
            writeln!(w, "{}", table)?;
        }
        Ok(())
    }
}

pub fn run_score(
    ctx: &CommandContext,
    events: Vec<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
) -> Result<ScoreReport> {
    let report = ScoreReport::build(events, created_at, ctx.now, &ctx.config);
    ctx.print(&report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn weekly_until(days_ago: i64, count: i64) -> Vec<DateTime<Utc>> {
        (0..count)
            .rev()
            .map(|i| now() - Duration::days(days_ago + i * 7))
            .collect()
    }

    #[test]
    fn test_lapsed_weekly_history() {
        let report = ScoreReport::build(
            weekly_until(25, 10),
            None,
            now(),
            &ChurnmapConfig::default(),
        );
        assert_eq!(report.metrics.cadence_days, Some(7.0));
        assert_eq!(report.cadence_band, CadenceBand::High);
        assert_eq!(
            report.thresholds,
            Thresholds {
                at_risk_days: 11,
                churned_days: 21
            }
        );
        assert_eq!(report.candidate_status, LifecycleStatus::Churned);
        assert!(report.risk_score >= 60.0);
        assert!(report.components.is_some());
    }

    #[test]
    fn test_anchor_defaults_to_first_event() {
        let events = weekly_until(1, 5);
        let first = events[0];
        let report = ScoreReport::build(events, None, now(), &ChurnmapConfig::default());
        assert_eq!(report.created_at, first);
        assert_eq!(report.candidate_status, LifecycleStatus::Active);
    }

    #[test]
    fn test_empty_history() {
        let report = ScoreReport::build(vec![], None, now(), &ChurnmapConfig::default());
        assert_eq!(report.risk_score, 50.0);
        assert_eq!(report.created_at, now());
        assert_eq!(report.candidate_status, LifecycleStatus::New);
        assert!(report.components.is_none());
    }

    #[test]
    fn test_unordered_input_is_accepted() {
        let mut events = weekly_until(2, 6);
        events.reverse();
        let report = ScoreReport::build(events, None, now(), &ChurnmapConfig::default());
        assert_eq!(report.metrics.total_events_historic, 6);
        assert_eq!(report.days_since_last_event, Some(2));
    }
}
