//! Read-side portfolio aggregates.

use crate::config::ChurnmapConfig;
use crate::core::{ShipperRecord, StatusCounts, VentureId};
use crate::io::traits::DailyChurnKpis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub venture_id: Option<VentureId>,
    pub as_of: DateTime<Utc>,
    pub counts: StatusCounts,
    pub total_shippers: usize,
    /// Percentage of non-`NEW` shippers that are `ACTIVE` or `REACTIVATED`
    pub retention_rate: f64,
    pub avg_risk_score: f64,
    pub high_risk_count: usize,
}

impl PortfolioSummary {
    /// Aggregate persisted records as they stand; nothing is recomputed.
    pub fn from_records(
        records: &[ShipperRecord],
        venture_id: Option<VentureId>,
        as_of: DateTime<Utc>,
        config: &ChurnmapConfig,
    ) -> Self {
        let counts: StatusCounts = records.iter().map(|r| r.status).collect();

        let scores: Vec<f64> = records.iter().filter_map(|r| r.risk_score).collect();
        let avg_risk_score = if scores.is_empty() {
            0.0
        } else {
            (scores.iter().sum::<f64>() / scores.len() as f64).round()
        };
        let high_risk_count = scores
            .iter()
            .filter(|s| **s >= config.scoring.high_risk_score)
            .count();

        Self {
            venture_id,
            as_of,
            total_shippers: counts.total(),
            retention_rate: counts.retention_rate(),
            counts,
            avg_risk_score,
            high_risk_count,
        }
    }

    pub fn to_daily_kpis(&self, venture_id: VentureId) -> DailyChurnKpis {
        DailyChurnKpis {
            venture_id,
            date: self.as_of.date_naive(),
            counts: self.counts,
            retention_rate: self.retention_rate,
            avg_risk_score: self.avg_risk_score,
            high_risk_count: self.high_risk_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LifecycleStatus;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 18, 30, 0).unwrap()
    }

    fn record(id: u64, status: LifecycleStatus, score: Option<f64>) -> ShipperRecord {
        let mut record = ShipperRecord::new(id, format!("Shipper {}", id), 1, as_of());
        record.status = status;
        record.risk_score = score;
        record
    }

    #[test]
    fn test_summary_counts_and_retention() {
        let mut records = Vec::new();
        for id in 0..5 {
            records.push(record(id, LifecycleStatus::New, None));
        }
        for id in 5..8 {
            records.push(record(id, LifecycleStatus::Active, Some(10.0)));
        }
        for id in 8..10 {
            records.push(record(id, LifecycleStatus::Churned, Some(85.0)));
        }

        let summary =
            PortfolioSummary::from_records(&records, Some(1), as_of(), &ChurnmapConfig::default());

        assert_eq!(summary.total_shippers, 10);
        assert!((summary.retention_rate - 60.0).abs() < 1e-9);
        // (3*10 + 2*85) / 5 = 40
        assert_eq!(summary.avg_risk_score, 40.0);
        assert_eq!(summary.high_risk_count, 2);
    }

    #[test]
    fn test_empty_portfolio() {
        let summary =
            PortfolioSummary::from_records(&[], None, as_of(), &ChurnmapConfig::default());
        assert_eq!(summary.retention_rate, 100.0);
        assert_eq!(summary.avg_risk_score, 0.0);
        assert_eq!(summary.high_risk_count, 0);
    }

    #[test]
    fn test_average_is_rounded() {
        let records = vec![
            record(1, LifecycleStatus::Active, Some(10.0)),
            record(2, LifecycleStatus::Active, Some(11.0)),
        ];
        let summary =
            PortfolioSummary::from_records(&records, None, as_of(), &ChurnmapConfig::default());
        assert_eq!(summary.avg_risk_score, 11.0);
    }

    #[test]
    fn test_daily_kpis_use_utc_date() {
        let summary =
            PortfolioSummary::from_records(&[], Some(4), as_of(), &ChurnmapConfig::default());
        let kpis = summary.to_daily_kpis(4);
        assert_eq!(kpis.date.to_string(), "2024-07-15");
        assert_eq!(kpis.venture_id, 4);
    }
}
