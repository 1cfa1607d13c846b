// Export modules for library usage
pub mod cadence;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod io;
pub mod lifecycle;
pub mod portfolio;
pub mod progress;
pub mod risk;
pub mod thresholds;

// Re-export commonly used types
pub use crate::core::{
    EventLog, LifecycleStatus, MetricsUpdate, ShipperFilter, ShipperId, ShipperRecord,
    StatusCounts, StatusUpdate, TransactionEvent, VentureId,
};

pub use crate::cadence::{compute_cadence_metrics, CadenceBand, CadenceMetrics};

pub use crate::risk::{
    compute_shipper_metrics, explain_churn_risk, score_churn_risk, RiskBreakdown,
    RiskComponents, RiskLevel, ShipperMetrics,
};

pub use crate::thresholds::{compute_thresholds, Thresholds};

pub use crate::lifecycle::{assess_shipper, transition_status, ShipperAssessment, StatusDecision};

pub use crate::portfolio::{
    BackfillReport, CancellationToken, ChurnEngine, ListQuery, OutreachList, PortfolioSummary,
    RecomputeOptions, RecomputeReport, ShipperChurnInfo,
};

pub use crate::io::{ChurnStore, Dataset, EventSource, KpiStore, MemoryStore, ShipperStore};

pub use crate::config::ChurnmapConfig;
pub use crate::errors::{ChurnError, Result};
