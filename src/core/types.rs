//! Identifier and status types shared across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shipper identifier as assigned by the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipperId(pub u64);

impl fmt::Display for ShipperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ShipperId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Venture (tenant) identifier used to scope portfolios
pub type VentureId = u64;

/// Discrete lifecycle status of a shipper relationship.
///
/// Only [`crate::lifecycle::transition_status`] decides which variant a
/// shipper holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    #[default]
    New,
    Active,
    AtRisk,
    Churned,
    Reactivated,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 5] = [
        LifecycleStatus::New,
        LifecycleStatus::Active,
        LifecycleStatus::AtRisk,
        LifecycleStatus::Churned,
        LifecycleStatus::Reactivated,
    ];

    /// Stable upper-case name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::New => "NEW",
            LifecycleStatus::Active => "ACTIVE",
            LifecycleStatus::AtRisk => "AT_RISK",
            LifecycleStatus::Churned => "CHURNED",
            LifecycleStatus::Reactivated => "REACTIVATED",
        }
    }

    /// Whether the status counts toward the retained side of the retention rate
    pub fn is_retained(&self) -> bool {
        matches!(self, LifecycleStatus::Active | LifecycleStatus::Reactivated)
    }

    /// Whether the status is part of the retention-rate denominator
    pub fn counts_toward_retention(&self) -> bool {
        !matches!(self, LifecycleStatus::New)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        LifecycleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown lifecycle status '{}'", s))
    }
}

/// Shipper counts per lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: usize,
    pub active: usize,
    pub at_risk: usize,
    pub churned: usize,
    pub reactivated: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: LifecycleStatus) {
        *self.slot(status) += 1;
    }

    pub fn get(&self, status: LifecycleStatus) -> usize {
        match status {
            LifecycleStatus::New => self.new,
            LifecycleStatus::Active => self.active,
            LifecycleStatus::AtRisk => self.at_risk,
            LifecycleStatus::Churned => self.churned,
            LifecycleStatus::Reactivated => self.reactivated,
        }
    }

    fn slot(&mut self, status: LifecycleStatus) -> &mut usize {
        match status {
            LifecycleStatus::New => &mut self.new,
            LifecycleStatus::Active => &mut self.active,
            LifecycleStatus::AtRisk => &mut self.at_risk,
            LifecycleStatus::Churned => &mut self.churned,
            LifecycleStatus::Reactivated => &mut self.reactivated,
        }
    }

    pub fn total(&self) -> usize {
        LifecycleStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Retained share of shippers that have had a chance to churn.
    ///
    /// `NEW` is left out of the denominator; an empty denominator reports 100.
    pub fn retention_rate(&self) -> f64 {
        let eligible: usize = LifecycleStatus::ALL
            .iter()
            .filter(|s| s.counts_toward_retention())
            .map(|s| self.get(*s))
            .sum();
        if eligible == 0 {
            return 100.0;
        }
        let retained: usize = LifecycleStatus::ALL
            .iter()
            .filter(|s| s.is_retained())
            .map(|s| self.get(*s))
            .sum();
        retained as f64 / eligible as f64 * 100.0
    }
}

impl FromIterator<LifecycleStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = LifecycleStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}
