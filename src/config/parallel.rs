//! Batch configuration for portfolio-wide recomputation.
//!
//! Controls how many shippers are recomputed concurrently on rayon's pool,
//! when stored metrics count as stale, and how failures affect the batch.

use serde::{Deserialize, Serialize};

fn default_stale_after_hours() -> u32 {
    24
}

/// Configuration for bulk recompute runs.
///
/// # Example
///
/// ```rust
/// use churnmap::config::BatchConfig;
///
/// let config = BatchConfig {
///     max_concurrency: Some(4),
///     ..Default::default()
/// };
/// assert_eq!(config.effective_concurrency(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    /// Stored metrics older than this are recomputed (default: 24)
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: u32,

    /// Maximum shippers processed concurrently (default: num_cpus)
    ///
    /// `Some(1)` processes shippers sequentially.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Stop the batch after the first per-shipper failure (default: false)
    ///
    /// When false, failures are collected and the rest of the batch still runs.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
            max_concurrency: None,
            fail_fast: false,
        }
    }
}

impl BatchConfig {
    /// Create a config with sequential processing.
    pub fn sequential() -> Self {
        Self {
            max_concurrency: Some(1),
            ..Default::default()
        }
    }

    /// Get the effective concurrency level.
    ///
    /// Returns the configured max_concurrency, or the number of
    /// available CPU cores if not specified.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(num_cpus).max(1)
    }

    /// Staleness window as a chrono duration
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.stale_after_hours))
    }
}

/// Returns the number of available CPU cores.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.stale_after_hours, 24);
        assert!(config.max_concurrency.is_none());
        assert!(!config.fail_fast);
        assert!(config.effective_concurrency() >= 1);
    }

    #[test]
    fn test_sequential() {
        assert_eq!(BatchConfig::sequential().effective_concurrency(), 1);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = BatchConfig {
            max_concurrency: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_batch_config_serde() {
        let config = BatchConfig {
            stale_after_hours: 6,
            max_concurrency: Some(8),
            fail_fast: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
