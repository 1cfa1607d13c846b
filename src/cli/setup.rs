//! Setup and initialization functions for CLI
//!
//! Logging, configuration resolution and the reference clock, all performed
//! once at startup before a command runs.

use crate::config::{load_config, load_config_from_path, ChurnmapConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV_VAR: &str = "CHURNMAP_LOG";

/// Filter directive used when `CHURNMAP_LOG` is unset
pub fn default_log_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `CHURNMAP_LOG` wins over `-v`. `log` records from dependencies are
/// bridged through tracing-log. Calling this twice is harmless.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// An explicit config path must load; otherwise search upward from the
/// current directory and fall back to defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ChurnmapConfig> {
    match explicit {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(load_config()),
    }
}

pub fn reference_time(as_of: Option<DateTime<Utc>>) -> DateTime<Utc> {
    as_of.unwrap_or_else(Utc::now)
}
