//! CLI command implementations for churnmap operations.
//!
//! Each submodule handles one subcommand. Commands that read shippers load
//! the JSON dataset into a [`MemoryStore`], run the engine against it and,
//! when they changed anything, write the dataset back.
//!
//! Available commands:
//! - **recompute**: Recompute cadence, risk and status for the portfolio
//! - **summary**: Status counts, retention rate and optional KPI snapshot
//! - **list**: At-risk, churned and high-risk outreach lists
//! - **score**: Explain the score of an ad-hoc event history
//! - **backfill**: Refresh stored metrics without touching status
//! - **init**: Write a default configuration file

pub mod backfill;
pub mod init;
pub mod list;
pub mod recompute;
pub mod score;
pub mod summary;

pub use backfill::run_backfill;
pub use init::init_config;
pub use list::{run_list, ListConfig};
pub use recompute::{run_recompute, RecomputeConfig};
pub use score::{run_score, ScoreReport};
pub use summary::run_summary;

use crate::config::ChurnmapConfig;
use crate::io::{emit, Dataset, MemoryStore, OutputFormat, Render};
use crate::portfolio::ChurnEngine;
use crate::progress::{BarProgressSink, ProgressSink};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// Settings shared by every command, resolved once in `main`
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: ChurnmapConfig,
    pub now: DateTime<Utc>,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Progress bars go to stderr and are suppressed for JSON output
    pub fn progress(&self) -> Arc<dyn ProgressSink> {
        Arc::new(BarProgressSink::new(
            self.quiet || self.format == OutputFormat::Json,
        ))
    }

    pub fn open_engine(&self, data: &Path) -> Result<ChurnEngine<MemoryStore>> {
        let store = open_store(data)?;
        Ok(ChurnEngine::new(Arc::new(store), self.config.clone()).with_progress(self.progress()))
    }

    pub fn print<T: Render>(&self, value: &T) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        emit(value, self.format, &mut out).context("Failed to write output")
    }
}

pub fn open_store(data: &Path) -> Result<MemoryStore> {
    Dataset::load(data)
        .with_context(|| format!("Failed to read dataset {}", data.display()))?
        .into_store()
        .with_context(|| format!("Invalid dataset {}", data.display()))
}

pub fn save_store(store: &MemoryStore, data: &Path) -> Result<()> {
    Dataset::from_store(store)
        .save(data)
        .with_context(|| format!("Failed to write dataset {}", data.display()))
}
