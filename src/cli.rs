pub mod setup;

use crate::core::VentureId;
use crate::io::OutputFormat;
use crate::portfolio::OutreachList;
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "churnmap")]
#[command(about = "Shipper churn-risk scoring and lifecycle tracking", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the nearest .churnmap.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Reference time for every computation (RFC 3339, defaults to now)
    #[arg(long, global = true)]
    pub as_of: Option<DateTime<Utc>>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal", global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Location of the JSON dataset a command operates on
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// JSON dataset holding shippers, events and daily KPIs
    #[arg(short, long, env = "CHURNMAP_DATA")]
    pub data: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recompute cadence, risk and lifecycle status for every active shipper
    Recompute {
        #[command(flatten)]
        data: DataArgs,

        /// Restrict to one venture
        #[arg(long)]
        venture: Option<VentureId>,

        /// Include shippers flagged as test data
        #[arg(long)]
        include_test: bool,

        /// Compute and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Worker threads (0 = all cores, overrides the config file)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Stop starting new shippers after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Abort the run at the first shipper failure
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show status counts, retention rate and risk aggregates
    Summary {
        #[command(flatten)]
        data: DataArgs,

        /// Restrict to one venture
        #[arg(long)]
        venture: Option<VentureId>,

        /// Include shippers flagged as test data
        #[arg(long)]
        include_test: bool,

        /// Persist the venture's counts as today's KPI snapshot
        #[arg(long, requires = "venture")]
        record_kpis: bool,
    },

    /// Print a prioritized outreach list
    List {
        /// Which list to print
        #[arg(value_enum)]
        kind: OutreachList,

        #[command(flatten)]
        data: DataArgs,

        /// Venture to list shippers for
        #[arg(long)]
        venture: VentureId,

        /// Maximum number of shippers
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Minimum risk score for the high-risk list
        #[arg(long, default_value = "70")]
        min_score: f64,

        /// Include shippers flagged as test data
        #[arg(long)]
        include_test: bool,
    },

    /// Score an ad-hoc event history without a dataset
    Score {
        /// Event timestamps (RFC 3339, comma separated, any order)
        #[arg(long, value_delimiter = ',')]
        events: Vec<DateTime<Utc>>,

        /// Shipper creation time (defaults to the first event)
        #[arg(long)]
        created_at: Option<DateTime<Utc>>,
    },

    /// Recompute and store metrics for every shipper without touching status
    Backfill {
        #[command(flatten)]
        data: DataArgs,

        /// Restrict to one venture
        #[arg(long)]
        venture: Option<VentureId>,
    },

    /// Write a default .churnmap.toml in the current directory
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}
