use anyhow::Result;
use clap::Parser;
use churnmap::cli::setup::{init_logging, reference_time, resolve_config};
use churnmap::cli::{Cli, Commands};
use churnmap::commands::{self, CommandContext, ListConfig, RecomputeConfig};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { force } => commands::init_config(Path::new("."), force),
        command => {
            let ctx = CommandContext {
                config: resolve_config(cli.config.as_deref())?,
                now: reference_time(cli.as_of),
                format: cli.format,
                quiet: cli.quiet,
            };
            handle_data_command(&ctx, command)
        }
    }
}

// Commands that run against a dataset with a resolved config and clock
fn handle_data_command(ctx: &CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::Recompute {
            data,
            venture,
            include_test,
            dry_run,
            jobs,
            timeout_secs,
            fail_fast,
        } => {
            commands::run_recompute(
                ctx,
                RecomputeConfig {
                    data: data.data,
                    venture,
                    include_test,
                    dry_run,
                    jobs,
                    timeout_secs,
                    fail_fast,
                },
            )?;
        }
        Commands::Summary {
            data,
            venture,
            include_test,
            record_kpis,
        } => {
            commands::run_summary(ctx, &data.data, venture, include_test, record_kpis)?;
        }
        Commands::List {
            kind,
            data,
            venture,
            limit,
            min_score,
            include_test,
        } => {
            commands::run_list(
                ctx,
                ListConfig {
                    data: data.data,
                    list: kind,
                    venture,
                    limit,
                    min_score,
                    include_test,
                },
            )?;
        }
        Commands::Score { events, created_at } => {
            commands::run_score(ctx, events, created_at)?;
        }
        Commands::Backfill { data, venture } => {
            commands::run_backfill(ctx, &data.data, venture)?;
        }
        Commands::Init { .. } => return Err(anyhow::anyhow!("Invalid command")),
    }
    Ok(())
}
