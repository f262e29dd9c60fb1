// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SLA Engine CLI
//!
//! The `sla` binary drives the SLA engine against the configured store.
//!
//! ## Commands
//!
//! - `sla config show|validate|generate` - Configuration management
//! - `sla threshold list|get|set|deactivate|seed` - Step threshold administration
//! - `sla tracker start|complete|cancel|show|auto-start|workflow` - Tracker lifecycle
//! - `sla report global|assignee|breaching` - Compliance reporting
//! - `sla sweep` - Run the periodic recompute sweep until interrupted
//! - `sla update` - Apply database migrations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use sla_engine::commands::{
    self, ConfigCommand, ReportCommand, SweepCommand, ThresholdCommand, TrackerCommand, UpdateCommand,
};
use sla_engine::engine::CliContext;
use sla_engine_core::domain::sla_config::SlaConfigManifest;

/// SLA Engine - Track workflow steps against their time allowance
#[derive(Parser)]
#[command(name = "sla")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "SLA_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Step threshold administration
    #[command(name = "threshold")]
    Threshold {
        #[command(subcommand)]
        command: ThresholdCommand,
    },

    /// Tracker lifecycle
    #[command(name = "tracker")]
    Tracker {
        #[command(subcommand)]
        command: TrackerCommand,
    },

    /// Compliance reports
    #[command(name = "report")]
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },

    /// Recompute open trackers periodically until interrupted
    #[command(name = "sweep")]
    Sweep {
        #[command(flatten)]
        command: SweepCommand,
    },

    /// Update SLA database
    #[command(name = "update")]
    Update {
        #[command(flatten)]
        command: UpdateCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logging settings come from the config file, so peek at it before the
    // subscriber exists; the command loads it again with logging active.
    let logging = SlaConfigManifest::load_or_default(cli.config.clone())
        .map(|c| c.spec.observability.logging)
        .unwrap_or_default();
    let level = cli.log_level.as_deref().unwrap_or(&logging.level);
    init_logging(level, &logging.format)?;

    let ctx = CliContext {
        config_path: cli.config,
        json: cli.json,
    };

    match cli.command {
        Some(Commands::Config { command }) => commands::config::handle_command(command, &ctx).await,
        Some(Commands::Threshold { command }) => commands::threshold::handle_command(command, &ctx).await,
        Some(Commands::Tracker { command }) => commands::tracker::handle_command(command, &ctx).await,
        Some(Commands::Report { command }) => commands::report::handle_command(command, &ctx).await,
        Some(Commands::Sweep { command }) => commands::sweep::execute(command, &ctx).await,
        Some(Commands::Update { command }) => commands::update::execute(command, &ctx).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
