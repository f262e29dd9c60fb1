// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use sla_engine_core::domain::sla_config::{SlaConfigManifest, StorageKind};

use crate::engine::CliContext;
use crate::output::print_json;

const CONFIG_TEMPLATE: &str = include_str!("../../templates/sla-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./sla-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, ctx: &CliContext) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(ctx, paths).await,
        ConfigCommand::Validate { file } => validate(file.or_else(|| ctx.config_path.clone())).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

async fn show(ctx: &CliContext, show_paths: bool) -> Result<()> {
    let config = ctx.load_config()?;

    if ctx.json {
        return print_json(&config);
    }

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &ctx.config_path {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. SLA_CONFIG_PATH: {}",
            std::env::var("SLA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./sla-config.yaml");
        println!("  4. ~/.sla/config.yaml");
        println!("  5. /etc/sla/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Steps:".bold());
    for step in &config.spec.steps {
        println!(
            "  {:<24} {:>5}h ({}d)  priority {}",
            step.name.as_str().bold(),
            step.threshold_hours,
            step.days(),
            step.priority
        );
    }
    println!();

    println!("{}", "Status mappings:".bold());
    for (status, steps) in &config.spec.status_mappings {
        println!("  {} → {}", status, steps.join(", "));
    }
    println!();

    println!("{}", "Storage:".bold());
    match config.spec.storage.backend {
        StorageKind::InMemory => println!("  Backend: in-memory"),
        StorageKind::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  Database URL: {}",
                if config.spec.storage.database_url.is_some() {
                    "(set)".normal()
                } else {
                    "(missing)".red()
                }
            );
            println!("  Max connections: {}", config.spec.storage.max_connections);
        }
    }
    println!();

    println!("{}", "Sweep:".bold());
    println!("  Enabled: {}", config.spec.sweep.enabled);
    println!("  Interval: {}s", config.spec.sweep.interval_seconds);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SlaConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    std::fs::write(&output, CONFIG_TEMPLATE).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
