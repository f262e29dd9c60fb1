// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Step threshold administration
//!
//! Commands: list, get, set, deactivate, seed

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use sla_engine_core::application::UpsertThresholdRequest;

use crate::engine::CliContext;
use crate::output::{print_json, print_thresholds};

#[derive(Subcommand)]
pub enum ThresholdCommand {
    /// List thresholds ordered by priority
    List {
        /// Include deactivated thresholds
        #[arg(long)]
        all: bool,
    },

    /// Show the threshold for one step
    Get {
        #[arg(value_name = "STEP")]
        step: String,
    },

    /// Create or update a step threshold (re-activates it)
    Set {
        #[arg(value_name = "STEP")]
        step: String,

        /// Allowed duration in hours
        #[arg(long)]
        hours: i64,

        /// Informational day count (default: hours / 24)
        #[arg(long)]
        days: Option<i64>,

        /// Priority, applied only when the threshold is created
        #[arg(long)]
        priority: Option<i32>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Stop enforcing a step threshold
    Deactivate {
        #[arg(value_name = "STEP")]
        step: String,
    },

    /// Populate the configured steps if the registry is empty
    Seed,
}

pub async fn handle_command(command: ThresholdCommand, ctx: &CliContext) -> Result<()> {
    let (_config, engine) = ctx.engine().await?;
    let registry = engine.registry;

    match command {
        ThresholdCommand::List { all } => {
            let thresholds = if all {
                registry.list_all().await?
            } else {
                registry.list_active().await?
            };
            if ctx.json {
                return print_json(&thresholds);
            }
            print_thresholds(&thresholds);
        }
        ThresholdCommand::Get { step } => match registry.get(&step).await? {
            Some(threshold) if ctx.json => print_json(&threshold)?,
            Some(threshold) => print_thresholds(std::slice::from_ref(&threshold)),
            None => anyhow::bail!("No threshold configured for step '{}'", step),
        },
        ThresholdCommand::Set {
            step,
            hours,
            days,
            priority,
            description,
        } => {
            let threshold = registry
                .upsert(UpsertThresholdRequest {
                    step_name: step,
                    threshold_hours: hours,
                    threshold_days: days,
                    description,
                    priority,
                })
                .await?;
            if ctx.json {
                return print_json(&threshold);
            }
            println!(
                "{}",
                format!(
                    "✓ Threshold for {} set to {}h ({}d)",
                    threshold.step_name, threshold.threshold_hours, threshold.threshold_days
                )
                .green()
            );
        }
        ThresholdCommand::Deactivate { step } => match registry.deactivate(&step).await? {
            Some(threshold) if ctx.json => print_json(&threshold)?,
            Some(threshold) => {
                println!("{}", format!("✓ Threshold for {} deactivated", threshold.step_name).green())
            }
            None => anyhow::bail!("No threshold configured for step '{}'", step),
        },
        ThresholdCommand::Seed => {
            let seeded = registry.seed_defaults().await?;
            if ctx.json {
                return print_json(&serde_json::json!({ "seeded": seeded }));
            }
            if seeded == 0 {
                println!("{}", "Registry already populated, nothing seeded".yellow());
            } else {
                println!("{}", format!("✓ Seeded {} thresholds", seeded).green());
            }
        }
    }

    Ok(())
}
