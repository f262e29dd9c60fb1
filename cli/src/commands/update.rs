// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Update Command
//!
//! This module implements the `sla update` command for applying database
//! migrations to keep the schema in sync with the application version.
//!
//! # Architecture
//!
//! - **Layer:** CLI/Presentation
//! - **Purpose:** Database schema migration management
//! - **Integration:** CLI → SQLx Migrator → PostgreSQL
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! sla update
//!
//! # Preview migrations without applying
//! sla update --dry-run
//! ```
//!
//! # Environment
//!
//! Uses `spec.storage.database_url`, which `SLA_DATABASE_URL` overrides.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sqlx::postgres::PgPoolOptions;

use crate::engine::CliContext;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Args)]
pub struct UpdateCommand {
    /// Perform a dry run without applying changes
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: UpdateCommand, ctx: &CliContext) -> Result<()> {
    println!("{}", "SLA Engine Update".bold().green());

    let config = ctx.load_config()?;
    let database_url = config
        .spec
        .storage
        .database_url
        .filter(|url| !url.is_empty())
        .context("No database URL configured. Set spec.storage.database_url or SLA_DATABASE_URL.")?;

    println!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let applied_count = sqlx::query("SELECT version FROM _sqlx_migrations")
        .fetch_all(&pool)
        .await
        .map(|rows| rows.len())
        .unwrap_or(0);

    let total_migrations = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        applied_count, total_migrations
    );

    if applied_count < total_migrations {
        if cmd.dry_run {
            println!("Pending migrations found (Dry Run):");
            for migration in MIGRATOR.iter().skip(applied_count) {
                println!(" - {} {}", migration.version, migration.description);
            }
            println!("Skipping application due to --dry-run");
            return Ok(());
        }

        println!("Applying pending migrations...");
        MIGRATOR.run(&pool).await.context("Failed to apply migrations")?;
        println!("{}", "✓ Database updated successfully.".green());
    } else {
        println!("{}", "✓ Database is up to date.".green());
    }

    Ok(())
}
