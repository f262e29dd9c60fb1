// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Engine bootstrap for CLI commands
//!
//! Loads configuration and builds the SLA services in-process against the
//! configured store.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, warn};

use sla_engine_core::application::SlaEngine;
use sla_engine_core::domain::repository::StorageBackend;
use sla_engine_core::domain::sla_config::SlaConfigManifest;

/// Global flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl CliContext {
    pub fn load_config(&self) -> Result<SlaConfigManifest> {
        SlaConfigManifest::load_or_default(self.config_path.clone()).context("Failed to load configuration")
    }

    /// Build the engine from configuration.
    ///
    /// The in-memory backend starts empty on every invocation, so its
    /// registry is seeded from the configured steps.
    pub async fn engine(&self) -> Result<(SlaConfigManifest, SlaEngine)> {
        let config = self.load_config()?;
        let engine = SlaEngine::from_config(&config).await?;

        if config.storage_backend() == StorageBackend::InMemory {
            warn!("Using in-memory storage; state is discarded when the command exits");
            if !self.json {
                eprintln!(
                    "{}",
                    "⚠ In-memory storage: trackers are not persisted between invocations".yellow()
                );
            }
            let seeded = engine.registry.seed_defaults().await?;
            debug!(seeded, "Seeded in-memory threshold registry");
        }

        Ok((config, engine))
    }
}
