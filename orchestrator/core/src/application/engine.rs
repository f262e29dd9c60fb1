// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SLA Engine composition root
//!
//! Wires the registry, orchestrator, event bus and sweeper from a validated
//! `SlaConfigManifest`. Callers that need custom stores or a manual clock use
//! [`SlaEngine::from_parts`].

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::application::repository_factory::{create_repositories, SlaRepositories};
use crate::application::sla_orchestrator::{SlaOrchestrator, StandardSlaOrchestrator};
use crate::application::sla_sweeper::{SlaSweeper, SlaSweeperConfig};
use crate::application::threshold_registry::{StandardThresholdRegistry, ThresholdRegistry};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::sla_config::SlaConfigManifest;
use crate::domain::status_mapping::StatusStepMapping;
use crate::domain::step::StepCatalog;
use crate::infrastructure::event_bus::EventBus;

pub struct SlaEngine {
    pub registry: Arc<dyn ThresholdRegistry>,
    pub orchestrator: Arc<dyn SlaOrchestrator>,
    pub event_bus: Arc<EventBus>,
    pub catalog: Arc<dyn StepCatalog>,
    sweeper_config: SlaSweeperConfig,
}

impl SlaEngine {
    /// Validate the manifest, connect the configured backend and wire the
    /// services on the wall clock.
    pub async fn from_config(config: &SlaConfigManifest) -> Result<Self> {
        config.validate().context("Invalid SLA configuration")?;
        let repositories = create_repositories(&config.storage_backend()).await?;
        Self::from_parts(config, repositories, Arc::new(SystemClock))
    }

    pub fn from_parts(
        config: &SlaConfigManifest,
        repositories: SlaRepositories,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let catalog: Arc<dyn StepCatalog> = Arc::new(config.step_catalog());
        let status_mapping = StatusStepMapping::new(&config.spec.status_mappings, catalog.as_ref())
            .context("Invalid status mappings")?;
        let event_bus = Arc::new(EventBus::with_default_capacity());

        let registry: Arc<dyn ThresholdRegistry> = Arc::new(StandardThresholdRegistry::new(
            repositories.thresholds,
            catalog.clone(),
            config.spec.steps.clone(),
            clock.clone(),
        ));

        let orchestrator: Arc<dyn SlaOrchestrator> = Arc::new(StandardSlaOrchestrator::new(
            registry.clone(),
            repositories.trackers,
            catalog.clone(),
            status_mapping,
            event_bus.clone(),
            clock,
        ));

        Ok(Self {
            registry,
            orchestrator,
            event_bus,
            catalog,
            sweeper_config: SlaSweeperConfig {
                interval: Duration::from_secs(config.spec.sweep.interval_seconds),
                enabled: config.spec.sweep.enabled,
            },
        })
    }

    pub fn sweeper(&self) -> SlaSweeper {
        SlaSweeper::new(self.orchestrator.clone(), self.sweeper_config.clone())
    }
}
