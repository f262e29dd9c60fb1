// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SLA Sweeper - Background task that keeps open trackers fresh
//!
//! Periodically recomputes every open tracker so that breaches are persisted
//! (and `BreachDetected` is published) even when nobody reads the data.
//! Reads always recompute lazily, so the sweeper is optional.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic recompute driver with graceful shutdown

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::sla_orchestrator::SlaOrchestrator;

#[derive(Debug, Clone)]
pub struct SlaSweeperConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for SlaSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

pub struct SlaSweeper {
    orchestrator: Arc<dyn SlaOrchestrator>,
    config: SlaSweeperConfig,
    shutdown_token: CancellationToken,
}

impl SlaSweeper {
    pub fn new(orchestrator: Arc<dyn SlaOrchestrator>, config: SlaSweeperConfig) -> Self {
        Self {
            orchestrator,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Handle that stops the sweeper when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run until the shutdown token is cancelled. Returns immediately when disabled.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("SLA sweeper is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval.as_secs(),
            "Starting SLA sweeper background task"
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.sweep_once().await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping SLA sweeper");
                    break;
                }
            }
        }

        info!("SLA sweeper background task stopped");
    }

    /// One recompute pass. Failures are logged and the next tick retries.
    pub async fn sweep_once(&self) -> Option<usize> {
        debug!("Running SLA sweep");
        match self.orchestrator.recompute_all_open().await {
            Ok(visited) => {
                debug!(visited, "SLA sweep completed");
                Some(visited)
            }
            Err(e) => {
                warn!(error = %e, "SLA sweep failed");
                None
            }
        }
    }
}
