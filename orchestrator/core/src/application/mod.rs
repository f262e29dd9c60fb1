// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod aggregation;
pub mod engine;
pub mod repository_factory;
pub mod sla_orchestrator;
pub mod sla_sweeper;
pub mod threshold_registry;

// Re-export services for convenience
pub use engine::SlaEngine;
pub use sla_orchestrator::{SlaOrchestrator, StandardSlaOrchestrator, StartTrackerRequest};
pub use sla_sweeper::{SlaSweeper, SlaSweeperConfig};
pub use threshold_registry::{StandardThresholdRegistry, ThresholdRegistry, UpsertThresholdRequest};
