// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend configuration,
//! keeping the Domain Layer free of infrastructure dependencies.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Select in-memory or PostgreSQL stores for thresholds and trackers

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::domain::repository::{StorageBackend, ThresholdRepository, TrackerRepository};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{
    InMemoryThresholdRepository, InMemoryTrackerRepository, PostgresThresholdRepository,
    PostgresTrackerRepository,
};

/// The pair of stores the engine runs on
#[derive(Clone)]
pub struct SlaRepositories {
    pub thresholds: Arc<dyn ThresholdRepository>,
    pub trackers: Arc<dyn TrackerRepository>,
}

impl SlaRepositories {
    pub fn in_memory() -> Self {
        Self {
            thresholds: Arc::new(InMemoryThresholdRepository::new()),
            trackers: Arc::new(InMemoryTrackerRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            thresholds: Arc::new(PostgresThresholdRepository::new(pool.clone())),
            trackers: Arc::new(PostgresTrackerRepository::new(pool)),
        }
    }
}

/// Creates the repositories for the configured backend, connecting to
/// PostgreSQL when selected.
pub async fn create_repositories(backend: &StorageBackend) -> Result<SlaRepositories> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory SLA storage");
            Ok(SlaRepositories::in_memory())
        }
        StorageBackend::PostgreSQL(config) => {
            let db = Database::connect(config).await?;
            info!(max_connections = config.max_connections, "Connected to PostgreSQL SLA storage");
            Ok(SlaRepositories::postgres(db.get_pool().clone()))
        }
    }
}
