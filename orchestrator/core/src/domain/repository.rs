// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD Repository
//! pattern: one repository per aggregate, interface defined in the domain layer,
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ThresholdRepository` | `StepThreshold` | `InMemoryThresholdRepository`, `PostgresThresholdRepository` |
//! | `TrackerRepository` | `SlaTracker` | `InMemoryTrackerRepository`, `PostgresTrackerRepository` |
//!
//! ## Concurrency contract
//!
//! Engine instances may be horizontally scaled, so no tracker state is cached
//! in-process across calls. Instead every tracker write is atomic at the row
//! level:
//!
//! - [`TrackerRepository::insert_if_no_open`] is an atomic check-and-insert
//!   backed by the "single open tracker per (workflow, step)" constraint.
//! - [`TrackerRepository::update_open`] is a compare-and-set: it only writes
//!   if the stored row is still open and still carries the status the caller
//!   read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::step::StepName;
use crate::domain::threshold::StepThreshold;
use crate::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Repository interface for StepThreshold aggregates
#[async_trait]
pub trait ThresholdRepository: Send + Sync {
    /// Create or update the record keyed by step name
    async fn save(&self, threshold: &StepThreshold) -> Result<(), RepositoryError>;

    /// Find the record for a step, active or not
    async fn find_by_step(&self, step_name: &StepName) -> Result<Option<StepThreshold>, RepositoryError>;

    /// List every record, active and inactive
    async fn list_all(&self) -> Result<Vec<StepThreshold>, RepositoryError>;

    /// Number of stored records
    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Outcome of an atomic open-tracker insert
#[derive(Debug, Clone)]
pub enum OpenInsert {
    /// The candidate was stored
    Created(SlaTracker),
    /// Another open tracker already held the (workflow, step) slot
    Existing(SlaTracker),
}

impl OpenInsert {
    pub fn into_tracker(self) -> SlaTracker {
        match self {
            OpenInsert::Created(tracker) | OpenInsert::Existing(tracker) => tracker,
        }
    }
}

/// Repository interface for SlaTracker aggregates
#[async_trait]
pub trait TrackerRepository: Send + Sync {
    /// Store `tracker` unless an open tracker already exists for its
    /// (workflow, step) pair, in which case that one is returned.
    async fn insert_if_no_open(&self, tracker: &SlaTracker) -> Result<OpenInsert, RepositoryError>;

    /// Write `tracker` only if the stored row is still open with status
    /// `expected`. Returns whether the write happened.
    async fn update_open(&self, tracker: &SlaTracker, expected: TrackerStatus) -> Result<bool, RepositoryError>;

    /// Find tracker by ID
    async fn find_by_id(&self, id: TrackerId) -> Result<Option<SlaTracker>, RepositoryError>;

    /// Find the open tracker for a (workflow, step) pair
    async fn find_open(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &StepName,
    ) -> Result<Option<SlaTracker>, RepositoryError>;

    /// All open trackers (not completed, not cancelled)
    async fn find_all_open(&self) -> Result<Vec<SlaTracker>, RepositoryError>;

    /// Every tracker of one workflow instance, oldest first
    async fn find_by_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, RepositoryError>;

    /// Trackers whose `completed_at` falls in `[since, until]`, optionally for one assignee
    async fn find_completed_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        assignee_id: Option<&str>,
    ) -> Result<Vec<SlaTracker>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                RepositoryError::UniqueViolation(db_err.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
