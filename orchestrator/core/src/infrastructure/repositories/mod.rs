// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! This module provides infrastructure implementations of repository abstractions
//! defined in the domain layer, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresThresholdRepository** - `step_thresholds` table keyed by step name
//! - **PostgresTrackerRepository** - `sla_trackers` table with a partial unique
//!   index enforcing one open tracker per (workflow, step)
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for testing and single-process use. The
//! tracker store performs check-and-insert and compare-and-set under a single
//! write lock, giving the same atomicity the partial index gives PostgreSQL.

pub mod postgres_threshold;
pub mod postgres_tracker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::repository::{OpenInsert, RepositoryError, ThresholdRepository, TrackerRepository};
use crate::domain::step::StepName;
use crate::domain::threshold::StepThreshold;
use crate::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};

pub use postgres_threshold::PostgresThresholdRepository;
pub use postgres_tracker::PostgresTrackerRepository;

#[derive(Clone, Default)]
pub struct InMemoryThresholdRepository {
    thresholds: Arc<RwLock<HashMap<StepName, StepThreshold>>>,
}

impl InMemoryThresholdRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThresholdRepository for InMemoryThresholdRepository {
    async fn save(&self, threshold: &StepThreshold) -> Result<(), RepositoryError> {
        let mut thresholds = self.thresholds.write();
        thresholds.insert(threshold.step_name.clone(), threshold.clone());
        Ok(())
    }

    async fn find_by_step(&self, step_name: &StepName) -> Result<Option<StepThreshold>, RepositoryError> {
        let thresholds = self.thresholds.read();
        Ok(thresholds.get(step_name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<StepThreshold>, RepositoryError> {
        let thresholds = self.thresholds.read();
        Ok(thresholds.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.thresholds.read().len())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTrackerRepository {
    trackers: Arc<RwLock<HashMap<TrackerId, SlaTracker>>>,
}

impl InMemoryTrackerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored trackers, any status
    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn same_slot(tracker: &SlaTracker, workflow_instance_id: &WorkflowInstanceId, step_name: &StepName) -> bool {
    &tracker.workflow_instance_id == workflow_instance_id && &tracker.step_name == step_name
}

#[async_trait]
impl TrackerRepository for InMemoryTrackerRepository {
    async fn insert_if_no_open(&self, tracker: &SlaTracker) -> Result<OpenInsert, RepositoryError> {
        let mut trackers = self.trackers.write();
        if let Some(existing) = trackers.values().find(|t| {
            t.is_open() && same_slot(t, &tracker.workflow_instance_id, &tracker.step_name)
        }) {
            return Ok(OpenInsert::Existing(existing.clone()));
        }
        if trackers.contains_key(&tracker.id) {
            return Err(RepositoryError::UniqueViolation(format!(
                "tracker {} already exists",
                tracker.id
            )));
        }
        trackers.insert(tracker.id, tracker.clone());
        Ok(OpenInsert::Created(tracker.clone()))
    }

    async fn update_open(&self, tracker: &SlaTracker, expected: TrackerStatus) -> Result<bool, RepositoryError> {
        let mut trackers = self.trackers.write();
        match trackers.get_mut(&tracker.id) {
            Some(stored) if stored.is_open() && stored.status == expected => {
                *stored = tracker.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound(format!("tracker {}", tracker.id))),
        }
    }

    async fn find_by_id(&self, id: TrackerId) -> Result<Option<SlaTracker>, RepositoryError> {
        Ok(self.trackers.read().get(&id).cloned())
    }

    async fn find_open(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &StepName,
    ) -> Result<Option<SlaTracker>, RepositoryError> {
        let trackers = self.trackers.read();
        Ok(trackers
            .values()
            .find(|t| t.is_open() && same_slot(t, workflow_instance_id, step_name))
            .cloned())
    }

    async fn find_all_open(&self) -> Result<Vec<SlaTracker>, RepositoryError> {
        let trackers = self.trackers.read();
        let mut open: Vec<SlaTracker> = trackers.values().filter(|t| t.is_open()).cloned().collect();
        open.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(open)
    }

    async fn find_by_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, RepositoryError> {
        let trackers = self.trackers.read();
        let mut list: Vec<SlaTracker> = trackers
            .values()
            .filter(|t| &t.workflow_instance_id == workflow_instance_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(list)
    }

    async fn find_completed_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        assignee_id: Option<&str>,
    ) -> Result<Vec<SlaTracker>, RepositoryError> {
        let trackers = self.trackers.read();
        let mut list: Vec<SlaTracker> = trackers
            .values()
            .filter(|t| matches!(t.completed_at, Some(at) if at >= since && at <= until))
            .filter(|t| assignee_id.map_or(true, |a| t.assignee_id.as_deref() == Some(a)))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(list)
    }
}
