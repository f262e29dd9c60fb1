// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL tracker store.
//!
//! The "one open tracker per (workflow, step)" rule is the partial unique
//! index `sla_trackers_single_open`; inserts go through
//! `ON CONFLICT … DO NOTHING` against that index instead of a prior SELECT.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::repository::{OpenInsert, RepositoryError, TrackerRepository};
use crate::domain::step::StepName;
use crate::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};

/// Insert attempts before giving up when the conflicting open tracker keeps
/// closing between our insert and our read.
const MAX_INSERT_ATTEMPTS: usize = 5;

const TRACKER_COLUMNS: &str = "id, workflow_instance_id, step_name, started_at, completed_at, \
     threshold_hours, threshold_days, actual_duration_hours, status, breach_hours, \
     assignee_id, notes, updated_at";

pub struct PostgresTrackerRepository {
    pool: PgPool,
}

impl PostgresTrackerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_tracker(row: &PgRow) -> Result<SlaTracker, RepositoryError> {
    let id: uuid::Uuid = row.try_get("id")?;
    let workflow_instance_id: String = row.try_get("workflow_instance_id")?;
    let step_name: String = row.try_get("step_name")?;
    let status_str: String = row.try_get("status")?;

    let status = TrackerStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown tracker status '{}' for tracker {}", status_str, id))
    })?;

    Ok(SlaTracker {
        id: TrackerId(id),
        workflow_instance_id: WorkflowInstanceId::new(workflow_instance_id),
        step_name: StepName::from_persisted(step_name),
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        threshold_hours: row.try_get("threshold_hours")?,
        threshold_days: row.try_get("threshold_days")?,
        actual_duration_hours: row.try_get("actual_duration_hours")?,
        status,
        breach_hours: row.try_get("breach_hours")?,
        assignee_id: row.try_get("assignee_id")?,
        notes: row.try_get("notes")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TrackerRepository for PostgresTrackerRepository {
    async fn insert_if_no_open(&self, tracker: &SlaTracker) -> Result<OpenInsert, RepositoryError> {
        let insert_sql = format!(
            r#"
            INSERT INTO sla_trackers (
                id, workflow_instance_id, step_name, started_at, completed_at,
                threshold_hours, threshold_days, actual_duration_hours, status, breach_hours,
                assignee_id, notes, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (workflow_instance_id, step_name)
                WHERE completed_at IS NULL AND status <> 'cancelled'
                DO NOTHING
            RETURNING {}
            "#,
            TRACKER_COLUMNS
        );

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let inserted = sqlx::query(&insert_sql)
                .bind(tracker.id.0)
                .bind(tracker.workflow_instance_id.as_str())
                .bind(tracker.step_name.as_str())
                .bind(tracker.started_at)
                .bind(tracker.completed_at)
                .bind(tracker.threshold_hours)
                .bind(tracker.threshold_days)
                .bind(tracker.actual_duration_hours)
                .bind(tracker.status.as_str())
                .bind(tracker.breach_hours)
                .bind(&tracker.assignee_id)
                .bind(&tracker.notes)
                .bind(tracker.updated_at)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = inserted {
                return Ok(OpenInsert::Created(row_to_tracker(&row)?));
            }

            if let Some(existing) = self.find_open(&tracker.workflow_instance_id, &tracker.step_name).await? {
                return Ok(OpenInsert::Existing(existing));
            }

            debug!(
                workflow_instance_id = %tracker.workflow_instance_id,
                step_name = %tracker.step_name,
                attempt,
                "Open tracker closed between conflict and read, retrying insert"
            );
        }

        Err(RepositoryError::UniqueViolation(format!(
            "could not claim open slot for ({}, {}) after {} attempts",
            tracker.workflow_instance_id, tracker.step_name, MAX_INSERT_ATTEMPTS
        )))
    }

    async fn update_open(&self, tracker: &SlaTracker, expected: TrackerStatus) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE sla_trackers SET
                completed_at = $2,
                actual_duration_hours = $3,
                status = $4,
                breach_hours = $5,
                notes = $6,
                updated_at = $7
            WHERE id = $1
              AND completed_at IS NULL
              AND status = $8
            "#,
        )
        .bind(tracker.id.0)
        .bind(tracker.completed_at)
        .bind(tracker.actual_duration_hours)
        .bind(tracker.status.as_str())
        .bind(tracker.breach_hours)
        .bind(&tracker.notes)
        .bind(tracker.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update tracker {}: {}", tracker.id, e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: TrackerId) -> Result<Option<SlaTracker>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM sla_trackers WHERE id = $1", TRACKER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_tracker).transpose()
    }

    async fn find_open(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &StepName,
    ) -> Result<Option<SlaTracker>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM sla_trackers
            WHERE workflow_instance_id = $1
              AND step_name = $2
              AND completed_at IS NULL
              AND status <> 'cancelled'
            "#,
            TRACKER_COLUMNS
        ))
        .bind(workflow_instance_id.as_str())
        .bind(step_name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_tracker).transpose()
    }

    async fn find_all_open(&self) -> Result<Vec<SlaTracker>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM sla_trackers
            WHERE completed_at IS NULL AND status <> 'cancelled'
            ORDER BY started_at ASC
            "#,
            TRACKER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tracker).collect()
    }

    async fn find_by_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sla_trackers WHERE workflow_instance_id = $1 ORDER BY started_at ASC",
            TRACKER_COLUMNS
        ))
        .bind(workflow_instance_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tracker).collect()
    }

    async fn find_completed_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        assignee_id: Option<&str>,
    ) -> Result<Vec<SlaTracker>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM sla_trackers
            WHERE completed_at BETWEEN $1 AND $2
              AND ($3::TEXT IS NULL OR assignee_id = $3)
            ORDER BY completed_at ASC
            "#,
            TRACKER_COLUMNS
        ))
        .bind(since)
        .bind(until)
        .bind(assignee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tracker).collect()
    }
}
