// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, ThresholdRepository};
use crate::domain::step::StepName;
use crate::domain::threshold::StepThreshold;

pub struct PostgresThresholdRepository {
    pool: PgPool,
}

impl PostgresThresholdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_threshold(row: &PgRow) -> Result<StepThreshold, RepositoryError> {
    let step_name: String = row.try_get("step_name")?;
    Ok(StepThreshold {
        step_name: StepName::from_persisted(step_name),
        threshold_hours: row.try_get("threshold_hours")?,
        threshold_days: row.try_get("threshold_days")?,
        priority: row.try_get("priority")?,
        active: row.try_get("active")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ThresholdRepository for PostgresThresholdRepository {
    async fn save(&self, threshold: &StepThreshold) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO step_thresholds (
                step_name, threshold_hours, threshold_days, priority,
                active, description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (step_name) DO UPDATE SET
                threshold_hours = EXCLUDED.threshold_hours,
                threshold_days = EXCLUDED.threshold_days,
                priority = EXCLUDED.priority,
                active = EXCLUDED.active,
                description = EXCLUDED.description,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(threshold.step_name.as_str())
        .bind(threshold.threshold_hours)
        .bind(threshold.threshold_days)
        .bind(threshold.priority)
        .bind(threshold.active)
        .bind(&threshold.description)
        .bind(threshold.created_at)
        .bind(threshold.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save step threshold: {}", e)))?;

        Ok(())
    }

    async fn find_by_step(&self, step_name: &StepName) -> Result<Option<StepThreshold>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT step_name, threshold_hours, threshold_days, priority,
                   active, description, created_at, updated_at
            FROM step_thresholds
            WHERE step_name = $1
            "#,
        )
        .bind(step_name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_threshold).transpose()
    }

    async fn list_all(&self) -> Result<Vec<StepThreshold>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT step_name, threshold_hours, threshold_days, priority,
                   active, description, created_at, updated_at
            FROM step_thresholds
            ORDER BY priority ASC, step_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_threshold).collect()
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM step_thresholds")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
