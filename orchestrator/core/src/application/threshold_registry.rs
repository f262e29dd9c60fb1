// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Threshold Registry
//!
//! Application service holding, per named step, the allowed duration and
//! whether it is currently enforced.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Lookup, administrative upsert, soft-deactivation and
//!   idempotent seeding of step thresholds
//! - **Collaborators:**
//!   - Domain: StepThreshold aggregate, StepCatalog
//!   - Infrastructure: ThresholdRepository

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::domain::clock::Clock;
use crate::domain::error::SlaError;
use crate::domain::repository::ThresholdRepository;
use crate::domain::sla_config::StepDefinition;
use crate::domain::step::{StepCatalog, StepName};
use crate::domain::threshold::{sort_by_priority, StepThreshold};

/// Administrative upsert request
#[derive(Debug, Clone)]
pub struct UpsertThresholdRequest {
    pub step_name: String,
    pub threshold_hours: i64,
    /// Defaults to `threshold_hours / 24`
    pub threshold_days: Option<i64>,
    pub description: Option<String>,
    /// Only applied when the record is created
    pub priority: Option<i32>,
}

#[async_trait]
pub trait ThresholdRegistry: Send + Sync {
    /// Threshold record for a step, active or not. `None` when never configured.
    async fn get(&self, step_name: &str) -> Result<Option<StepThreshold>, SlaError>;

    /// Active thresholds ordered by priority, then step name
    async fn list_active(&self) -> Result<Vec<StepThreshold>, SlaError>;

    /// Every threshold record, including deactivated ones
    async fn list_all(&self) -> Result<Vec<StepThreshold>, SlaError>;

    /// Create or update in place
    ///
    /// # Errors
    ///
    /// - InvalidStepName: step is not in the governed set
    /// - InvalidThreshold: negative hours or days
    async fn upsert(&self, request: UpsertThresholdRequest) -> Result<StepThreshold, SlaError>;

    /// Soft-deactivate. Returns the updated record, or `None` if absent.
    async fn deactivate(&self, step_name: &str) -> Result<Option<StepThreshold>, SlaError>;

    /// Populate defaults if and only if the registry is empty.
    /// Returns how many records were written.
    async fn seed_defaults(&self) -> Result<usize, SlaError>;
}

pub struct StandardThresholdRegistry {
    repository: Arc<dyn ThresholdRepository>,
    catalog: Arc<dyn StepCatalog>,
    defaults: Vec<StepDefinition>,
    clock: Arc<dyn Clock>,
}

impl StandardThresholdRegistry {
    pub fn new(
        repository: Arc<dyn ThresholdRepository>,
        catalog: Arc<dyn StepCatalog>,
        defaults: Vec<StepDefinition>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            catalog,
            defaults,
            clock,
        }
    }

    fn parse_step(&self, step_name: &str) -> Result<StepName, SlaError> {
        StepName::parse(step_name, self.catalog.as_ref())
    }

    fn default_priority(&self, step_name: &StepName) -> i32 {
        self.defaults
            .iter()
            .find(|d| d.name == step_name.as_str())
            .map(|d| d.priority)
            .unwrap_or(100)
    }
}

#[async_trait]
impl ThresholdRegistry for StandardThresholdRegistry {
    async fn get(&self, step_name: &str) -> Result<Option<StepThreshold>, SlaError> {
        let step = self.parse_step(step_name)?;
        Ok(self.repository.find_by_step(&step).await?)
    }

    async fn list_active(&self) -> Result<Vec<StepThreshold>, SlaError> {
        let mut active: Vec<StepThreshold> = self
            .repository
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.active)
            .collect();
        sort_by_priority(&mut active);
        Ok(active)
    }

    async fn list_all(&self) -> Result<Vec<StepThreshold>, SlaError> {
        let mut all = self.repository.list_all().await?;
        sort_by_priority(&mut all);
        Ok(all)
    }

    async fn upsert(&self, request: UpsertThresholdRequest) -> Result<StepThreshold, SlaError> {
        let step = self.parse_step(&request.step_name)?;
        let now = self.clock.now();
        let days = request
            .threshold_days
            .unwrap_or_else(|| StepThreshold::days_for_hours(request.threshold_hours));

        let threshold = match self.repository.find_by_step(&step).await? {
            Some(mut existing) => {
                existing.update(request.threshold_hours, days, request.description, now)?;
                existing
            }
            None => {
                let priority = request.priority.unwrap_or_else(|| self.default_priority(&step));
                StepThreshold::new(step, request.threshold_hours, days, priority, request.description, now)?
            }
        };

        self.repository.save(&threshold).await?;

        info!(
            step_name = %threshold.step_name,
            threshold_hours = threshold.threshold_hours,
            "SLA threshold upserted"
        );

        Ok(threshold)
    }

    async fn deactivate(&self, step_name: &str) -> Result<Option<StepThreshold>, SlaError> {
        let step = self.parse_step(step_name)?;
        let Some(mut threshold) = self.repository.find_by_step(&step).await? else {
            return Ok(None);
        };
        if threshold.active {
            threshold.deactivate(self.clock.now());
            self.repository.save(&threshold).await?;
            info!(step_name = %threshold.step_name, "SLA threshold deactivated");
        }
        Ok(Some(threshold))
    }

    async fn seed_defaults(&self) -> Result<usize, SlaError> {
        if self.repository.count().await? > 0 {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut seeded = 0;
        for definition in &self.defaults {
            let step = self.parse_step(&definition.name)?;
            let threshold = StepThreshold::new(
                step,
                definition.threshold_hours,
                definition.days(),
                definition.priority,
                definition.description.clone(),
                now,
            )?;
            self.repository.save(&threshold).await?;
            seeded += 1;
        }

        info!(count = seeded, "Seeded default SLA thresholds");
        Ok(seeded)
    }
}
