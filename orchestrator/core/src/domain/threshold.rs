// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Step Threshold Aggregate
//!
//! The allowed duration (SLA) for one named step. Identity is the step name;
//! values are updated in place and records are never hard-deleted, only
//! soft-deactivated.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Per-step SLA configuration record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::SlaError;
use crate::domain::step::StepName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepThreshold {
    pub step_name: StepName,
    pub threshold_hours: i64,
    /// Display-only companion of `threshold_hours`
    pub threshold_days: i64,
    /// Default ordering key, lower first
    pub priority: i32,
    pub active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StepThreshold {
    pub fn new(
        step_name: StepName,
        threshold_hours: i64,
        threshold_days: i64,
        priority: i32,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, SlaError> {
        validate_hours(threshold_hours)?;
        validate_days(threshold_days)?;
        Ok(Self {
            step_name,
            threshold_hours,
            threshold_days,
            priority,
            active: true,
            description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite the values in place and re-activate the record.
    ///
    /// A `None` description keeps the existing one.
    pub fn update(
        &mut self,
        threshold_hours: i64,
        threshold_days: i64,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SlaError> {
        validate_hours(threshold_hours)?;
        validate_days(threshold_days)?;
        self.threshold_hours = threshold_hours;
        self.threshold_days = threshold_days;
        if description.is_some() {
            self.description = description;
        }
        self.active = true;
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    /// Days derived from hours, rounded down, for callers that only supply hours.
    pub fn days_for_hours(threshold_hours: i64) -> i64 {
        threshold_hours / 24
    }
}

fn validate_hours(threshold_hours: i64) -> Result<(), SlaError> {
    if threshold_hours < 0 {
        return Err(SlaError::InvalidThreshold(format!(
            "threshold_hours must be >= 0, got {}",
            threshold_hours
        )));
    }
    Ok(())
}

fn validate_days(threshold_days: i64) -> Result<(), SlaError> {
    if threshold_days < 0 {
        return Err(SlaError::InvalidThreshold(format!(
            "threshold_days must be >= 0, got {}",
            threshold_days
        )));
    }
    Ok(())
}

/// Order used by `list_active`: priority ascending, then step name.
pub fn sort_by_priority(thresholds: &mut [StepThreshold]) {
    thresholds.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.step_name.cmp(&b.step_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> StepName {
        StepName::from_persisted(name)
    }

    #[test]
    fn test_negative_hours_rejected() {
        let err = StepThreshold::new(step("a"), -1, 0, 1, None, Utc::now()).unwrap_err();
        assert!(matches!(err, SlaError::InvalidThreshold(_)));
    }

    #[test]
    fn test_update_reactivates_and_keeps_description() {
        let now = Utc::now();
        let mut threshold =
            StepThreshold::new(step("a"), 24, 1, 1, Some("first".into()), now).unwrap();
        threshold.deactivate(now);
        assert!(!threshold.active);

        threshold.update(48, 2, None, now).unwrap();
        assert!(threshold.active);
        assert_eq!(threshold.threshold_hours, 48);
        assert_eq!(threshold.description.as_deref(), Some("first"));
    }

    #[test]
    fn test_sort_by_priority_then_name() {
        let now = Utc::now();
        let mut list = vec![
            StepThreshold::new(step("zeta"), 1, 0, 1, None, now).unwrap(),
            StepThreshold::new(step("beta"), 1, 0, 2, None, now).unwrap(),
            StepThreshold::new(step("alpha"), 1, 0, 1, None, now).unwrap(),
        ];
        sort_by_priority(&mut list);
        let names: Vec<_> = list.iter().map(|t| t.step_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta", "beta"]);
    }
}
