// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SLA Tracker Aggregate
//!
//! One timed instance of a step for one workflow instance, plus the metric
//! computation that derives its duration, status and breach hours.
//!
//! # State machine
//!
//! ```text
//!   start ──► Pending ◄──recompute──► Breached        (open)
//!                │  \                  │   \
//!          close │   cancel       close│    cancel
//!                ▼     ▼               ▼     ▼
//!         Completed | Breached     Breached  Cancelled (terminal)
//! ```
//!
//! An open tracker's status is recomputed, not transitioned: every metric pass
//! derives it afresh from `now`. Closing resolves to exactly `Completed` or
//! `Breached`. Thresholds are snapshotted at start and never re-read.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tracker lifecycle and metric arithmetic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::SlaError;
use crate::domain::step::StepName;
use crate::domain::threshold::StepThreshold;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerId(pub Uuid);

impl TrackerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the workflow instance being timed. Never resolved or
/// validated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowInstanceId(String);

impl WorkflowInstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkflowInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkflowInstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerStatus {
    Pending,
    Completed,
    Breached,
    Cancelled,
}

impl TrackerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Pending => "pending",
            TrackerStatus::Completed => "completed",
            TrackerStatus::Breached => "breached",
            TrackerStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TrackerStatus::Pending),
            "completed" => Some(TrackerStatus::Completed),
            "breached" => Some(TrackerStatus::Breached),
            "cancelled" => Some(TrackerStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one metric pass over a tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerMetrics {
    pub duration_hours: f64,
    pub duration_days: f64,
    pub status: TrackerStatus,
    pub breach_hours: f64,
}

/// Derive duration, status and breach hours.
///
/// `end` is `completed_at` when set, otherwise `now`. Negative spans (clock
/// skew between engine instances) count as zero.
pub fn compute_metrics(
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    threshold_hours: i64,
    now: DateTime<Utc>,
) -> TrackerMetrics {
    let end = completed_at.unwrap_or(now);
    let duration_hours =
        ((end - started_at).num_milliseconds() as f64 / MILLIS_PER_HOUR).max(0.0);
    let threshold = threshold_hours as f64;

    let (status, breach_hours) = match completed_at {
        Some(_) if duration_hours <= threshold => (TrackerStatus::Completed, 0.0),
        Some(_) => (TrackerStatus::Breached, duration_hours - threshold),
        None if duration_hours > threshold => (TrackerStatus::Breached, duration_hours - threshold),
        None => (TrackerStatus::Pending, 0.0),
    };

    TrackerMetrics {
        duration_hours,
        duration_days: duration_hours / 24.0,
        status,
        breach_hours,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaTracker {
    pub id: TrackerId,
    pub workflow_instance_id: WorkflowInstanceId,
    pub step_name: StepName,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub threshold_hours: i64,
    pub threshold_days: i64,
    pub actual_duration_hours: Option<f64>,
    pub status: TrackerStatus,
    pub breach_hours: f64,
    pub assignee_id: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SlaTracker {
    /// Open a new tracker, snapshotting the threshold values.
    pub fn start(
        workflow_instance_id: WorkflowInstanceId,
        threshold: &StepThreshold,
        assignee_id: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TrackerId::new(),
            workflow_instance_id,
            step_name: threshold.step_name.clone(),
            started_at: now,
            completed_at: None,
            threshold_hours: threshold.threshold_hours,
            threshold_days: threshold.threshold_days,
            actual_duration_hours: None,
            status: TrackerStatus::Pending,
            breach_hours: 0.0,
            assignee_id,
            notes,
            updated_at: now,
        }
    }

    /// Open means not completed and not cancelled.
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none() && self.status != TrackerStatus::Cancelled
    }

    pub fn actual_duration_days(&self) -> Option<f64> {
        self.actual_duration_hours.map(|hours| hours / 24.0)
    }

    pub fn metrics(&self, now: DateTime<Utc>) -> TrackerMetrics {
        compute_metrics(self.started_at, self.completed_at, self.threshold_hours, now)
    }

    /// Refresh the stored metric fields of an open tracker.
    ///
    /// Returns `true` when any stored field changed. Cancelled trackers are
    /// left untouched.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TrackerStatus::Cancelled {
            return false;
        }
        let metrics = self.metrics(now);
        // An earlier pass saw a later clock; a breach is never withdrawn.
        if self.status == TrackerStatus::Breached && metrics.status == TrackerStatus::Pending {
            return false;
        }
        let changed = self.actual_duration_hours != Some(metrics.duration_hours)
            || self.status != metrics.status
            || self.breach_hours != metrics.breach_hours;
        if changed {
            self.actual_duration_hours = Some(metrics.duration_hours);
            self.status = metrics.status;
            self.breach_hours = metrics.breach_hours;
            self.updated_at = now;
        }
        changed
    }

    /// Close the tracker at `completed_at` and run the final metric pass.
    pub fn close(&mut self, completed_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), SlaError> {
        if completed_at < self.started_at {
            return Err(SlaError::InvalidCompletionTime {
                started_at: self.started_at,
                completed_at,
            });
        }
        self.completed_at = Some(completed_at);
        let metrics = self.metrics(now);
        self.actual_duration_hours = Some(metrics.duration_hours);
        self.status = metrics.status;
        self.breach_hours = metrics.breach_hours;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel an open tracker. Returns `false` if it was already terminal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = TrackerStatus::Cancelled;
        self.breach_hours = 0.0;
        self.updated_at = now;
        true
    }
}
