// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-side report shapes returned by the orchestrator.
//!
//! Reports are eventually-consistent snapshots: a tracker may be recomputed
//! by a concurrent sweep while a report is being assembled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::step::StepName;
use crate::domain::tracker::{SlaTracker, WorkflowInstanceId};

/// Counts and averages over a set of non-cancelled trackers.
///
/// Open trackers count toward `total`, `open`, `breached` and
/// `total_breach_hours`, never toward the averages or compliance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaMetrics {
    pub total: usize,
    /// Closed trackers, on time or breached
    pub completed: usize,
    pub on_time: usize,
    /// Breached trackers, closed late or still open past their threshold
    pub breached: usize,
    pub open: usize,
    /// `on_time / completed * 100`, 0 when nothing completed
    pub compliance_percentage: f64,
    pub average_turnaround_hours: f64,
    pub average_turnaround_days: f64,
    pub total_breach_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step_name: StepName,
    #[serde(flatten)]
    pub metrics: SlaMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "assignee_id", rename_all = "snake_case")]
pub enum ReportScope {
    Global,
    Assignee(String),
}

/// Windowed report: trackers completed in `[since, until]` plus every open tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaReport {
    pub scope: ReportScope,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub overall: SlaMetrics,
    /// Sorted by step name
    pub by_step: Vec<StepMetrics>,
    /// Open breached trackers, largest breach first
    pub currently_breaching: Vec<SlaTracker>,
}

/// Every tracker of one workflow instance with derived counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSlaReport {
    pub workflow_instance_id: WorkflowInstanceId,
    pub generated_at: DateTime<Utc>,
    pub trackers: Vec<SlaTracker>,
    /// Computed over non-cancelled trackers
    pub metrics: SlaMetrics,
    pub cancelled: usize,
    /// Open trackers currently past their threshold
    pub breaching: usize,
}
