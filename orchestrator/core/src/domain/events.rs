// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! SLA domain events
//!
//! Published on the event bus for downstream notifiers. The engine itself
//! never delivers notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::step::StepName;
use crate::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlaEvent {
    TrackerStarted {
        tracker_id: TrackerId,
        workflow_instance_id: WorkflowInstanceId,
        step_name: StepName,
        threshold_hours: i64,
        assignee_id: Option<String>,
        started_at: DateTime<Utc>,
    },
    /// Emitted once per tracker, by the writer that first persisted the breach.
    BreachDetected {
        tracker_id: TrackerId,
        workflow_instance_id: WorkflowInstanceId,
        step_name: StepName,
        assignee_id: Option<String>,
        threshold_hours: i64,
        breach_hours: f64,
        still_open: bool,
        detected_at: DateTime<Utc>,
    },
    TrackerCompleted {
        tracker_id: TrackerId,
        workflow_instance_id: WorkflowInstanceId,
        step_name: StepName,
        status: TrackerStatus,
        actual_duration_hours: f64,
        breach_hours: f64,
        completed_at: DateTime<Utc>,
    },
    TrackerCancelled {
        tracker_id: TrackerId,
        workflow_instance_id: WorkflowInstanceId,
        step_name: StepName,
        cancelled_at: DateTime<Utc>,
    },
}

impl SlaEvent {
    pub fn started(tracker: &SlaTracker) -> Self {
        SlaEvent::TrackerStarted {
            tracker_id: tracker.id,
            workflow_instance_id: tracker.workflow_instance_id.clone(),
            step_name: tracker.step_name.clone(),
            threshold_hours: tracker.threshold_hours,
            assignee_id: tracker.assignee_id.clone(),
            started_at: tracker.started_at,
        }
    }

    pub fn breach_detected(tracker: &SlaTracker, detected_at: DateTime<Utc>) -> Self {
        SlaEvent::BreachDetected {
            tracker_id: tracker.id,
            workflow_instance_id: tracker.workflow_instance_id.clone(),
            step_name: tracker.step_name.clone(),
            assignee_id: tracker.assignee_id.clone(),
            threshold_hours: tracker.threshold_hours,
            breach_hours: tracker.breach_hours,
            still_open: tracker.completed_at.is_none(),
            detected_at,
        }
    }

    pub fn completed(tracker: &SlaTracker) -> Self {
        SlaEvent::TrackerCompleted {
            tracker_id: tracker.id,
            workflow_instance_id: tracker.workflow_instance_id.clone(),
            step_name: tracker.step_name.clone(),
            status: tracker.status,
            actual_duration_hours: tracker.actual_duration_hours.unwrap_or_default(),
            breach_hours: tracker.breach_hours,
            completed_at: tracker.completed_at.unwrap_or(tracker.updated_at),
        }
    }

    pub fn cancelled(tracker: &SlaTracker) -> Self {
        SlaEvent::TrackerCancelled {
            tracker_id: tracker.id,
            workflow_instance_id: tracker.workflow_instance_id.clone(),
            step_name: tracker.step_name.clone(),
            cancelled_at: tracker.updated_at,
        }
    }

    pub fn tracker_id(&self) -> TrackerId {
        match self {
            SlaEvent::TrackerStarted { tracker_id, .. }
            | SlaEvent::BreachDetected { tracker_id, .. }
            | SlaEvent::TrackerCompleted { tracker_id, .. }
            | SlaEvent::TrackerCancelled { tracker_id, .. } => *tracker_id,
        }
    }

    pub fn workflow_instance_id(&self) -> &WorkflowInstanceId {
        match self {
            SlaEvent::TrackerStarted { workflow_instance_id, .. }
            | SlaEvent::BreachDetected { workflow_instance_id, .. }
            | SlaEvent::TrackerCompleted { workflow_instance_id, .. }
            | SlaEvent::TrackerCancelled { workflow_instance_id, .. } => workflow_instance_id,
        }
    }
}
