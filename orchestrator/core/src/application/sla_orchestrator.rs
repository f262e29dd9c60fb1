// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SLA Orchestrator
//!
//! Service façade of the engine: starts, completes and cancels trackers,
//! recomputes in-flight metrics, maps external workflow statuses to the steps
//! that should begin timing, and produces aggregate reports.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Tracker lifecycle and read-side aggregation
//! - **Collaborators:**
//!   - Domain: SlaTracker aggregate, StepCatalog, StatusStepMapping
//!   - Application: ThresholdRegistry (threshold snapshot at start)
//!   - Infrastructure: TrackerRepository, EventBus
//!
//! # Concurrency
//!
//! No tracker state is cached between calls. Every write is a single-row
//! atomic operation on the store (`insert_if_no_open` / `update_open`), so
//! several orchestrator instances may serve the same store concurrently.
//! Writers that lose a compare-and-set re-read and retry a bounded number of
//! times.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::aggregation::{breaching_first, summarize, summarize_by_step};
use crate::application::threshold_registry::ThresholdRegistry;
use crate::domain::clock::Clock;
use crate::domain::error::SlaError;
use crate::domain::events::SlaEvent;
use crate::domain::report::{ReportScope, SlaReport, WorkflowSlaReport};
use crate::domain::repository::{OpenInsert, TrackerRepository};
use crate::domain::status_mapping::StatusStepMapping;
use crate::domain::step::{StepCatalog, StepName};
use crate::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};
use crate::infrastructure::event_bus::EventBus;

/// Compare-and-set attempts before `complete`/`cancel` report a conflict.
const MAX_CAS_ATTEMPTS: usize = 5;

/// Tracker start request
#[derive(Debug, Clone)]
pub struct StartTrackerRequest {
    pub workflow_instance_id: WorkflowInstanceId,
    pub step_name: String,
    pub assignee_id: Option<String>,
    pub notes: Option<String>,
}

impl StartTrackerRequest {
    pub fn new(workflow_instance_id: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            workflow_instance_id: WorkflowInstanceId::new(workflow_instance_id),
            step_name: step_name.into(),
            assignee_id: None,
            notes: None,
        }
    }

    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[async_trait]
pub trait SlaOrchestrator: Send + Sync {
    /// Start timing a step. Idempotent: an existing open tracker for the
    /// (workflow, step) pair is returned unchanged.
    ///
    /// # Errors
    ///
    /// - InvalidStepName: step is not in the governed set
    /// - ConfigMissing: no active threshold for the step
    async fn start(&self, request: StartTrackerRequest) -> Result<SlaTracker, SlaError>;

    /// Close the open tracker for the pair. `Ok(None)` when there is none
    /// (never started, or already completed).
    async fn complete(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<SlaTracker>, SlaError>;

    /// Cancel an open tracker. `Ok(None)` when it does not exist or is
    /// already terminal.
    async fn cancel(&self, tracker_id: TrackerId) -> Result<Option<SlaTracker>, SlaError>;

    /// Re-run the metric computation on every open tracker. Returns how many
    /// were visited.
    async fn recompute_all_open(&self) -> Result<usize, SlaError>;

    /// Open breached trackers, largest breach first, after a recompute pass
    async fn currently_breaching(&self) -> Result<Vec<SlaTracker>, SlaError>;

    /// Start every step mapped to `external_status`. Unknown statuses are a no-op.
    async fn auto_start_for_status(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        external_status: &str,
        assignee_id: Option<String>,
    ) -> Result<Vec<SlaTracker>, SlaError>;

    async fn get_tracker(&self, tracker_id: TrackerId) -> Result<Option<SlaTracker>, SlaError>;

    /// Stored trackers of one workflow instance, oldest first, without a recompute pass
    async fn trackers_for_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, SlaError>;

    /// All trackers of one workflow instance with derived counts
    async fn workflow_status(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<WorkflowSlaReport, SlaError>;

    /// Trackers completed in `[since, until]` plus all open trackers
    async fn global_metrics(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<SlaReport, SlaError>;

    /// Same as `global_metrics`, restricted to one assignee
    async fn assignee_metrics(
        &self,
        assignee_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SlaReport, SlaError>;
}

pub struct StandardSlaOrchestrator {
    registry: Arc<dyn ThresholdRegistry>,
    trackers: Arc<dyn TrackerRepository>,
    catalog: Arc<dyn StepCatalog>,
    status_mapping: StatusStepMapping,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl StandardSlaOrchestrator {
    pub fn new(
        registry: Arc<dyn ThresholdRegistry>,
        trackers: Arc<dyn TrackerRepository>,
        catalog: Arc<dyn StepCatalog>,
        status_mapping: StatusStepMapping,
        event_bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            trackers,
            catalog,
            status_mapping,
            event_bus,
            clock,
        }
    }

    fn parse_step(&self, step_name: &str) -> Result<StepName, SlaError> {
        StepName::parse(step_name, self.catalog.as_ref())
    }

    /// Recompute one open tracker and persist it if anything changed.
    ///
    /// Returns the freshest known state of the tracker. If another writer
    /// changed the row first, the stored row is re-read instead.
    async fn refresh(&self, tracker: SlaTracker, now: DateTime<Utc>) -> Result<SlaTracker, SlaError> {
        let expected = tracker.status;
        let mut updated = tracker;
        if !updated.recompute(now) {
            return Ok(updated);
        }

        if self.trackers.update_open(&updated, expected).await? {
            if expected == TrackerStatus::Pending && updated.status == TrackerStatus::Breached {
                self.record_breach(&updated, now);
            }
            return Ok(updated);
        }

        debug!(tracker_id = %updated.id, "Tracker changed during recompute, re-reading");
        Ok(self.trackers.find_by_id(updated.id).await?.unwrap_or(updated))
    }

    /// Recompute a batch of trackers, skipping (and logging) rows that fail.
    async fn refresh_all(&self, trackers: Vec<SlaTracker>, now: DateTime<Utc>) -> Vec<SlaTracker> {
        let mut refreshed = Vec::with_capacity(trackers.len());
        for tracker in trackers {
            if !tracker.is_open() {
                refreshed.push(tracker);
                continue;
            }
            let fallback = tracker.clone();
            match self.refresh(tracker, now).await {
                Ok(tracker) => refreshed.push(tracker),
                Err(e) => {
                    warn!(tracker_id = %fallback.id, error = %e, "Failed to recompute tracker, skipping");
                    metrics::counter!("sla_recompute_failures_total").increment(1);
                    refreshed.push(fallback);
                }
            }
        }
        refreshed
    }

    /// Recompute every open tracker and return the refreshed set, still open.
    async fn refresh_open(&self) -> Result<Vec<SlaTracker>, SlaError> {
        let now = self.clock.now();
        let open = self.trackers.find_all_open().await?;
        let refreshed: Vec<SlaTracker> = self
            .refresh_all(open, now)
            .await
            .into_iter()
            .filter(SlaTracker::is_open)
            .collect();
        metrics::gauge!("sla_open_trackers").set(refreshed.len() as f64);
        Ok(refreshed)
    }

    fn record_breach(&self, tracker: &SlaTracker, now: DateTime<Utc>) {
        warn!(
            tracker_id = %tracker.id,
            workflow_instance_id = %tracker.workflow_instance_id,
            step_name = %tracker.step_name,
            breach_hours = tracker.breach_hours,
            "SLA breach detected"
        );
        metrics::counter!("sla_breaches_detected_total", "step" => tracker.step_name.to_string()).increment(1);
        self.event_bus.publish(SlaEvent::breach_detected(tracker, now));
    }

    async fn windowed_report(
        &self,
        scope: ReportScope,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SlaReport, SlaError> {
        if since > until {
            return Err(SlaError::InvalidReportWindow { since, until });
        }

        let assignee = match &scope {
            ReportScope::Global => None,
            ReportScope::Assignee(id) => Some(id.as_str()),
        };

        let open: Vec<SlaTracker> = self
            .refresh_open()
            .await?
            .into_iter()
            .filter(|t| assignee.map_or(true, |a| t.assignee_id.as_deref() == Some(a)))
            .collect();
        let completed = self.trackers.find_completed_between(since, until, assignee).await?;

        // A tracker closed between the two reads is in both sets; the closed row wins.
        let closed_ids: HashSet<TrackerId> = completed.iter().map(|t| t.id).collect();
        let open: Vec<SlaTracker> = open.into_iter().filter(|t| !closed_ids.contains(&t.id)).collect();

        let currently_breaching = breaching_first(&open);
        let mut population = completed;
        population.extend(open);

        Ok(SlaReport {
            scope,
            since,
            until,
            generated_at: self.clock.now(),
            overall: summarize(&population),
            by_step: summarize_by_step(&population),
            currently_breaching,
        })
    }
}

#[async_trait]
impl SlaOrchestrator for StandardSlaOrchestrator {
    async fn start(&self, request: StartTrackerRequest) -> Result<SlaTracker, SlaError> {
        let step = self.parse_step(&request.step_name)?;

        if let Some(existing) = self.trackers.find_open(&request.workflow_instance_id, &step).await? {
            debug!(tracker_id = %existing.id, "Open tracker already exists, start is a no-op");
            return Ok(existing);
        }

        let threshold = self
            .registry
            .get(step.as_str())
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| SlaError::ConfigMissing(step.to_string()))?;

        let candidate = SlaTracker::start(
            request.workflow_instance_id,
            &threshold,
            request.assignee_id,
            request.notes,
            self.clock.now(),
        );

        match self.trackers.insert_if_no_open(&candidate).await? {
            OpenInsert::Created(tracker) => {
                info!(
                    tracker_id = %tracker.id,
                    workflow_instance_id = %tracker.workflow_instance_id,
                    step_name = %tracker.step_name,
                    threshold_hours = tracker.threshold_hours,
                    "SLA tracker started"
                );
                metrics::counter!("sla_trackers_started_total").increment(1);
                self.event_bus.publish(SlaEvent::started(&tracker));
                Ok(tracker)
            }
            OpenInsert::Existing(tracker) => {
                debug!(tracker_id = %tracker.id, "Lost start race, returning winning tracker");
                Ok(tracker)
            }
        }
    }

    async fn complete(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<SlaTracker>, SlaError> {
        let step = self.parse_step(step_name)?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(open) = self.trackers.find_open(workflow_instance_id, &step).await? else {
                debug!(%workflow_instance_id, step_name = %step, "No open tracker to complete");
                return Ok(None);
            };

            let now = self.clock.now();
            let expected = open.status;
            let mut closed = open;
            closed.close(completed_at.unwrap_or(now), now)?;

            if self.trackers.update_open(&closed, expected).await? {
                info!(
                    tracker_id = %closed.id,
                    workflow_instance_id = %closed.workflow_instance_id,
                    step_name = %closed.step_name,
                    status = %closed.status,
                    actual_duration_hours = closed.actual_duration_hours.unwrap_or_default(),
                    breach_hours = closed.breach_hours,
                    "SLA tracker completed"
                );
                metrics::counter!("sla_trackers_completed_total", "outcome" => closed.status.as_str())
                    .increment(1);
                if closed.status == TrackerStatus::Breached && expected != TrackerStatus::Breached {
                    self.record_breach(&closed, now);
                }
                self.event_bus.publish(SlaEvent::completed(&closed));
                return Ok(Some(closed));
            }

            debug!(tracker_id = %closed.id, attempt, "Tracker changed before completion, retrying");
        }

        Err(SlaError::Conflict(format!(
            "could not complete ({}, {}) after {} attempts",
            workflow_instance_id, step, MAX_CAS_ATTEMPTS
        )))
    }

    async fn cancel(&self, tracker_id: TrackerId) -> Result<Option<SlaTracker>, SlaError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(tracker) = self.trackers.find_by_id(tracker_id).await? else {
                return Ok(None);
            };

            let expected = tracker.status;
            let mut cancelled = tracker;
            if !cancelled.cancel(self.clock.now()) {
                debug!(%tracker_id, status = %expected, "Tracker is terminal, cancel is a no-op");
                return Ok(None);
            }

            if self.trackers.update_open(&cancelled, expected).await? {
                info!(
                    %tracker_id,
                    workflow_instance_id = %cancelled.workflow_instance_id,
                    step_name = %cancelled.step_name,
                    "SLA tracker cancelled"
                );
                metrics::counter!("sla_trackers_cancelled_total").increment(1);
                self.event_bus.publish(SlaEvent::cancelled(&cancelled));
                return Ok(Some(cancelled));
            }

            debug!(%tracker_id, attempt, "Tracker changed before cancellation, retrying");
        }

        Err(SlaError::Conflict(format!(
            "could not cancel tracker {} after {} attempts",
            tracker_id, MAX_CAS_ATTEMPTS
        )))
    }

    async fn recompute_all_open(&self) -> Result<usize, SlaError> {
        let now = self.clock.now();
        let open = self.trackers.find_all_open().await?;
        let visited = open.len();
        let still_open = self
            .refresh_all(open, now)
            .await
            .iter()
            .filter(|t| t.is_open())
            .count();
        metrics::gauge!("sla_open_trackers").set(still_open as f64);
        debug!(visited, still_open, "Recomputed open SLA trackers");
        Ok(visited)
    }

    async fn currently_breaching(&self) -> Result<Vec<SlaTracker>, SlaError> {
        let open = self.refresh_open().await?;
        Ok(breaching_first(&open))
    }

    async fn auto_start_for_status(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        external_status: &str,
        assignee_id: Option<String>,
    ) -> Result<Vec<SlaTracker>, SlaError> {
        let steps = self.status_mapping.steps_for(external_status);
        if steps.is_empty() {
            debug!(%workflow_instance_id, external_status, "No steps mapped to status");
            return Ok(Vec::new());
        }

        let mut started = Vec::with_capacity(steps.len());
        for step in steps {
            let tracker = self
                .start(StartTrackerRequest {
                    workflow_instance_id: workflow_instance_id.clone(),
                    step_name: step.to_string(),
                    assignee_id: assignee_id.clone(),
                    notes: Some(format!("Auto-started on status '{}'", external_status)),
                })
                .await?;
            started.push(tracker);
        }
        Ok(started)
    }

    async fn get_tracker(&self, tracker_id: TrackerId) -> Result<Option<SlaTracker>, SlaError> {
        Ok(self.trackers.find_by_id(tracker_id).await?)
    }

    async fn trackers_for_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, SlaError> {
        Ok(self.trackers.find_by_workflow(workflow_instance_id).await?)
    }

    async fn workflow_status(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<WorkflowSlaReport, SlaError> {
        let now = self.clock.now();
        let trackers = self.trackers.find_by_workflow(workflow_instance_id).await?;
        let trackers = self.refresh_all(trackers, now).await;
        let cancelled = trackers
            .iter()
            .filter(|t| t.status == TrackerStatus::Cancelled)
            .count();
        let breaching = trackers
            .iter()
            .filter(|t| t.is_open() && t.status == TrackerStatus::Breached)
            .count();

        Ok(WorkflowSlaReport {
            workflow_instance_id: workflow_instance_id.clone(),
            generated_at: now,
            metrics: summarize(&trackers),
            trackers,
            cancelled,
            breaching,
        })
    }

    async fn global_metrics(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<SlaReport, SlaError> {
        self.windowed_report(ReportScope::Global, since, until).await
    }

    async fn assignee_metrics(
        &self,
        assignee_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SlaReport, SlaError> {
        self.windowed_report(ReportScope::Assignee(assignee_id.to_string()), since, until)
            .await
    }
}
