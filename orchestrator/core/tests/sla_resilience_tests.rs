// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestrator behaviour when the tracker store misbehaves: failing rows,
//! writers that keep losing the compare-and-set, and trackers that close
//! while a report is being assembled.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use sla_engine_core::application::repository_factory::SlaRepositories;
use sla_engine_core::application::{SlaEngine, StartTrackerRequest, UpsertThresholdRequest};
use sla_engine_core::domain::clock::ManualClock;
use sla_engine_core::domain::error::SlaError;
use sla_engine_core::domain::repository::{OpenInsert, RepositoryError, TrackerRepository};
use sla_engine_core::domain::sla_config::SlaConfigManifest;
use sla_engine_core::domain::step::StepName;
use sla_engine_core::domain::tracker::{SlaTracker, TrackerId, TrackerStatus, WorkflowInstanceId};
use sla_engine_core::infrastructure::repositories::{InMemoryThresholdRepository, InMemoryTrackerRepository};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// In-memory tracker store with switchable faults.
#[derive(Default)]
struct FaultyTrackers {
    inner: InMemoryTrackerRepository,
    /// `update_open` fails with a database error for this tracker
    failing_id: Mutex<Option<TrackerId>>,
    /// `update_open` reports a lost compare-and-set for every row
    reject_writes: AtomicBool,
    write_attempts: AtomicUsize,
    /// The next `find_completed_between` first closes every open tracker at this instant
    close_before_window_read: Mutex<Option<DateTime<Utc>>>,
}

#[async_trait]
impl TrackerRepository for FaultyTrackers {
    async fn insert_if_no_open(&self, tracker: &SlaTracker) -> Result<OpenInsert, RepositoryError> {
        self.inner.insert_if_no_open(tracker).await
    }

    async fn update_open(&self, tracker: &SlaTracker, expected: TrackerStatus) -> Result<bool, RepositoryError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if *self.failing_id.lock() == Some(tracker.id) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.update_open(tracker, expected).await
    }

    async fn find_by_id(&self, id: TrackerId) -> Result<Option<SlaTracker>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_open(
        &self,
        workflow_instance_id: &WorkflowInstanceId,
        step_name: &StepName,
    ) -> Result<Option<SlaTracker>, RepositoryError> {
        self.inner.find_open(workflow_instance_id, step_name).await
    }

    async fn find_all_open(&self) -> Result<Vec<SlaTracker>, RepositoryError> {
        self.inner.find_all_open().await
    }

    async fn find_by_workflow(&self, workflow_instance_id: &WorkflowInstanceId) -> Result<Vec<SlaTracker>, RepositoryError> {
        self.inner.find_by_workflow(workflow_instance_id).await
    }

    async fn find_completed_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        assignee_id: Option<&str>,
    ) -> Result<Vec<SlaTracker>, RepositoryError> {
        let close_at = self.close_before_window_read.lock().take();
        if let Some(at) = close_at {
            for open in self.inner.find_all_open().await? {
                let expected = open.status;
                let mut closed = open;
                closed
                    .close(at, at)
                    .map_err(|e| RepositoryError::Unknown(e.to_string()))?;
                self.inner.update_open(&closed, expected).await?;
            }
        }
        self.inner.find_completed_between(since, until, assignee_id).await
    }
}

struct Harness {
    engine: SlaEngine,
    clock: Arc<ManualClock>,
    trackers: Arc<FaultyTrackers>,
}

async fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let trackers = Arc::new(FaultyTrackers::default());
    let repositories = SlaRepositories {
        thresholds: Arc::new(InMemoryThresholdRepository::new()),
        trackers: trackers.clone(),
    };
    let engine = SlaEngine::from_parts(&SlaConfigManifest::default(), repositories, clock.clone()).unwrap();
    engine
        .registry
        .upsert(UpsertThresholdRequest {
            step_name: "client_review".to_string(),
            threshold_hours: 24,
            threshold_days: None,
            description: None,
            priority: None,
        })
        .await
        .unwrap();
    Harness { engine, clock, trackers }
}

async fn start(h: &Harness, workflow: &str) -> SlaTracker {
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new(workflow, "client_review"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_recompute_skips_failing_row() {
    let h = harness().await;
    let failing = start(&h, "REQ-A").await;
    let healthy = start(&h, "REQ-B").await;
    h.clock.advance(Duration::hours(30));
    *h.trackers.failing_id.lock() = Some(failing.id);

    assert_eq!(h.engine.orchestrator.recompute_all_open().await.unwrap(), 2);

    let stored_healthy = h.trackers.inner.find_by_id(healthy.id).await.unwrap().unwrap();
    assert_eq!(stored_healthy.status, TrackerStatus::Breached);
    assert!((stored_healthy.breach_hours - 6.0).abs() < 1e-9);

    let stored_failing = h.trackers.inner.find_by_id(failing.id).await.unwrap().unwrap();
    assert_eq!(stored_failing.status, TrackerStatus::Pending);

    let breaching = h.engine.orchestrator.currently_breaching().await.unwrap();
    assert_eq!(breaching.len(), 1);
    assert_eq!(breaching[0].id, healthy.id);

    let report = h
        .engine
        .orchestrator
        .global_metrics(t0(), t0() + Duration::hours(48))
        .await
        .unwrap();
    assert_eq!(report.overall.open, 2);

    *h.trackers.failing_id.lock() = None;
    assert_eq!(h.engine.orchestrator.currently_breaching().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_complete_gives_up_after_repeated_lost_writes() {
    let h = harness().await;
    start(&h, "REQ-1").await;
    h.clock.advance(Duration::hours(2));
    h.trackers.reject_writes.store(true, Ordering::SeqCst);
    let before = h.trackers.write_attempts.load(Ordering::SeqCst);

    let result = h
        .engine
        .orchestrator
        .complete(&WorkflowInstanceId::new("REQ-1"), "client_review", None)
        .await;
    assert!(matches!(result, Err(SlaError::Conflict(_))));
    assert_eq!(h.trackers.write_attempts.load(Ordering::SeqCst) - before, 5);

    let still_open = h
        .engine
        .orchestrator
        .workflow_status(&WorkflowInstanceId::new("REQ-1"))
        .await
        .unwrap();
    assert_eq!(still_open.metrics.open, 1);
}

#[tokio::test]
async fn test_cancel_gives_up_after_repeated_lost_writes() {
    let h = harness().await;
    let tracker = start(&h, "REQ-1").await;
    h.trackers.reject_writes.store(true, Ordering::SeqCst);

    let result = h.engine.orchestrator.cancel(tracker.id).await;
    assert!(matches!(result, Err(SlaError::Conflict(_))));
}

#[tokio::test]
async fn test_store_failure_on_complete_is_propagated() {
    let h = harness().await;
    let tracker = start(&h, "REQ-1").await;
    *h.trackers.failing_id.lock() = Some(tracker.id);

    let result = h
        .engine
        .orchestrator
        .complete(&WorkflowInstanceId::new("REQ-1"), "client_review", None)
        .await;
    assert!(matches!(result, Err(SlaError::Repository(RepositoryError::Database(_)))));
}

#[tokio::test]
async fn test_tracker_closed_during_report_is_counted_once() {
    let h = harness().await;
    let tracker = start(&h, "REQ-1").await;
    h.clock.advance(Duration::hours(2));
    *h.trackers.close_before_window_read.lock() = Some(t0() + Duration::hours(2));

    let report = h
        .engine
        .orchestrator
        .global_metrics(t0(), t0() + Duration::hours(48))
        .await
        .unwrap();

    assert_eq!(report.overall.total, 1);
    assert_eq!(report.overall.completed, 1);
    assert_eq!(report.overall.open, 0);
    assert_eq!(report.overall.compliance_percentage, 100.0);
    assert_eq!(report.by_step.len(), 1);
    assert_eq!(report.by_step[0].metrics.total, 1);
    assert!(report.currently_breaching.is_empty());

    let stored = h.trackers.inner.find_by_id(tracker.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TrackerStatus::Completed);
}
