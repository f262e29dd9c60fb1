// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracker lifecycle tests against the in-memory stores.
//!
//! Covers idempotent start (sequential and racing), completion arithmetic,
//! benign double completion, cancellation, auto-start by status, threshold
//! snapshot isolation and breach event emission.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use sla_engine_core::application::repository_factory::SlaRepositories;
use sla_engine_core::application::{SlaEngine, StartTrackerRequest, UpsertThresholdRequest};
use sla_engine_core::domain::clock::ManualClock;
use sla_engine_core::domain::error::SlaError;
use sla_engine_core::domain::events::SlaEvent;
use sla_engine_core::domain::sla_config::SlaConfigManifest;
use sla_engine_core::domain::tracker::{TrackerStatus, WorkflowInstanceId};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap()
}

struct Harness {
    engine: SlaEngine,
    clock: Arc<ManualClock>,
}

async fn harness_with(config: SlaConfigManifest) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let engine = SlaEngine::from_parts(&config, SlaRepositories::in_memory(), clock.clone()).unwrap();
    engine.registry.seed_defaults().await.unwrap();
    Harness { engine, clock }
}

async fn harness() -> Harness {
    harness_with(SlaConfigManifest::default()).await
}

async fn set_threshold(h: &Harness, step: &str, hours: i64) {
    h.engine
        .registry
        .upsert(UpsertThresholdRequest {
            step_name: step.to_string(),
            threshold_hours: hours,
            threshold_days: None,
            description: None,
            priority: None,
        })
        .await
        .unwrap();
}

fn wf(id: &str) -> WorkflowInstanceId {
    WorkflowInstanceId::new(id)
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let h = harness().await;

    let first = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "candidate_submission").with_assignee("alice"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(1));
    let second = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "candidate_submission"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.started_at, t0());
    assert_eq!(second.assignee_id.as_deref(), Some("alice"));
    assert_eq!(first.status, TrackerStatus::Pending);
    assert_eq!(first.threshold_hours, 48);
    assert_eq!(first.threshold_days, 2);

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-1")).await.unwrap();
    assert_eq!(report.trackers.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_creates_one_tracker() {
    let h = harness().await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let orchestrator = h.engine.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .start(StartTrackerRequest::new("REQ-RACE", "client_review"))
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let ids: Vec<_> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();

    assert!(ids.iter().all(|id| *id == ids[0]));
    let report = h.engine.orchestrator.workflow_status(&wf("REQ-RACE")).await.unwrap();
    assert_eq!(report.trackers.len(), 1);
}

#[tokio::test]
async fn test_start_rejects_unknown_step() {
    let h = harness().await;
    let err = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "coffee_break"))
        .await
        .unwrap_err();
    assert!(matches!(err, SlaError::InvalidStepName(_)));
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_start_without_active_threshold_fails() {
    let h = harness().await;
    h.engine.registry.deactivate("offer_release").await.unwrap();

    let err = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "offer_release"))
        .await
        .unwrap_err();
    assert!(matches!(err, SlaError::ConfigMissing(ref step) if step == "offer_release"));

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-1")).await.unwrap();
    assert!(report.trackers.is_empty());
}

#[tokio::test]
async fn test_complete_late_is_breached() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();

    h.clock.advance(Duration::hours(30));
    let closed = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(closed.status, TrackerStatus::Breached);
    assert_eq!(closed.actual_duration_hours, Some(30.0));
    assert_eq!(closed.actual_duration_days(), Some(1.25));
    assert_eq!(closed.breach_hours, 6.0);
    assert_eq!(closed.completed_at, Some(t0() + Duration::hours(30)));
}

#[tokio::test]
async fn test_complete_on_time() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();

    let closed = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", Some(t0() + Duration::hours(20)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(closed.status, TrackerStatus::Completed);
    assert_eq!(closed.breach_hours, 0.0);
    assert_eq!(closed.actual_duration_hours, Some(20.0));
}

#[tokio::test]
async fn test_double_complete_is_benign() {
    let h = harness().await;
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "interview_feedback"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(2));

    let first = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "interview_feedback", None)
        .await
        .unwrap();
    h.clock.advance(Duration::hours(5));
    let second = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "interview_feedback", None)
        .await
        .unwrap();

    let first = first.unwrap();
    assert!(second.is_none());

    let stored = h.engine.orchestrator.get_tracker(first.id).await.unwrap().unwrap();
    assert_eq!(stored.completed_at, Some(t0() + Duration::hours(2)));
    assert_eq!(stored.actual_duration_hours, Some(2.0));
}

#[tokio::test]
async fn test_complete_never_started_returns_none() {
    let h = harness().await;
    let result = h
        .engine
        .orchestrator
        .complete(&wf("REQ-404"), "onboarding", None)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_complete_before_start_rejected() {
    let h = harness().await;
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "onboarding"))
        .await
        .unwrap();

    let err = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "onboarding", Some(t0() - Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, SlaError::InvalidCompletionTime { .. }));

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-1")).await.unwrap();
    assert_eq!(report.metrics.open, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_complete_closes_once() {
    let h = harness().await;
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "candidate_sourcing"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(10));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orchestrator = h.engine.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .complete(&WorkflowInstanceId::new("REQ-1"), "candidate_sourcing", None)
                    .await
            })
        })
        .collect();

    let closed = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(Option::is_some)
        .count();
    assert_eq!(closed, 1);

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-1")).await.unwrap();
    assert_eq!(report.trackers.len(), 1);
    assert_eq!(report.metrics.completed, 1);
    assert_eq!(report.metrics.on_time, 1);
}

#[tokio::test]
async fn test_open_breach_is_monotonic() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    let tracker = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();

    h.clock.advance(Duration::hours(23));
    assert!(h.engine.orchestrator.currently_breaching().await.unwrap().is_empty());

    h.clock.advance(Duration::hours(7));
    let breaching = h.engine.orchestrator.currently_breaching().await.unwrap();
    assert_eq!(breaching.len(), 1);
    assert_eq!(breaching[0].id, tracker.id);
    assert_eq!(breaching[0].breach_hours, 6.0);
    assert!(breaching[0].completed_at.is_none());

    h.clock.advance(Duration::hours(10));
    assert_eq!(h.engine.orchestrator.recompute_all_open().await.unwrap(), 1);
    let stored = h.engine.orchestrator.get_tracker(tracker.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TrackerStatus::Breached);
    assert_eq!(stored.breach_hours, 16.0);
}

#[tokio::test]
async fn test_breaching_sorted_by_breach_hours() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    set_threshold(&h, "interview_feedback", 12).await;

    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-2", "interview_feedback"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(30));

    let breaching = h.engine.orchestrator.currently_breaching().await.unwrap();
    assert_eq!(breaching.len(), 2);
    assert_eq!(breaching[0].workflow_instance_id, wf("REQ-2"));
    assert_eq!(breaching[0].breach_hours, 18.0);
    assert_eq!(breaching[1].breach_hours, 6.0);
}

#[tokio::test]
async fn test_threshold_snapshot_isolation() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    let old = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();

    set_threshold(&h, "client_review", 48).await;
    let new = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-2", "client_review"))
        .await
        .unwrap();

    assert_eq!(old.threshold_hours, 24);
    assert_eq!(new.threshold_hours, 48);

    h.clock.advance(Duration::hours(30));
    let closed_old = h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", None)
        .await
        .unwrap()
        .unwrap();
    let closed_new = h
        .engine
        .orchestrator
        .complete(&wf("REQ-2"), "client_review", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(closed_old.status, TrackerStatus::Breached);
    assert_eq!(closed_new.status, TrackerStatus::Completed);
}

#[tokio::test]
async fn test_cancel_frees_slot_and_leaves_metrics() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    let tracker = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(30));
    assert_eq!(h.engine.orchestrator.currently_breaching().await.unwrap().len(), 1);

    let cancelled = h.engine.orchestrator.cancel(tracker.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, TrackerStatus::Cancelled);
    assert_eq!(cancelled.breach_hours, 0.0);
    assert!(h.engine.orchestrator.cancel(tracker.id).await.unwrap().is_none());

    assert!(h.engine.orchestrator.currently_breaching().await.unwrap().is_empty());
    assert!(h
        .engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", None)
        .await
        .unwrap()
        .is_none());

    let report = h
        .engine
        .orchestrator
        .global_metrics(t0(), t0() + Duration::hours(48))
        .await
        .unwrap();
    assert_eq!(report.overall.total, 0);
    assert_eq!(report.overall.compliance_percentage, 0.0);

    let restarted = h
        .engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();
    assert_ne!(restarted.id, tracker.id);

    let status = h.engine.orchestrator.workflow_status(&wf("REQ-1")).await.unwrap();
    assert_eq!(status.trackers.len(), 2);
    assert_eq!(status.cancelled, 1);
    assert_eq!(status.metrics.total, 1);
}

#[tokio::test]
async fn test_trackers_for_workflow_lists_history() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    set_threshold(&h, "interview_feedback", 24).await;
    for step in ["client_review", "interview_feedback"] {
        h.engine
            .orchestrator
            .start(StartTrackerRequest::new("REQ-9", step))
            .await
            .unwrap();
        h.clock.advance(Duration::hours(1));
    }
    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-OTHER", "client_review"))
        .await
        .unwrap();

    let trackers = h.engine.orchestrator.trackers_for_workflow(&wf("REQ-9")).await.unwrap();
    assert_eq!(trackers.len(), 2);
    assert_eq!(trackers[0].step_name.as_str(), "client_review");
    assert_eq!(trackers[1].step_name.as_str(), "interview_feedback");
    assert!(h
        .engine
        .orchestrator
        .trackers_for_workflow(&wf("REQ-NONE"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_auto_start_for_mapped_status() {
    let mut config = SlaConfigManifest::default();
    config.spec.status_mappings =
        BTreeMap::from([("Open".to_string(), vec!["candidate_submission".to_string()])]);
    let h = harness_with(config).await;

    let first = h
        .engine
        .orchestrator
        .auto_start_for_status(&wf("REQ-7"), "Open", Some("bob".to_string()))
        .await
        .unwrap();
    let second = h
        .engine
        .orchestrator
        .auto_start_for_status(&wf("REQ-7"), "Open", None)
        .await
        .unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].step_name.as_str(), "candidate_submission");
    assert_eq!(first[0].assignee_id.as_deref(), Some("bob"));
    assert_eq!(second[0].id, first[0].id);

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-7")).await.unwrap();
    assert_eq!(report.trackers.len(), 1);
}

#[tokio::test]
async fn test_auto_start_default_mapping_and_unknown_status() {
    let h = harness().await;

    let started = h
        .engine
        .orchestrator
        .auto_start_for_status(&wf("REQ-8"), "Open", None)
        .await
        .unwrap();
    let steps: Vec<&str> = started.iter().map(|t| t.step_name.as_str()).collect();
    assert_eq!(steps, vec!["candidate_sourcing", "candidate_submission"]);

    let none = h
        .engine
        .orchestrator
        .auto_start_for_status(&wf("REQ-8"), "On Hold", None)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_breach_detected_published_once() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    let mut events = h.engine.event_bus.subscribe();

    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(30));
    h.engine.orchestrator.recompute_all_open().await.unwrap();
    h.clock.advance(Duration::hours(1));
    h.engine.orchestrator.currently_breaching().await.unwrap();
    h.engine.orchestrator.recompute_all_open().await.unwrap();
    h.engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", None)
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    let breaches = received
        .iter()
        .filter(|e| matches!(e, SlaEvent::BreachDetected { .. }))
        .count();
    assert_eq!(breaches, 1);
    assert!(matches!(received.first(), Some(SlaEvent::TrackerStarted { .. })));
    assert!(matches!(
        received.last(),
        Some(SlaEvent::TrackerCompleted { status: TrackerStatus::Breached, .. })
    ));
}

#[tokio::test]
async fn test_breach_on_completion_published_once() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    let mut events = h.engine.event_bus.subscribe();

    h.engine
        .orchestrator
        .start(StartTrackerRequest::new("REQ-1", "client_review"))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(30));
    h.engine
        .orchestrator
        .complete(&wf("REQ-1"), "client_review", None)
        .await
        .unwrap();

    let mut breaches = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SlaEvent::BreachDetected { still_open, breach_hours, .. } = event {
            breaches.push((still_open, breach_hours));
        }
    }
    assert_eq!(breaches, vec![(false, 6.0)]);
}

#[tokio::test]
async fn test_workflow_status_separates_open_breaches() {
    let h = harness().await;
    set_threshold(&h, "client_review", 24).await;
    set_threshold(&h, "interview_feedback", 24).await;
    for step in ["client_review", "interview_feedback"] {
        h.engine
            .orchestrator
            .start(StartTrackerRequest::new("REQ-5", step))
            .await
            .unwrap();
    }
    h.clock.advance(Duration::hours(30));
    h.engine
        .orchestrator
        .complete(&wf("REQ-5"), "client_review", None)
        .await
        .unwrap()
        .unwrap();

    let report = h.engine.orchestrator.workflow_status(&wf("REQ-5")).await.unwrap();
    assert_eq!(report.metrics.breached, 2);
    assert_eq!(report.metrics.open, 1);
    assert_eq!(report.breaching, 1);
}
