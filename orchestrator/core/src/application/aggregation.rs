// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Pure aggregation over tracker snapshots.

use std::collections::BTreeMap;

use crate::domain::report::{SlaMetrics, StepMetrics};
use crate::domain::step::StepName;
use crate::domain::tracker::{SlaTracker, TrackerStatus};

/// Round to two decimals for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summarise a set of trackers. Cancelled trackers are ignored.
pub fn summarize<'a, I>(trackers: I) -> SlaMetrics
where
    I: IntoIterator<Item = &'a SlaTracker>,
{
    let mut metrics = SlaMetrics::default();
    let mut duration_sum = 0.0;
    let mut breach_sum = 0.0;

    for tracker in trackers {
        if tracker.status == TrackerStatus::Cancelled {
            continue;
        }
        metrics.total += 1;
        breach_sum += tracker.breach_hours;
        if tracker.status == TrackerStatus::Breached {
            metrics.breached += 1;
        }

        if tracker.completed_at.is_some() {
            metrics.completed += 1;
            if tracker.status == TrackerStatus::Completed {
                metrics.on_time += 1;
            }
            duration_sum += tracker.actual_duration_hours.unwrap_or_default();
        } else {
            metrics.open += 1;
        }
    }

    if metrics.completed > 0 {
        let completed = metrics.completed as f64;
        let average_hours = duration_sum / completed;
        metrics.compliance_percentage = round2(metrics.on_time as f64 / completed * 100.0);
        metrics.average_turnaround_hours = round2(average_hours);
        metrics.average_turnaround_days = round2(average_hours / 24.0);
    }
    metrics.total_breach_hours = round2(breach_sum);
    metrics
}

/// Per-step breakdown, sorted by step name.
pub fn summarize_by_step(trackers: &[SlaTracker]) -> Vec<StepMetrics> {
    let mut by_step: BTreeMap<&StepName, Vec<&SlaTracker>> = BTreeMap::new();
    for tracker in trackers.iter().filter(|t| t.status != TrackerStatus::Cancelled) {
        by_step.entry(&tracker.step_name).or_default().push(tracker);
    }

    by_step
        .into_iter()
        .map(|(step_name, trackers)| StepMetrics {
            step_name: step_name.clone(),
            metrics: summarize(trackers),
        })
        .collect()
}

/// Open breached trackers, largest breach first.
pub fn breaching_first(trackers: &[SlaTracker]) -> Vec<SlaTracker> {
    let mut breaching: Vec<SlaTracker> = trackers
        .iter()
        .filter(|t| t.is_open() && t.status == TrackerStatus::Breached)
        .cloned()
        .collect();
    breaching.sort_by(|a, b| b.breach_hours.total_cmp(&a.breach_hours));
    breaching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::threshold::StepThreshold;
    use crate::domain::tracker::WorkflowInstanceId;
    use chrono::{Duration, TimeZone, Utc};

    fn closed(step: &str, threshold_hours: i64, hours: i64) -> SlaTracker {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let threshold =
            StepThreshold::new(StepName::from_persisted(step), threshold_hours, 0, 1, None, t0).unwrap();
        let mut tracker = SlaTracker::start(WorkflowInstanceId::new("req"), &threshold, None, None, t0);
        tracker.close(t0 + Duration::hours(hours), t0 + Duration::hours(hours)).unwrap();
        tracker
    }

    #[test]
    fn test_compliance_two_of_three() {
        let trackers = vec![
            closed("client_review", 24, 10),
            closed("client_review", 24, 20),
            closed("client_review", 24, 30),
        ];
        let metrics = summarize(&trackers);

        assert_eq!(metrics.completed, 3);
        assert_eq!(metrics.on_time, 2);
        assert_eq!(metrics.breached, 1);
        assert_eq!(metrics.compliance_percentage, 66.67);
        assert_eq!(metrics.average_turnaround_hours, 20.0);
        assert_eq!(metrics.average_turnaround_days, 0.83);
        assert_eq!(metrics.total_breach_hours, 6.0);
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let metrics = summarize(&Vec::<SlaTracker>::new());
        assert_eq!(metrics, SlaMetrics::default());
    }

    #[test]
    fn test_cancelled_ignored() {
        let mut cancelled = closed("client_review", 24, 10);
        cancelled.completed_at = None;
        cancelled.status = TrackerStatus::Cancelled;

        let trackers = vec![closed("client_review", 24, 30), cancelled];
        let metrics = summarize(&trackers);
        assert_eq!(metrics.total, 1);
        assert_eq!(metrics.compliance_percentage, 0.0);

        assert_eq!(summarize_by_step(&trackers).len(), 1);
        assert!(breaching_first(&trackers).is_empty());
    }

    #[test]
    fn test_by_step_sorted() {
        let trackers = vec![
            closed("offer_release", 48, 10),
            closed("client_review", 24, 30),
            closed("offer_release", 48, 50),
        ];
        let steps = summarize_by_step(&trackers);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_name.as_str(), "client_review");
        assert_eq!(steps[1].metrics.completed, 2);
        assert_eq!(steps[1].metrics.compliance_percentage, 50.0);
    }
}
