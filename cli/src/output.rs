// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering for trackers, thresholds and reports.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use sla_engine_core::domain::report::SlaMetrics;
use sla_engine_core::domain::threshold::StepThreshold;
use sla_engine_core::domain::tracker::{SlaTracker, TrackerStatus};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status_label(status: TrackerStatus) -> ColoredString {
    match status {
        TrackerStatus::Pending => status.as_str().yellow(),
        TrackerStatus::Completed => status.as_str().green(),
        TrackerStatus::Breached => status.as_str().red().bold(),
        TrackerStatus::Cancelled => status.as_str().dimmed(),
    }
}

pub fn print_thresholds(thresholds: &[StepThreshold]) {
    if thresholds.is_empty() {
        println!("{}", "No thresholds configured".yellow());
        return;
    }

    println!("{:<4} {:<24} {:>8} {:>6} {:<8} {}", "PRI", "STEP", "HOURS", "DAYS", "ACTIVE", "DESCRIPTION");
    for t in thresholds {
        let active = if t.active { "yes".green() } else { "no".dimmed() };
        println!(
            "{:<4} {:<24} {:>8} {:>6} {:<8} {}",
            t.priority,
            t.step_name.as_str().bold(),
            t.threshold_hours,
            t.threshold_days,
            active,
            t.description.as_deref().unwrap_or("")
        );
    }
}

pub fn print_trackers(trackers: &[SlaTracker]) {
    if trackers.is_empty() {
        println!("{}", "No trackers found".yellow());
        return;
    }

    println!(
        "{:<38} {:<16} {:<22} {:<10} {:>9} {:>9} {}",
        "ID", "WORKFLOW", "STEP", "STATUS", "HOURS", "BREACH", "ASSIGNEE"
    );
    for t in trackers {
        println!(
            "{:<38} {:<16} {:<22} {:<10} {:>9.2} {:>9.2} {}",
            t.id.to_string(),
            t.workflow_instance_id.as_str(),
            t.step_name.as_str(),
            status_label(t.status),
            t.actual_duration_hours.unwrap_or_default(),
            t.breach_hours,
            t.assignee_id.as_deref().unwrap_or("-")
        );
    }
}

pub fn print_tracker(tracker: &SlaTracker) {
    println!("{}", "Tracker:".bold());
    println!("  ID:         {}", tracker.id);
    println!("  Workflow:   {}", tracker.workflow_instance_id);
    println!("  Step:       {}", tracker.step_name);
    println!("  Status:     {}", status_label(tracker.status));
    println!("  Started:    {}", tracker.started_at.to_rfc3339());
    match tracker.completed_at {
        Some(at) => println!("  Completed:  {}", at.to_rfc3339()),
        None => println!("  Completed:  {}", "(open)".dimmed()),
    }
    println!("  Threshold:  {}h ({}d)", tracker.threshold_hours, tracker.threshold_days);
    if let Some(hours) = tracker.actual_duration_hours {
        println!("  Duration:   {:.2}h ({:.2}d)", hours, hours / 24.0);
    }
    if tracker.breach_hours > 0.0 {
        println!("  Breach:     {}", format!("{:.2}h", tracker.breach_hours).red());
    }
    if let Some(assignee) = &tracker.assignee_id {
        println!("  Assignee:   {}", assignee);
    }
    if let Some(notes) = &tracker.notes {
        println!("  Notes:      {}", notes);
    }
}

pub fn print_metrics(metrics: &SlaMetrics) {
    let compliance = format!("{:.2}%", metrics.compliance_percentage);
    let compliance = if metrics.completed == 0 {
        compliance.dimmed()
    } else if metrics.compliance_percentage >= 90.0 {
        compliance.green()
    } else {
        compliance.red()
    };

    println!("  Total:       {}", metrics.total);
    println!(
        "  Completed:   {} ({} on time, {} breached overall)",
        metrics.completed, metrics.on_time, metrics.breached
    );
    println!("  Open:        {}", metrics.open);
    println!("  Compliance:  {}", compliance);
    println!(
        "  Turnaround:  {:.2}h ({:.2}d) average",
        metrics.average_turnaround_hours, metrics.average_turnaround_days
    );
    println!("  Breach:      {:.2}h total", metrics.total_breach_hours);
}
