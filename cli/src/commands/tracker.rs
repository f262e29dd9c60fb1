// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracker lifecycle commands
//!
//! Commands: start, complete, cancel, show, auto-start, workflow

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use sla_engine_core::application::StartTrackerRequest;
use sla_engine_core::domain::tracker::{TrackerId, WorkflowInstanceId};

use crate::engine::CliContext;
use crate::output::{print_json, print_metrics, print_tracker, print_trackers};

#[derive(Subcommand)]
pub enum TrackerCommand {
    /// Start timing a step (no-op if already open)
    Start {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow: String,

        #[arg(value_name = "STEP")]
        step: String,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Close the open tracker for a step
    Complete {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow: String,

        #[arg(value_name = "STEP")]
        step: String,

        /// Completion time (RFC 3339, default: now)
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<DateTime<Utc>>,
    },

    /// Cancel an open tracker
    Cancel {
        #[arg(value_name = "TRACKER_ID")]
        tracker_id: Uuid,
    },

    /// Show one tracker
    Show {
        #[arg(value_name = "TRACKER_ID")]
        tracker_id: Uuid,
    },

    /// Start every step mapped to an external workflow status
    AutoStart {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow: String,

        #[arg(value_name = "STATUS")]
        status: String,

        #[arg(long)]
        assignee: Option<String>,
    },

    /// Show every tracker of a workflow instance
    Workflow {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow: String,
    },
}

pub async fn handle_command(command: TrackerCommand, ctx: &CliContext) -> Result<()> {
    let (_config, engine) = ctx.engine().await?;
    let orchestrator = engine.orchestrator;

    match command {
        TrackerCommand::Start {
            workflow,
            step,
            assignee,
            notes,
        } => {
            let tracker = orchestrator
                .start(StartTrackerRequest {
                    workflow_instance_id: WorkflowInstanceId::new(workflow),
                    step_name: step,
                    assignee_id: assignee,
                    notes,
                })
                .await?;
            if ctx.json {
                return print_json(&tracker);
            }
            println!("{}", format!("✓ Tracker {} open", tracker.id).green());
            print_tracker(&tracker);
        }
        TrackerCommand::Complete { workflow, step, at } => {
            let workflow = WorkflowInstanceId::new(workflow);
            match orchestrator.complete(&workflow, &step, at).await? {
                Some(tracker) if ctx.json => print_json(&tracker)?,
                Some(tracker) => {
                    println!("{}", format!("✓ Tracker {} closed", tracker.id).green());
                    print_tracker(&tracker);
                }
                None if ctx.json => print_json(&serde_json::Value::Null)?,
                None => println!(
                    "{}",
                    format!("No open tracker for {} / {}", workflow, step).yellow()
                ),
            }
        }
        TrackerCommand::Cancel { tracker_id } => {
            match orchestrator.cancel(TrackerId(tracker_id)).await? {
                Some(tracker) if ctx.json => print_json(&tracker)?,
                Some(tracker) => println!("{}", format!("✓ Tracker {} cancelled", tracker.id).green()),
                None if ctx.json => print_json(&serde_json::Value::Null)?,
                None => println!(
                    "{}",
                    format!("Tracker {} is not open or does not exist", tracker_id).yellow()
                ),
            }
        }
        TrackerCommand::Show { tracker_id } => {
            let tracker = orchestrator
                .get_tracker(TrackerId(tracker_id))
                .await?
                .with_context(|| format!("Tracker {} not found", tracker_id))?;
            if ctx.json {
                return print_json(&tracker);
            }
            print_tracker(&tracker);
        }
        TrackerCommand::AutoStart {
            workflow,
            status,
            assignee,
        } => {
            let workflow = WorkflowInstanceId::new(workflow);
            let trackers = orchestrator
                .auto_start_for_status(&workflow, &status, assignee)
                .await?;
            if ctx.json {
                return print_json(&trackers);
            }
            if trackers.is_empty() {
                println!("{}", format!("No steps mapped to status '{}'", status).yellow());
            } else {
                print_trackers(&trackers);
            }
        }
        TrackerCommand::Workflow { workflow } => {
            let report = orchestrator
                .workflow_status(&WorkflowInstanceId::new(workflow))
                .await?;
            if ctx.json {
                return print_json(&report);
            }
            println!("{}", format!("Workflow {}", report.workflow_instance_id).bold());
            print_trackers(&report.trackers);
            println!();
            print_metrics(&report.metrics);
            if report.breaching > 0 {
                println!("  {}", format!("Breaching:   {}", report.breaching).red());
            }
            if report.cancelled > 0 {
                println!("  Cancelled:   {}", report.cancelled);
            }
        }
    }

    Ok(())
}
