// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Compliance reporting commands
//!
//! Commands: global, assignee, breaching

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;

use sla_engine_core::domain::report::{ReportScope, SlaReport};

use crate::engine::CliContext;
use crate::output::{print_json, print_metrics, print_trackers};

/// Reporting window. Defaults to the last `--days` days ending now.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long, value_name = "TIMESTAMP")]
    since: Option<DateTime<Utc>>,

    /// Window end (RFC 3339, default: now)
    #[arg(long, value_name = "TIMESTAMP")]
    until: Option<DateTime<Utc>>,

    /// Window length when --since is not given
    #[arg(long, default_value_t = 30)]
    days: i64,
}

impl WindowArgs {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let until = self.until.unwrap_or(now);
        let since = match self.since {
            Some(since) => since,
            None => {
                if self.days < 0 {
                    bail!("--days must not be negative (got {})", self.days);
                }
                Duration::try_days(self.days)
                    .and_then(|span| until.checked_sub_signed(span))
                    .with_context(|| format!("--days {} reaches outside the supported date range", self.days))?
            }
        };
        Ok((since, until))
    }
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// Organisation-wide compliance
    Global {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Compliance for one assignee
    Assignee {
        #[arg(value_name = "ASSIGNEE_ID")]
        assignee: String,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Open trackers currently past their threshold
    Breaching,
}

pub async fn handle_command(command: ReportCommand, ctx: &CliContext) -> Result<()> {
    let (_config, engine) = ctx.engine().await?;
    let orchestrator = engine.orchestrator;
    let now = Utc::now();

    match command {
        ReportCommand::Global { window } => {
            let (since, until) = window.resolve(now)?;
            let report = orchestrator.global_metrics(since, until).await?;
            render(&report, ctx)?;
        }
        ReportCommand::Assignee { assignee, window } => {
            let (since, until) = window.resolve(now)?;
            let report = orchestrator.assignee_metrics(&assignee, since, until).await?;
            render(&report, ctx)?;
        }
        ReportCommand::Breaching => {
            let breaching = orchestrator.currently_breaching().await?;
            if ctx.json {
                return print_json(&breaching);
            }
            if breaching.is_empty() {
                println!("{}", "✓ No open trackers in breach".green());
            } else {
                println!("{}", format!("{} open trackers in breach", breaching.len()).red().bold());
                print_trackers(&breaching);
            }
        }
    }

    Ok(())
}

fn render(report: &SlaReport, ctx: &CliContext) -> Result<()> {
    if ctx.json {
        return print_json(report);
    }

    let title = match &report.scope {
        ReportScope::Global => "SLA compliance".to_string(),
        ReportScope::Assignee(id) => format!("SLA compliance for {}", id),
    };
    println!("{}", title.bold());
    println!(
        "{}",
        format!("{} → {}", report.since.to_rfc3339(), report.until.to_rfc3339()).dimmed()
    );
    println!();
    print_metrics(&report.overall);

    if !report.by_step.is_empty() {
        println!();
        println!("{}", "By step:".bold());
        println!(
            "  {:<24} {:>6} {:>9} {:>6} {:>11} {:>10}",
            "STEP", "TOTAL", "COMPLETED", "OPEN", "COMPLIANCE", "AVG HOURS"
        );
        for step in &report.by_step {
            println!(
                "  {:<24} {:>6} {:>9} {:>6} {:>10.2}% {:>10.2}",
                step.step_name.as_str(),
                step.metrics.total,
                step.metrics.completed,
                step.metrics.open,
                step.metrics.compliance_percentage,
                step.metrics.average_turnaround_hours
            );
        }
    }

    if !report.currently_breaching.is_empty() {
        println!();
        println!("{}", "Currently breaching:".red().bold());
        print_trackers(&report.currently_breaching);
    }

    Ok(())
}
