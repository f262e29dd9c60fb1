// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sweep Command
//!
//! Runs the periodic recompute sweep in the foreground until Ctrl+C or
//! SIGTERM, optionally exposing a Prometheus scrape endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Use the configured interval
//! sla sweep
//!
//! # One pass, then exit
//! sla sweep --once
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use crate::engine::CliContext;
use crate::output::print_json;

#[derive(Args)]
pub struct SweepCommand {
    /// Run a single recompute pass and exit
    #[arg(long)]
    once: bool,

    /// Expose Prometheus metrics on this port (overrides configuration)
    #[arg(long, value_name = "PORT")]
    metrics_port: Option<u16>,
}

pub async fn execute(cmd: SweepCommand, ctx: &CliContext) -> Result<()> {
    let (config, engine) = ctx.engine().await?;

    if cmd.once {
        let visited = engine.orchestrator.recompute_all_open().await?;
        if ctx.json {
            return print_json(&serde_json::json!({ "visited": visited }));
        }
        println!("{}", format!("✓ Recomputed {} open trackers", visited).green());
        return Ok(());
    }

    if !config.spec.sweep.enabled {
        bail!("The sweeper is disabled (spec.sweep.enabled = false). Enable it or run `sla sweep --once`.");
    }

    let metrics = &config.spec.observability.metrics;
    let metrics_port = cmd.metrics_port.or(metrics.enabled.then_some(metrics.port));
    if let Some(port) = metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus metrics endpoint listening");
    }

    let sweeper = Arc::new(engine.sweeper());
    let token = sweeper.shutdown_token();
    let handle = sweeper.start();

    println!(
        "{}",
        format!(
            "SLA sweeper running every {}s (Ctrl+C to stop)",
            config.spec.sweep.interval_seconds
        )
        .bold()
    );

    shutdown_signal().await?;
    token.cancel();
    handle.await.context("Sweeper task failed")?;

    println!("{}", "✓ Sweeper stopped".green());
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C signal");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C signal");
    }

    Ok(())
}
