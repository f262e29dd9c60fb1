// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::repository::RepositoryError;

/// Errors surfaced by the threshold registry and the SLA orchestrator.
///
/// "No open tracker" outcomes of `complete`/`cancel` are not errors; they are
/// returned as `Ok(None)`.
#[derive(Debug, Error)]
pub enum SlaError {
    #[error("Invalid step name: '{0}' is not in the governed step set")]
    InvalidStepName(String),

    #[error("No active SLA threshold configured for step '{0}'")]
    ConfigMissing(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Completion time {completed_at} is earlier than start time {started_at}")]
    InvalidCompletionTime {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },

    #[error("Invalid report window: since {since} is after until {until}")]
    InvalidReportWindow {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SlaError {
    /// Validation errors are caller mistakes and must never be retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SlaError::InvalidStepName(_)
                | SlaError::InvalidThreshold(_)
                | SlaError::InvalidCompletionTime { .. }
                | SlaError::InvalidReportWindow { .. }
        )
    }
}
