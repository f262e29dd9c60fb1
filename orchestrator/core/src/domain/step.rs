// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Step Names and the Governed Step Catalog
//!
//! A step name identifies one timed stage of a workflow (e.g.
//! `candidate_submission`). The set of valid names is owned by an external,
//! authoritative source and is late-bound: the engine never compiles it in.
//! [`StepCatalog`] is the seam through which that source is injected, and
//! [`StepName`] can only be obtained by validating against a catalog.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Validated identifier for workflow steps

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::error::SlaError;

/// Authoritative source of valid step identifiers.
pub trait StepCatalog: Send + Sync {
    /// Whether `name` is a governed step identifier
    fn contains(&self, name: &str) -> bool;

    /// All governed step identifiers, sorted
    fn names(&self) -> Vec<String>;
}

/// Catalog backed by a fixed set loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticStepCatalog {
    names: BTreeSet<String>,
}

impl StaticStepCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl StepCatalog for StaticStepCatalog {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

/// Name of a workflow step, validated against a [`StepCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Validate `name` against the governed catalog.
    ///
    /// Surrounding whitespace is ignored; matching is case-sensitive.
    pub fn parse(name: &str, catalog: &dyn StepCatalog) -> Result<Self, SlaError> {
        let name = name.trim();
        if name.is_empty() || !catalog.contains(name) {
            return Err(SlaError::InvalidStepName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Rehydrate a name that was validated before it was persisted.
    pub(crate) fn from_persisted(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
