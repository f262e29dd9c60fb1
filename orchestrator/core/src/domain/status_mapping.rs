// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::{BTreeMap, HashMap};

use crate::domain::error::SlaError;
use crate::domain::step::{StepCatalog, StepName};

/// Static table of external workflow status → steps that start timing when
/// the status is reached.
#[derive(Debug, Clone, Default)]
pub struct StatusStepMapping {
    steps_by_status: HashMap<String, Vec<StepName>>,
}

impl StatusStepMapping {
    /// Build the table, validating every step against the catalog.
    pub fn new(raw: &BTreeMap<String, Vec<String>>, catalog: &dyn StepCatalog) -> Result<Self, SlaError> {
        let mut steps_by_status = HashMap::with_capacity(raw.len());
        for (status, steps) in raw {
            let mut parsed: Vec<StepName> = Vec::with_capacity(steps.len());
            for step in steps {
                let step = StepName::parse(step, catalog)?;
                if !parsed.contains(&step) {
                    parsed.push(step);
                }
            }
            steps_by_status.insert(status.clone(), parsed);
        }
        Ok(Self { steps_by_status })
    }

    /// Steps for `status`; empty for unknown statuses.
    pub fn steps_for(&self, status: &str) -> &[StepName] {
        self.steps_by_status
            .get(status)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.steps_by_status.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StaticStepCatalog;

    #[test]
    fn test_unknown_status_maps_to_nothing() {
        let catalog = StaticStepCatalog::new(["candidate_submission"]);
        let raw = BTreeMap::from([(
            "Open".to_string(),
            vec!["candidate_submission".to_string(), "candidate_submission".to_string()],
        )]);
        let mapping = StatusStepMapping::new(&raw, &catalog).unwrap();

        assert_eq!(mapping.steps_for("Open").len(), 1);
        assert!(mapping.steps_for("Closed").is_empty());
        assert!(mapping.steps_for("open").is_empty());
    }

    #[test]
    fn test_mapping_rejects_ungoverned_step() {
        let catalog = StaticStepCatalog::new(["candidate_submission"]);
        let raw = BTreeMap::from([("Open".to_string(), vec!["sourcing".to_string()])]);
        assert!(matches!(
            StatusStepMapping::new(&raw, &catalog),
            Err(SlaError::InvalidStepName(_))
        ));
    }
}
