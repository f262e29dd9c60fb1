// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// SLA Engine Configuration
//
// Defines the configuration schema for an SLA engine instance, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - The governed step set and the default threshold seeded for each step
// - The external-status → auto-start step mapping
// - Storage backend selection
// - Background sweep and observability settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::step::StaticStepCatalog;

pub const API_VERSION: &str = "sla-engine/v1";
pub const KIND: &str = "SlaConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfigManifest {
    /// API version (must be "sla-engine/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SlaConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SlaConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfigSpec {
    /// Governed step set; each entry also provides the seed threshold
    #[serde(default = "default_steps")]
    pub steps: Vec<StepDefinition>,

    /// External workflow status → steps that begin timing on that status
    #[serde(default = "default_status_mappings")]
    pub status_mappings: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,

    pub threshold_hours: i64,

    /// Defaults to `threshold_hours / 24`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_days: Option<i64>,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepDefinition {
    fn new(name: &str, threshold_hours: i64, priority: i32, description: &str) -> Self {
        Self {
            name: name.to_string(),
            threshold_hours,
            threshold_days: None,
            priority,
            description: Some(description.to_string()),
        }
    }

    pub fn days(&self) -> i64 {
        self.threshold_days.unwrap_or(self.threshold_hours / 24)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,

    /// PostgreSQL connection string (required for `postgres`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Run the periodic recompute sweep in long-running processes
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expose a Prometheus scrape endpoint from long-running processes
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

fn default_storage_kind() -> StorageKind {
    StorageKind::InMemory
}

fn default_max_connections() -> u32 {
    5
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9464
}

/// Recruitment pipeline defaults
pub fn default_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("requirement_approval", 24, 1, "Approve a newly raised requirement"),
        StepDefinition::new("candidate_sourcing", 72, 2, "Source the first candidates for an open requirement"),
        StepDefinition::new("candidate_submission", 48, 3, "Submit shortlisted candidates to the client"),
        StepDefinition::new("client_review", 72, 4, "Client reviews submitted profiles"),
        StepDefinition::new("interview_scheduling", 48, 5, "Schedule interviews for accepted profiles"),
        StepDefinition::new("interview_feedback", 24, 6, "Collect interviewer feedback"),
        StepDefinition::new("offer_release", 48, 7, "Release the offer to the selected candidate"),
        StepDefinition::new("onboarding", 168, 8, "Complete joining formalities"),
    ]
}

pub fn default_status_mappings() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("Pending Approval".to_string(), vec!["requirement_approval".to_string()]),
        (
            "Open".to_string(),
            vec!["candidate_sourcing".to_string(), "candidate_submission".to_string()],
        ),
        ("Candidates Submitted".to_string(), vec!["client_review".to_string()]),
        ("Shortlisted".to_string(), vec!["interview_scheduling".to_string()]),
        ("Interview Scheduled".to_string(), vec!["interview_feedback".to_string()]),
        ("Selected".to_string(), vec!["offer_release".to_string()]),
        ("Offer Accepted".to_string(), vec!["onboarding".to_string()]),
    ])
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Default for SlaConfigSpec {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            status_mappings: default_status_mappings(),
            storage: StorageConfig::default(),
            sweep: SweepConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for SlaConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "sla-engine".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: SlaConfigSpec::default(),
        }
    }
}

impl SlaConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. SLA_CONFIG_PATH environment variable
    /// 2. ./sla-config.yaml (working directory)
    /// 3. ~/.sla/config.yaml (user home)
    /// 4. /etc/sla/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SLA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./sla-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sla").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/sla/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load from an explicit path (which must exist), else discover, else
    /// fall back to built-in defaults. Environment overrides are applied last.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using built-in defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SLA_DATABASE_URL").filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: SLA_DATABASE_URL (postgres backend)");
            self.spec.storage.backend = StorageKind::Postgres;
            self.spec.storage.database_url = Some(url);
        }

        if let Some(level) = lookup("SLA_LOG_LEVEL").filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: SLA_LOG_LEVEL={}", level);
            self.spec.observability.logging.level = level;
        }

        if let Some(val) = lookup("SLA_SWEEP_INTERVAL_SECONDS") {
            match val.parse::<u64>() {
                Ok(seconds) => {
                    tracing::info!("Environment override: SLA_SWEEP_INTERVAL_SECONDS={}", seconds);
                    self.spec.sweep.interval_seconds = seconds;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SLA_SWEEP_INTERVAL_SECONDS: '{}'. Expected seconds. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.steps.is_empty() {
            anyhow::bail!("spec.steps must define at least one step");
        }

        let mut seen = HashSet::new();
        for step in &self.spec.steps {
            if step.name.trim().is_empty() {
                anyhow::bail!("spec.steps contains an empty step name");
            }
            if !seen.insert(step.name.as_str()) {
                anyhow::bail!("Duplicate step name in spec.steps: '{}'", step.name);
            }
            if step.threshold_hours < 0 || step.days() < 0 {
                anyhow::bail!("Step '{}' has a negative threshold", step.name);
            }
        }

        for (status, steps) in &self.spec.status_mappings {
            for step in steps {
                if !seen.contains(step.as_str()) {
                    anyhow::bail!(
                        "Status mapping '{}' references unknown step '{}'",
                        status,
                        step
                    );
                }
            }
        }

        if self.spec.storage.backend == StorageKind::Postgres
            && self.spec.storage.database_url.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("spec.storage.database_url is required for the postgres backend");
        }

        if self.spec.sweep.interval_seconds == 0 {
            anyhow::bail!("spec.sweep.interval_seconds must be greater than zero");
        }

        Ok(())
    }

    /// The governed step set described by this configuration
    pub fn step_catalog(&self) -> StaticStepCatalog {
        StaticStepCatalog::new(self.spec.steps.iter().map(|s| s.name.clone()))
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match (self.spec.storage.backend, &self.spec.storage.database_url) {
            (StorageKind::Postgres, Some(url)) => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.clone(),
                max_connections: self.spec.storage.max_connections,
            }),
            _ => StorageBackend::InMemory,
        }
    }
}
