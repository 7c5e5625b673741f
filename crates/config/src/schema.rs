//! Config schema for the repository and its engines.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which engine adapter backs the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Structured job/trigger engine.
    #[default]
    Trigger,
    /// Flat runnable + pattern runner.
    Runner,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => f.write_str("trigger"),
            Self::Runner => f.write_str("runner"),
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trigger" => Ok(Self::Trigger),
            "runner" => Ok(Self::Runner),
            other => Err(format!("unknown client type: {other}")),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    pub client: ClientType,
    pub trigger: TriggerConfig,
    pub runner: RunnerConfig,
    pub logging: LoggingConfig,
}

/// Structured job engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub scheduler_name: String,
    /// Upper bound on concurrently running jobs.
    pub thread_count: usize,
    /// IANA zone name; cron triggers fire in UTC when unset.
    pub timezone: Option<String>,
    /// Free-form engine properties. `scheduler.instanceName` and
    /// `threadPool.threadCount` take precedence over the typed fields.
    pub properties: BTreeMap<String, String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: "CronScheduler".into(),
            thread_count: 10,
            timezone: None,
            properties: BTreeMap::new(),
        }
    }
}

/// Flat runner settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
