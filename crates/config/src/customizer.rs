//! Engine property bag: customizers and resolution into typed settings.
//!
//! The structured job engine reads a free-form string property bag. Callers
//! can reshape it through [`PropertiesCustomizer`]s, which run in ascending
//! [`PropertiesCustomizer::order`] before the bag is resolved.

use std::{collections::BTreeMap, sync::Arc};

use {chrono_tz::Tz, tracing::debug};

use crate::{
    error::{ConfigError, Result},
    schema::{RunnerConfig, TriggerConfig},
};

/// Overrides [`TriggerConfig::scheduler_name`].
pub const INSTANCE_NAME_KEY: &str = "scheduler.instanceName";
/// Overrides [`TriggerConfig::thread_count`].
pub const THREAD_COUNT_KEY: &str = "threadPool.threadCount";

pub type Properties = BTreeMap<String, String>;

pub trait PropertiesCustomizer: Send + Sync {
    fn customize(&self, properties: &mut Properties);

    fn order(&self) -> i32 {
        0
    }
}

impl<F> PropertiesCustomizer for F
where
    F: Fn(&mut Properties) + Send + Sync,
{
    fn customize(&self, properties: &mut Properties) {
        self(properties);
    }
}

/// Run every customizer over `config.properties`, lowest order first.
pub fn customize_properties(config: &mut TriggerConfig, customizers: &[Arc<dyn PropertiesCustomizer>]) {
    let mut ordered: Vec<&Arc<dyn PropertiesCustomizer>> = customizers.iter().collect();
    ordered.sort_by_key(|c| c.order());
    for customizer in ordered {
        customizer.customize(&mut config.properties);
    }
    debug!(count = config.properties.len(), "engine properties customized");
}

/// Typed settings for the structured job engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSettings {
    pub scheduler_name: String,
    pub thread_count: usize,
    pub timezone: Option<Tz>,
}

impl TriggerSettings {
    /// Resolve `config`, letting properties win over typed fields.
    pub fn resolve(config: &TriggerConfig) -> Result<Self> {
        let scheduler_name = config
            .properties
            .get(INSTANCE_NAME_KEY)
            .cloned()
            .unwrap_or_else(|| config.scheduler_name.clone());

        let thread_count = match config.properties.get(THREAD_COUNT_KEY) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid_property(THREAD_COUNT_KEY, raw, e.to_string()))?,
            None => config.thread_count,
        };
        if thread_count == 0 {
            return Err(ConfigError::ZeroThreads);
        }

        Ok(Self {
            scheduler_name,
            thread_count,
            timezone: parse_timezone("trigger.timezone", config.timezone.as_deref())?,
        })
    }
}

/// Typed settings for the flat runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    pub timezone: Option<Tz>,
}

impl RunnerSettings {
    pub fn resolve(config: &RunnerConfig) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone("runner.timezone", config.timezone.as_deref())?,
        })
    }
}

/// Parse an optional IANA zone name. Blank means unset.
pub fn parse_timezone(path: &str, value: Option<&str>) -> Result<Option<Tz>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => name
            .parse::<Tz>()
            .map(Some)
            .map_err(|_| ConfigError::invalid_timezone(path, name)),
    }
}
