//! Configuration loading, validation, env substitution and engine properties.
//!
//! Config files: `cronrepo.toml`, `cronrepo.yaml`, `cronrepo.yml` or
//! `cronrepo.json`, searched in `./` then `~/.config/cronrepo/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod customizer;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    customizer::{
        INSTANCE_NAME_KEY, Properties, PropertiesCustomizer, RunnerSettings, THREAD_COUNT_KEY,
        TriggerSettings, customize_properties, parse_timezone,
    },
    error::{ConfigError, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, discover_and_load, load_config,
    },
    schema::{ClientType, CronConfig, LoggingConfig, RunnerConfig, TriggerConfig},
    validate::{
        Category, Diagnostic, Severity, ValidationResult, validate, validate_config,
        validate_toml_str,
    },
};
