//! Uniform cron task repository over interchangeable scheduling engines.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cronrepo::{CronTaskRepository, LifecycleRepository, MethodRegistry, build_repository};
//!
//! struct Reports;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut registry = MethodRegistry::new();
//! let _ = registry
//!     .register_type("app.Reports", || Ok(Reports))
//!     .method("daily", |_: &Reports| Ok(()));
//!
//! let config = cronrepo::config::discover_and_load();
//! let repository = build_repository(&config, Arc::new(registry))?;
//! let id = repository.register_method("0 0 6 * * *", "app.Reports", "daily")?;
//! repository.start()?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod logging;

pub use {
    builder::{
        build_repository, build_repository_with, build_runner_repository, build_trigger_repository,
    },
    cronrepo_config as config,
    cronrepo_core::*,
    cronrepo_runner as runner,
    cronrepo_trigger as trigger,
    logging::init_logging,
};
