//! Engine selection from configuration.

use std::sync::Arc;

use {
    cronrepo_config::{
        ClientType, CronConfig, PropertiesCustomizer, RunnerConfig, RunnerSettings, TriggerConfig,
        TriggerSettings, customize_properties,
    },
    cronrepo_core::{CronTaskRepository, InvocableResolver},
    cronrepo_runner::{RunnerCronTaskRepository, engine::Scheduler as RunnerScheduler},
    cronrepo_trigger::{TriggerCronTaskRepository, engine::Scheduler as TriggerScheduler},
    tracing::info,
};

/// Build the repository for `config.client`. The repository is not started.
pub fn build_repository(
    config: &CronConfig,
    resolver: Arc<dyn InvocableResolver>,
) -> anyhow::Result<Arc<dyn CronTaskRepository>> {
    build_repository_with(config, resolver, &[])
}

/// Like [`build_repository`], running `customizers` over the structured
/// engine's properties first.
pub fn build_repository_with(
    config: &CronConfig,
    resolver: Arc<dyn InvocableResolver>,
    customizers: &[Arc<dyn PropertiesCustomizer>],
) -> anyhow::Result<Arc<dyn CronTaskRepository>> {
    let repository: Arc<dyn CronTaskRepository> = match config.client {
        ClientType::Trigger => build_trigger_repository(&config.trigger, resolver, customizers)?,
        ClientType::Runner => build_runner_repository(&config.runner, Some(resolver))?,
    };
    Ok(repository)
}

pub fn build_trigger_repository(
    config: &TriggerConfig,
    resolver: Arc<dyn InvocableResolver>,
    customizers: &[Arc<dyn PropertiesCustomizer>],
) -> anyhow::Result<Arc<TriggerCronTaskRepository>> {
    let mut config = config.clone();
    customize_properties(&mut config, customizers);
    let settings = TriggerSettings::resolve(&config)?;
    info!(
        scheduler = %settings.scheduler_name,
        threads = settings.thread_count,
        timezone = ?settings.timezone,
        "building trigger cron repository"
    );
    let scheduler = TriggerScheduler::new(settings.scheduler_name, settings.thread_count);
    Ok(Arc::new(TriggerCronTaskRepository::new(
        scheduler,
        resolver,
        settings.timezone,
    )))
}

pub fn build_runner_repository(
    config: &RunnerConfig,
    resolver: Option<Arc<dyn InvocableResolver>>,
) -> anyhow::Result<Arc<RunnerCronTaskRepository>> {
    let settings = RunnerSettings::resolve(config)?;
    info!(timezone = ?settings.timezone, "building runner cron repository");
    Ok(Arc::new(RunnerCronTaskRepository::new(
        RunnerScheduler::new(settings.timezone),
        resolver,
    )))
}
