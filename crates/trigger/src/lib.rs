//! Cron task repository backed by the structured job engine.
//!
//! Method tasks become jobs keyed `name = method`, `group = declaring type`.
//! A [`MethodLevelJobFactory`] resolves and caches one job instance per pair,
//! and engine job events are bridged to the repository's cron listeners.

pub mod body;
mod bridge;
pub mod engine;
pub mod factory;
pub mod method_job;
pub mod repository;
pub mod rules;

pub use {
    body::JobDetailTaskBody,
    factory::MethodLevelJobFactory,
    method_job::MethodLevelJob,
    repository::TriggerCronTaskRepository,
    rules::{build_standard_job_detail, id_from_job_key, job_key_from_id},
};
