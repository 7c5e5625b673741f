//! Cron task repository backed by the lightweight runner engine.
//!
//! Task ids are generated by the engine. Expressions are scheduling
//! patterns: UNIX 5-field expressions (or expressions with seconds)
//! joined by `|`.

mod bridge;
pub mod engine;
pub mod method_task;
pub mod repository;

pub use {method_task::MethodTask, repository::RunnerCronTaskRepository};
