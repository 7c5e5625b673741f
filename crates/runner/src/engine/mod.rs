//! Lightweight runner engine: runnables keyed by generated ids, fired on
//! `|`-separated scheduling patterns.

pub mod error;
pub mod listener;
pub mod pattern;
pub mod scheduler;
pub mod task;

pub use {
    error::{InvalidPatternError, RunnerError},
    listener::SchedulerListener,
    pattern::SchedulingPattern,
    scheduler::Scheduler,
    task::{RunnableTask, Task, TaskExecutor},
};
