//! Cron task repository contracts.
//!
//! A [`CronTaskRepository`] registers, updates, removes and reports cron
//! driven tasks on top of one interchangeable scheduling engine. Engines live
//! in their own crates; this crate holds what every engine adapter shares:
//! task bodies, the error taxonomy, error normalisation, listener fan-out and
//! the lifecycle state machine.

pub mod body;
pub mod error;
pub mod expression;
pub mod invocable;
pub mod lifecycle;
pub mod listener;
pub mod repository;
pub mod task;
pub mod utils;

pub use {
    body::{MethodTaskBody, Runnable, RunnableTaskBody, TaskBody},
    error::{BoxError, Error, ErrorKind, Result},
    expression::{CronExpression, ExpressionError},
    invocable::{BoundMethod, InvocableResolver, MethodRegistry, ResolveError},
    lifecycle::{LifecycleGuard, LifecycleState},
    listener::{CronListener, Firing, FiringOutcome, ListenerRegistry},
    repository::{CronTaskRepository, LifecycleRepository},
    task::{CronTask, CronTaskInfo},
    utils::{ExpressionErrorType, do_register, do_void_invoke, require_non_blank, resolve_error},
};
