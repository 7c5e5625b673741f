//! In-process structured job engine: jobs addressed by [`JobKey`], fired by
//! [`Trigger`]s, instantiated through a [`JobFactory`].

pub mod error;
pub mod job;
pub mod key;
pub mod listener;
pub mod scheduler;
pub mod trigger;

pub use {
    error::{JobExecutionError, SchedulerError},
    job::{Job, JobDetail, JobExecutionContext, JobFactory, JobType, TriggerFiredBundle},
    key::{JobKey, TriggerKey},
    listener::{JobListener, ListenerManager},
    scheduler::Scheduler,
    trigger::{CronTrigger, SimpleTrigger, Trigger},
};
