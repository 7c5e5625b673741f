use std::any::Any;

use {cronrepo_core::BoxError, thiserror::Error};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("trigger not found: {0}")]
    TriggerNotFound(String),

    #[error("trigger {0} will never fire")]
    TriggerNeverFires(String),

    #[error("unable to instantiate job {job}: {source}")]
    JobInstantiation {
        job: String,
        #[source]
        source: BoxError,
    },

    #[error("no job factory configured")]
    NoJobFactory,

    #[error("no tokio runtime available to drive the scheduler")]
    NoRuntime,
}

impl SchedulerError {
    #[must_use]
    pub fn job_not_found(job: impl ToString) -> Self {
        Self::JobNotFound(job.to_string())
    }

    #[must_use]
    pub fn trigger_not_found(trigger: impl ToString) -> Self {
        Self::TriggerNotFound(trigger.to_string())
    }

    #[must_use]
    pub fn job_instantiation(job: impl ToString, source: impl Into<BoxError>) -> Self {
        Self::JobInstantiation {
            job: job.to_string(),
            source: source.into(),
        }
    }
}

/// Failure reported by a job, or on its behalf when it could not run.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct JobExecutionError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl JobExecutionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap a task body failure, keeping its message.
    #[must_use]
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        Self::with_source(format!("{err:#}"), err)
    }

    /// Convert a caught panic payload.
    #[must_use]
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(format!("job panicked: {detail}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
