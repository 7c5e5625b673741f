use thiserror::Error;

/// Raised when a scheduling pattern cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid scheduling pattern '{pattern}': {reason}")]
pub struct InvalidPatternError {
    pattern: String,
    reason: String,
}

impl InvalidPatternError {
    #[must_use]
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("scheduler not started")]
    NotStarted,

    #[error("no tokio runtime available")]
    NoRuntime,

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },
}

impl RunnerError {
    #[must_use]
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
