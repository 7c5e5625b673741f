use std::{fmt, sync::Arc};

use {
    chrono::{DateTime, Utc},
    cronrepo_core::Runnable,
};

/// Unit of work launched by the [`Scheduler`](super::Scheduler).
pub trait Task: Send + Sync {
    fn execute(&self, executor: &TaskExecutor) -> anyhow::Result<()>;

    fn description(&self) -> Option<&str> {
        None
    }
}

/// A [`Task`] wrapping a plain closure.
#[derive(Clone)]
pub struct RunnableTask {
    runnable: Runnable,
    description: Option<String>,
}

impl RunnableTask {
    pub fn new(runnable: Runnable, description: Option<String>) -> Self {
        Self {
            runnable,
            description,
        }
    }
}

impl Task for RunnableTask {
    fn execute(&self, _executor: &TaskExecutor) -> anyhow::Result<()> {
        (self.runnable)()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Debug for RunnableTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableTask")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// One launch of one task.
///
/// `task_id` is the id the task was scheduled under; tasks started with
/// [`Scheduler::launch`](super::Scheduler::launch) have none.
#[derive(Clone)]
pub struct TaskExecutor {
    guid: String,
    task_id: Option<String>,
    task: Arc<dyn Task>,
    launched_at: DateTime<Utc>,
}

impl TaskExecutor {
    pub(crate) fn new(task_id: Option<String>, task: Arc<dyn Task>) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            task_id,
            task,
            launched_at: Utc::now(),
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    pub fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }
}

impl fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("guid", &self.guid)
            .field("task_id", &self.task_id)
            .field("launched_at", &self.launched_at)
            .finish_non_exhaustive()
    }
}
