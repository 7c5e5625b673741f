use std::sync::Arc;

use crate::{
    body::{MethodTaskBody, Runnable, RunnableTaskBody, TaskBody},
    error::Result,
    listener::CronListener,
    task::{CronTask, CronTaskInfo},
};

/// Start/stop control over the engine behind a repository.
///
/// `start` while running and `stop` while stopped are no-ops.
pub trait LifecycleRepository: Send + Sync {
    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn restart(&self) -> Result<()> {
        self.stop()?;
        self.start()
    }

    fn is_started(&self) -> bool;
}

/// Register, update, remove and inspect cron tasks on one engine.
///
/// Ids are opaque, unique per repository, and invalid once removed. Unknown
/// ids are `None` for queries and errors for `update`. What `remove` does with
/// an unknown id is up to the engine adapter but never changes between calls.
pub trait CronTaskRepository: LifecycleRepository {
    /// Schedule `body` on `expression` and return the new task id.
    ///
    /// Fails with [`Error::InvalidExpression`](crate::Error::InvalidExpression)
    /// for a bad expression and
    /// [`Error::UnsupportedTaskBody`](crate::Error::UnsupportedTaskBody) when
    /// the engine cannot run this body variant.
    fn register(&self, expression: &str, body: Box<dyn TaskBody>) -> Result<String>;

    fn register_task(&self, task: CronTask) -> Result<String> {
        let (expression, body) = task.into_parts();
        self.register(&expression, body)
    }

    fn register_runnable(&self, expression: &str, runnable: Runnable) -> Result<String> {
        self.register(expression, Box::new(RunnableTaskBody::new(runnable)))
    }

    fn register_method(&self, expression: &str, declaring_type: &str, method: &str) -> Result<String> {
        self.register(
            expression,
            Box::new(MethodTaskBody::new(declaring_type, method)),
        )
    }

    fn supports_body(&self, body: &dyn TaskBody) -> bool;

    fn get_cron_task_info(&self, id: &str) -> Option<CronTaskInfo>;

    fn get_all_cron_task_info(&self) -> Vec<CronTaskInfo>;

    /// Replace the schedule of `id`. Firings already running are unaffected.
    fn update(&self, id: &str, expression: &str) -> Result<()>;

    fn remove(&self, id: &str) -> Result<()>;

    fn add_listener(&self, listener: Arc<dyn CronListener>);

    fn remove_listener(&self, listener: &Arc<dyn CronListener>) -> bool;
}
