use std::sync::Arc;

use cronrepo_core::{Firing, FiringOutcome, ListenerRegistry};

use crate::engine::{SchedulerListener, TaskExecutor};

/// Forwards runner launch events to the repository's cron listeners.
pub(crate) struct ListenerBridge {
    registry: Arc<ListenerRegistry>,
}

impl ListenerBridge {
    pub(crate) fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self { registry }
    }

    fn firing(executor: &TaskExecutor) -> Firing {
        Firing {
            task_id: executor.task_id().unwrap_or(executor.guid()).to_string(),
            fired_at: executor.launched_at(),
        }
    }
}

impl SchedulerListener for ListenerBridge {
    fn task_launching(&self, executor: &TaskExecutor) {
        self.registry.notify_before(&Self::firing(executor));
    }

    fn task_succeeded(&self, executor: &TaskExecutor) {
        self.registry
            .notify_completed(&Self::firing(executor), FiringOutcome::Succeeded);
    }

    fn task_failed(&self, executor: &TaskExecutor, error: &anyhow::Error) {
        self.registry
            .notify_completed(&Self::firing(executor), FiringOutcome::Failed(&**error));
    }
}
