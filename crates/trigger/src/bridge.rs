use std::sync::Arc;

use cronrepo_core::{Firing, FiringOutcome, ListenerRegistry};

use crate::{
    engine::{JobExecutionContext, JobExecutionError, JobListener},
    rules::id_from_job_key,
};

pub(crate) const BRIDGE_LISTENER_NAME: &str = "cronrepo-listener-bridge";

/// Forwards engine job events to the repository's cron listeners.
pub(crate) struct ListenerBridge {
    registry: Arc<ListenerRegistry>,
}

impl ListenerBridge {
    pub(crate) fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self { registry }
    }

    fn firing(context: &JobExecutionContext) -> Firing {
        Firing {
            task_id: id_from_job_key(context.job_detail().key()),
            fired_at: context.fired_at(),
        }
    }
}

impl JobListener for ListenerBridge {
    fn name(&self) -> &str {
        BRIDGE_LISTENER_NAME
    }

    fn job_to_be_executed(&self, context: &JobExecutionContext) {
        self.registry.notify_before(&Self::firing(context));
    }

    fn job_was_executed(&self, context: &JobExecutionContext, error: Option<&JobExecutionError>) {
        let outcome = match error {
            Some(e) => FiringOutcome::Failed(e),
            None => FiringOutcome::Succeeded,
        };
        self.registry
            .notify_completed(&Self::firing(context), outcome);
    }
}
