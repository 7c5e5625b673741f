use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, RwLock},
};

use tracing::warn;

use super::task::TaskExecutor;

/// Observer of task launches.
pub trait SchedulerListener: Send + Sync {
    fn task_launching(&self, _executor: &TaskExecutor) {}

    fn task_succeeded(&self, _executor: &TaskExecutor) {}

    fn task_failed(&self, _executor: &TaskExecutor, _error: &anyhow::Error) {}
}

#[derive(Default)]
pub(crate) struct SchedulerListeners {
    listeners: RwLock<Vec<Arc<dyn SchedulerListener>>>,
}

impl SchedulerListeners {
    pub(crate) fn add(&self, listener: Arc<dyn SchedulerListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn SchedulerListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn SchedulerListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn each<F>(&self, event: &'static str, executor: &TaskExecutor, call: F)
    where
        F: Fn(&dyn SchedulerListener),
    {
        for listener in self.snapshot() {
            if panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref()))).is_err() {
                warn!(event, guid = executor.guid(), "scheduler listener panicked");
            }
        }
    }
}
