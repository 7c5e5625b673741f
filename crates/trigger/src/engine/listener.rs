use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, RwLock},
};

use tracing::warn;

use super::{error::JobExecutionError, job::JobExecutionContext};

/// Observes job executions. Listener names are unique per manager.
pub trait JobListener: Send + Sync {
    fn name(&self) -> &str;

    fn job_to_be_executed(&self, _context: &JobExecutionContext) {}

    fn job_was_executed(&self, _context: &JobExecutionContext, _error: Option<&JobExecutionError>) {}
}

#[derive(Default)]
pub struct ListenerManager {
    listeners: RwLock<Vec<Arc<dyn JobListener>>>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener, replacing any listener with the same name.
    pub fn add_job_listener(&self, listener: Arc<dyn JobListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|l| l.name() != listener.name());
        listeners.push(listener);
    }

    pub fn remove_job_listener(&self, name: &str) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|l| l.name() != name);
        before != listeners.len()
    }

    pub fn job_listeners(&self) -> Vec<Arc<dyn JobListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn notify_to_be_executed(&self, context: &JobExecutionContext) {
        for listener in self.job_listeners() {
            isolate(listener.as_ref(), "job_to_be_executed", || {
                listener.job_to_be_executed(context);
            });
        }
    }

    pub fn notify_was_executed(&self, context: &JobExecutionContext, error: Option<&JobExecutionError>) {
        for listener in self.job_listeners() {
            isolate(listener.as_ref(), "job_was_executed", || {
                listener.job_was_executed(context, error);
            });
        }
    }
}

fn isolate(listener: &dyn JobListener, hook: &'static str, call: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
        warn!(listener = listener.name(), hook, "job listener panicked");
    }
}
