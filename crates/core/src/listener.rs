//! Listener fan-out around task firings.
//!
//! Listeners are notified synchronously and one after another. The order is
//! ascending [`CronListener::order`]; listeners without an order run after
//! every ordered one; ties keep insertion order. A listener that fails or
//! panics is logged and skipped, the remaining listeners still run.

use std::{
    error::Error as StdError,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    chrono::{DateTime, Utc},
    tracing::{debug, warn},
};

/// One firing of one task, as seen by listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub task_id: String,
    pub fired_at: DateTime<Utc>,
}

impl Firing {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            fired_at: Utc::now(),
        }
    }
}

/// How a firing ended.
#[derive(Clone, Copy)]
pub enum FiringOutcome<'a> {
    Succeeded,
    Failed(&'a (dyn StdError + 'static)),
}

impl FiringOutcome<'_> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Debug for FiringOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed(err) => f.debug_tuple("Failed").field(&err.to_string()).finish(),
        }
    }
}

/// Hooks invoked around every firing. All hooks default to no-ops.
pub trait CronListener: Send + Sync {
    fn on_before(&self, _firing: &Firing) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_success(&self, _firing: &Firing) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_failure(&self, _firing: &Firing, _error: &(dyn StdError + 'static)) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after `on_success` / `on_failure`, whatever the outcome.
    fn on_after(&self, _firing: &Firing, _outcome: FiringOutcome<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Explicit ordering; lower runs first.
    fn order(&self) -> Option<i32> {
        None
    }
}

struct Entry {
    order: Option<i32>,
    seq: u64,
    listener: Arc<dyn CronListener>,
}

impl Entry {
    fn sort_key(&self) -> (bool, i32, u64) {
        match self.order {
            Some(order) => (false, order, self.seq),
            None => (true, 0, self.seq),
        }
    }
}

/// Ordered, snapshot-iterated listener collection owned by one repository.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RwLock<Vec<Entry>>,
    next_seq: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn CronListener>) {
        let entry = Entry {
            order: listener.order(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            listener,
        };
        let key = entry.sort_key();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let at = entries.partition_point(|e| e.sort_key() <= key);
        entries.insert(at, entry);
    }

    /// Remove by pointer identity. Returns whether anything was removed.
    pub fn remove(&self, listener: &Arc<dyn CronListener>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| !Arc::ptr_eq(&e.listener, listener));
        before != entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Listeners in notification order, detached from later mutations.
    pub fn snapshot(&self) -> Vec<Arc<dyn CronListener>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|e| Arc::clone(&e.listener))
            .collect()
    }

    pub fn notify_before(&self, firing: &Firing) {
        self.dispatch("on_before", firing, |l| l.on_before(firing));
    }

    pub fn notify_success(&self, firing: &Firing) {
        self.dispatch("on_success", firing, |l| l.on_success(firing));
    }

    pub fn notify_failure(&self, firing: &Firing, error: &(dyn StdError + 'static)) {
        self.dispatch("on_failure", firing, |l| l.on_failure(firing, error));
    }

    pub fn notify_after(&self, firing: &Firing, outcome: FiringOutcome<'_>) {
        self.dispatch("on_after", firing, |l| l.on_after(firing, outcome));
    }

    /// `on_success` or `on_failure`, then `on_after`.
    pub fn notify_completed(&self, firing: &Firing, outcome: FiringOutcome<'_>) {
        match outcome {
            FiringOutcome::Succeeded => self.notify_success(firing),
            FiringOutcome::Failed(err) => self.notify_failure(firing, err),
        }
        self.notify_after(firing, outcome);
    }

    fn dispatch<F>(&self, hook: &'static str, firing: &Firing, call: F)
    where
        F: Fn(&dyn CronListener) -> anyhow::Result<()>,
    {
        let listeners = self.snapshot();
        debug!(task_id = %firing.task_id, hook, count = listeners.len(), "notifying cron listeners");
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref()))) {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    warn!(task_id = %firing.task_id, hook, error = %e, "cron listener failed");
                },
                Err(_) => {
                    warn!(task_id = %firing.task_id, hook, "cron listener panicked");
                },
            }
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
