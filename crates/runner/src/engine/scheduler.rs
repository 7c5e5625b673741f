//! Flat pattern scheduler: tasks keyed by generated ids, each fired on its
//! own [`SchedulingPattern`]. Every launch runs on the blocking pool.

use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    tokio::{runtime::Handle, sync::Notify, task::JoinHandle},
    tracing::{debug, info, warn},
};

use super::{
    error::{Result, RunnerError},
    listener::{SchedulerListener, SchedulerListeners},
    pattern::SchedulingPattern,
    task::{Task, TaskExecutor},
};

const IDLE_WAKE: Duration = Duration::from_secs(60);

struct Entry {
    pattern: SchedulingPattern,
    task: Arc<dyn Task>,
    next_fire: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    entries: Mutex<HashMap<String, Entry>>,
    listeners: SchedulerListeners,
    timezone: Option<Tz>,
    wake_notify: Arc<Notify>,
    running: AtomicBool,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Patterns are evaluated in `timezone`, or UTC when `None`.
    pub fn new(timezone: Option<Tz>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            listeners: SchedulerListeners::default(),
            timezone,
            wake_notify: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
            timer_handle: Mutex::new(None),
        })
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_fire(&self, pattern: &SchedulingPattern, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        pattern.next_after(&after, self.timezone.as_ref())
    }

    /// Schedule `task` and return its new id.
    pub fn schedule(&self, pattern: SchedulingPattern, task: Arc<dyn Task>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let next_fire = self.next_fire(&pattern, Utc::now());
        if next_fire.is_none() {
            warn!(task = %id, pattern = %pattern, "pattern has no future fire time");
        }
        self.entries().insert(id.clone(), Entry {
            pattern,
            task,
            next_fire,
        });
        self.wake_notify.notify_one();
        debug!(task = %id, "task scheduled");
        id
    }

    /// Replace the pattern of `id`. Returns `false` when `id` is unknown.
    pub fn reschedule(&self, id: &str, pattern: SchedulingPattern) -> bool {
        let next_fire = self.next_fire(&pattern, Utc::now());
        let found = match self.entries().get_mut(id) {
            Some(entry) => {
                entry.pattern = pattern;
                entry.next_fire = next_fire;
                true
            },
            None => false,
        };
        if found {
            self.wake_notify.notify_one();
        }
        found
    }

    /// Returns `false` when `id` is unknown.
    pub fn deschedule(&self, id: &str) -> bool {
        self.entries().remove(id).is_some()
    }

    pub fn get_task(&self, id: &str) -> Option<Arc<dyn Task>> {
        self.entries().get(id).map(|e| Arc::clone(&e.task))
    }

    pub fn get_scheduling_pattern(&self, id: &str) -> Option<SchedulingPattern> {
        self.entries().get(id).map(|e| e.pattern.clone())
    }

    pub fn next_fire_time(&self, id: &str) -> Option<DateTime<Utc>> {
        self.entries().get(id).and_then(|e| e.next_fire)
    }

    /// Ids of every scheduled task, sorted.
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn add_listener(&self, listener: Arc<dyn SchedulerListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SchedulerListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn listeners(&self) -> Vec<Arc<dyn SchedulerListener>> {
        self.listeners.snapshot()
    }

    /// Run `task` once, now, outside any schedule.
    pub fn launch(self: &Arc<Self>, task: Arc<dyn Task>) -> Result<TaskExecutor> {
        if !self.is_started() {
            return Err(RunnerError::NotStarted);
        }
        let handle = Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        let executor = TaskExecutor::new(None, task);
        self.spawn_executor(&handle, executor.clone());
        Ok(executor)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub fn start(self: &Arc<Self>) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RunnerError::AlreadyStarted);
        }

        let now = Utc::now();
        for entry in self.entries().values_mut() {
            entry.next_fire = self.next_fire(&entry.pattern, now);
        }

        let scheduler = Arc::clone(self);
        let timer = handle.spawn(async move {
            scheduler.timer_loop().await;
        });
        *self.timer_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer);
        info!(timezone = ?self.timezone, "runner scheduler started");
        Ok(())
    }

    /// Stop launching. Tasks already running finish on their own.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(RunnerError::NotStarted);
        }
        self.wake_notify.notify_one();
        if let Some(timer) = self
            .timer_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            timer.abort();
        }
        info!("runner scheduler stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: Arc<Self>) {
        let handle = Handle::current();
        loop {
            if !self.is_started() {
                break;
            }

            let wait = self.until_next_fire();
            if !wait.is_zero() {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(wait) => {},
                    () = notify.notified() => {
                        debug!("runner timer woken by notify");
                        continue;
                    },
                }
            }

            if !self.is_started() {
                break;
            }

            for executor in self.acquire_due(Utc::now()) {
                self.spawn_executor(&handle, executor);
            }
        }
    }

    fn until_next_fire(&self) -> Duration {
        let now = Utc::now();
        self.entries()
            .values()
            .filter_map(|e| e.next_fire)
            .map(|t| (t - now).to_std().unwrap_or(Duration::ZERO))
            .min()
            .unwrap_or(IDLE_WAKE)
    }

    fn acquire_due(&self, now: DateTime<Utc>) -> Vec<TaskExecutor> {
        let mut entries = self.entries();
        let mut due = Vec::new();
        for (id, entry) in entries.iter_mut() {
            if entry.next_fire.is_none_or(|t| t > now) {
                continue;
            }
            due.push(TaskExecutor::new(Some(id.clone()), Arc::clone(&entry.task)));
            entry.next_fire = self.next_fire(&entry.pattern, now);
        }
        due
    }

    fn spawn_executor(self: &Arc<Self>, handle: &Handle, executor: TaskExecutor) {
        let scheduler = Arc::clone(self);
        handle.spawn_blocking(move || scheduler.run(&executor));
    }

    fn run(&self, executor: &TaskExecutor) {
        self.listeners
            .each("task_launching", executor, |l| l.task_launching(executor));
        debug!(guid = executor.guid(), task = ?executor.task_id(), "launching task");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.task().execute(executor)))
            .unwrap_or_else(|payload| Err(panicked(payload)));
        match outcome {
            Ok(()) => self
                .listeners
                .each("task_succeeded", executor, |l| l.task_succeeded(executor)),
            Err(e) => {
                warn!(guid = executor.guid(), task = ?executor.task_id(), error = %e, "task failed");
                self.listeners
                    .each("task_failed", executor, |l| l.task_failed(executor, &e));
            },
        }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("task panicked: {detail}")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::atomic::AtomicUsize};

    struct Counting(Arc<AtomicUsize>);

    impl Task for Counting {
        fn execute(&self, _executor: &TaskExecutor) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn description(&self) -> Option<&str> {
            Some("counting")
        }
    }

    struct Exploding;

    impl Task for Exploding {
        fn execute(&self, _executor: &TaskExecutor) -> anyhow::Result<()> {
            panic!("boom");
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl SchedulerListener for Events {
        fn task_launching(&self, executor: &TaskExecutor) {
            self.0
                .lock()
                .unwrap()
                .push(format!("launching {}", executor.task_id().unwrap_or("-")));
        }

        fn task_succeeded(&self, _executor: &TaskExecutor) {
            self.0.lock().unwrap().push("succeeded".into());
        }

        fn task_failed(&self, _executor: &TaskExecutor, error: &anyhow::Error) {
            self.0.lock().unwrap().push(format!("failed {error}"));
        }
    }

    fn pattern(p: &str) -> SchedulingPattern {
        SchedulingPattern::parse(p).unwrap()
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..300 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn table_operations() {
        let scheduler = Scheduler::new(None);
        let counter = Arc::new(AtomicUsize::new(0));
        let id = scheduler.schedule(pattern("0 5 * * *"), Arc::new(Counting(Arc::clone(&counter))));

        assert_eq!(scheduler.task_ids(), vec![id.clone()]);
        assert_eq!(scheduler.get_scheduling_pattern(&id).unwrap().as_str(), "0 5 * * *");
        assert_eq!(scheduler.get_task(&id).unwrap().description(), Some("counting"));
        assert!(scheduler.next_fire_time(&id).is_some());

        assert!(scheduler.reschedule(&id, pattern("0 6 * * *")));
        assert_eq!(scheduler.get_scheduling_pattern(&id).unwrap().as_str(), "0 6 * * *");
        assert!(!scheduler.reschedule("missing", pattern("0 6 * * *")));

        assert!(scheduler.deschedule(&id));
        assert!(!scheduler.deschedule(&id));
        assert!(scheduler.get_task(&id).is_none());
        assert!(scheduler.task_ids().is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let scheduler = Scheduler::new(None);
        let counter = Arc::new(AtomicUsize::new(0));
        let a = scheduler.schedule(pattern("* * * * *"), Arc::new(Counting(Arc::clone(&counter))));
        let b = scheduler.schedule(pattern("* * * * *"), Arc::new(Counting(counter)));
        assert_ne!(a, b);
    }

    #[test]
    fn start_requires_runtime() {
        let scheduler = Scheduler::new(None);
        assert!(matches!(scheduler.start(), Err(RunnerError::NoRuntime)));
        assert!(!scheduler.is_started());
    }

    #[tokio::test]
    async fn start_and_stop_report_wrong_state() {
        let scheduler = Scheduler::new(None);
        assert!(matches!(scheduler.stop(), Err(RunnerError::NotStarted)));
        scheduler.start().unwrap();
        assert!(matches!(scheduler.start(), Err(RunnerError::AlreadyStarted)));
        scheduler.stop().unwrap();
        assert!(!scheduler.is_started());
    }

    #[tokio::test]
    async fn fires_on_seconds_pattern() {
        let scheduler = Scheduler::new(None);
        let counter = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(Events::default());
        scheduler.add_listener(Arc::clone(&events) as Arc<dyn SchedulerListener>);
        let id = scheduler.schedule(pattern("* * * * * *"), Arc::new(Counting(Arc::clone(&counter))));

        scheduler.start().unwrap();
        wait_for(|| counter.load(Ordering::SeqCst) >= 1 && events.0.lock().unwrap().len() >= 2).await;
        scheduler.stop().unwrap();

        let seen = events.0.lock().unwrap().clone();
        assert_eq!(seen[0], format!("launching {id}"));
        assert_eq!(seen[1], "succeeded");
    }

    #[tokio::test]
    async fn launch_requires_started_scheduler() {
        let scheduler = Scheduler::new(None);
        let counter = Arc::new(AtomicUsize::new(0));
        let task: Arc<dyn Task> = Arc::new(Counting(Arc::clone(&counter)));
        assert!(matches!(scheduler.launch(Arc::clone(&task)), Err(RunnerError::NotStarted)));

        scheduler.start().unwrap();
        let executor = scheduler.launch(task).unwrap();
        assert!(executor.task_id().is_none());
        wait_for(|| counter.load(Ordering::SeqCst) == 1).await;
        scheduler.stop().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_task_reports_failure() {
        let scheduler = Scheduler::new(None);
        let events = Arc::new(Events::default());
        let listener = Arc::clone(&events) as Arc<dyn SchedulerListener>;
        scheduler.add_listener(Arc::clone(&listener));

        scheduler.start().unwrap();
        scheduler.launch(Arc::new(Exploding)).unwrap();
        wait_for(|| events.0.lock().unwrap().len() >= 2).await;
        scheduler.stop().unwrap();

        let seen = events.0.lock().unwrap().clone();
        assert_eq!(seen, vec!["launching -".to_string(), "failed task panicked: boom".to_string()]);
        assert!(scheduler.remove_listener(&listener));
        assert!(scheduler.listeners().is_empty());
    }
}
