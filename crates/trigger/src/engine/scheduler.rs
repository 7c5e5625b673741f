//! Job store, timer loop and bounded worker pool.

use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    chrono::{DateTime, Utc},
    tokio::{
        runtime::Handle,
        sync::{Notify, Semaphore},
        task::JoinHandle,
    },
    tracing::{debug, error, info, warn},
};

use super::{
    error::{JobExecutionError, SchedulerError},
    job::{JobDetail, JobExecutionContext, JobFactory, TriggerFiredBundle},
    key::{JobKey, TriggerKey},
    listener::ListenerManager,
    trigger::{SimpleTrigger, Trigger},
};

/// Idle poll interval when nothing is scheduled.
const IDLE_WAKE: Duration = Duration::from_secs(60);

struct ScheduledTrigger {
    trigger: Trigger,
    next_fire: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    jobs: HashMap<JobKey, JobDetail>,
    triggers: HashMap<TriggerKey, ScheduledTrigger>,
}

impl Store {
    fn triggers_of<'a>(&'a self, key: &'a JobKey) -> impl Iterator<Item = &'a ScheduledTrigger> + 'a {
        self.triggers
            .values()
            .filter(move |s| s.trigger.job_key() == key)
    }
}

pub struct Scheduler {
    name: String,
    store: Mutex<Store>,
    listeners: ListenerManager,
    job_factory: RwLock<Option<Arc<dyn JobFactory>>>,
    workers: Arc<Semaphore>,
    thread_count: usize,
    wake_notify: Arc<Notify>,
    running: AtomicBool,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// `thread_count` bounds how many jobs execute at once (minimum 1).
    pub fn new(name: impl Into<String>, thread_count: usize) -> Arc<Self> {
        let thread_count = thread_count.max(1);
        Arc::new(Self {
            name: name.into(),
            store: Mutex::new(Store::default()),
            listeners: ListenerManager::new(),
            job_factory: RwLock::new(None),
            workers: Arc::new(Semaphore::new(thread_count)),
            thread_count,
            wake_notify: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
            timer_handle: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn listener_manager(&self) -> &ListenerManager {
        &self.listeners
    }

    pub fn set_job_factory(&self, factory: Arc<dyn JobFactory>) {
        *self.job_factory.write().unwrap_or_else(|e| e.into_inner()) = Some(factory);
    }

    pub fn job_factory(&self) -> Option<Arc<dyn JobFactory>> {
        self.job_factory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Job store ───────────────────────────────────────────────────────

    /// Store `detail` and schedule it with `trigger`. Returns the first fire
    /// time.
    pub fn schedule_job(&self, detail: JobDetail, mut trigger: Trigger) -> Result<DateTime<Utc>, SchedulerError> {
        let now = Utc::now();
        let mut store = self.store();
        if store.jobs.contains_key(detail.key()) {
            return Err(SchedulerError::ObjectAlreadyExists(detail.key().to_string()));
        }
        if store.triggers.contains_key(trigger.key()) {
            return Err(SchedulerError::ObjectAlreadyExists(trigger.key().to_string()));
        }
        trigger.set_job_key(detail.key().clone());
        let next_fire = trigger
            .first_fire_time(now)
            .ok_or_else(|| SchedulerError::TriggerNeverFires(trigger.key().to_string()))?;

        info!(scheduler = %self.name, job = %detail.key(), next_fire = %next_fire, "job scheduled");
        store.jobs.insert(detail.key().clone(), detail);
        store
            .triggers
            .insert(trigger.key().clone(), ScheduledTrigger { trigger, next_fire });
        drop(store);

        self.wake_notify.notify_one();
        Ok(next_fire)
    }

    /// Replace the trigger at `key` with `trigger`, keeping the job.
    pub fn reschedule_job(&self, key: &TriggerKey, mut trigger: Trigger) -> Result<DateTime<Utc>, SchedulerError> {
        let now = Utc::now();
        let mut store = self.store();
        let existing = store
            .triggers
            .get(key)
            .ok_or_else(|| SchedulerError::trigger_not_found(key))?;
        trigger.set_job_key(existing.trigger.job_key().clone());
        if trigger.key() != key && store.triggers.contains_key(trigger.key()) {
            return Err(SchedulerError::ObjectAlreadyExists(trigger.key().to_string()));
        }
        let next_fire = trigger
            .first_fire_time(now)
            .ok_or_else(|| SchedulerError::TriggerNeverFires(trigger.key().to_string()))?;

        store.triggers.remove(key);
        info!(scheduler = %self.name, trigger = %key, next_fire = %next_fire, "job rescheduled");
        store
            .triggers
            .insert(trigger.key().clone(), ScheduledTrigger { trigger, next_fire });
        drop(store);

        self.wake_notify.notify_one();
        Ok(next_fire)
    }

    /// Remove a job and all of its triggers. Returns whether it existed.
    pub fn delete_job(&self, key: &JobKey) -> bool {
        let mut store = self.store();
        let existed = store.jobs.remove(key).is_some();
        store.triggers.retain(|_, s| s.trigger.job_key() != key);
        drop(store);
        if existed {
            info!(scheduler = %self.name, job = %key, "job deleted");
            self.wake_notify.notify_one();
        }
        existed
    }

    pub fn check_exists(&self, key: &JobKey) -> bool {
        self.store().jobs.contains_key(key)
    }

    pub fn get_job_detail(&self, key: &JobKey) -> Option<JobDetail> {
        self.store().jobs.get(key).cloned()
    }

    pub fn get_triggers_of_job(&self, key: &JobKey) -> Vec<Trigger> {
        let store = self.store();
        let mut triggers: Vec<Trigger> = store.triggers_of(key).map(|s| s.trigger.clone()).collect();
        triggers.sort_by(|a, b| a.key().cmp(b.key()));
        triggers
    }

    /// All stored job keys, sorted.
    pub fn get_job_keys(&self) -> Vec<JobKey> {
        let mut keys: Vec<JobKey> = self.store().jobs.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn next_fire_time(&self, key: &TriggerKey) -> Option<DateTime<Utc>> {
        self.store().triggers.get(key).map(|s| s.next_fire)
    }

    /// Fire `key` once, now, outside its schedule.
    pub fn trigger_job(self: &Arc<Self>, key: &JobKey) -> Result<(), SchedulerError> {
        let handle = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let detail = self
            .get_job_detail(key)
            .ok_or_else(|| SchedulerError::job_not_found(key))?;
        let now = Utc::now();
        let trigger_key = TriggerKey::new(uuid::Uuid::new_v4().to_string(), "MANUAL_TRIGGER");
        let bundle = TriggerFiredBundle {
            job_detail: detail,
            trigger: SimpleTrigger::once(trigger_key, key.clone(), now).into(),
            fired_at: now,
            scheduled_fire_time: now,
        };
        debug!(scheduler = %self.name, job = %key, "manual trigger");
        self.dispatch(&handle, bundle);
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Start the timer loop on the current tokio runtime. Starting twice is
    /// a no-op. Fire times missed while in standby are skipped.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let handle = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let now = Utc::now();
        {
            let mut store = self.store();
            let Store { jobs, triggers } = &mut *store;
            triggers.retain(|key, s| match s.trigger.resume_fire_time(s.next_fire, now) {
                Some(next) => {
                    s.next_fire = next;
                    true
                },
                None => {
                    debug!(trigger = %key, "dropping exhausted trigger on start");
                    false
                },
            });
            jobs.retain(|key, _| triggers.values().any(|s| s.trigger.job_key() == key));
        }

        let scheduler = Arc::clone(self);
        let timer = handle.spawn(async move {
            scheduler.timer_loop().await;
        });
        *self.timer_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer);
        info!(scheduler = %self.name, threads = self.thread_count, "scheduler started");
        Ok(())
    }

    /// Stop firing. Jobs already running finish on their own.
    pub fn standby(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
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
        info!(scheduler = %self.name, "scheduler in standby");
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
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !self.is_started() {
                break;
            }

            for bundle in self.acquire_due(Utc::now()) {
                self.dispatch(&handle, bundle);
            }
        }
    }

    fn until_next_fire(&self) -> Duration {
        let now = Utc::now();
        self.store()
            .triggers
            .values()
            .map(|s| (s.next_fire - now).to_std().unwrap_or(Duration::ZERO))
            .min()
            .unwrap_or(IDLE_WAKE)
    }

    /// Take every due trigger, advance it, and drop exhausted ones together
    /// with jobs left without triggers.
    fn acquire_due(&self, now: DateTime<Utc>) -> Vec<TriggerFiredBundle> {
        let mut store = self.store();
        let Store { jobs, triggers } = &mut *store;
        let mut fired = Vec::new();
        let mut exhausted = Vec::new();

        for (key, scheduled) in triggers.iter_mut() {
            if scheduled.next_fire > now {
                continue;
            }
            let Some(detail) = jobs.get(scheduled.trigger.job_key()) else {
                exhausted.push(key.clone());
                continue;
            };
            fired.push(TriggerFiredBundle {
                job_detail: detail.clone(),
                trigger: scheduled.trigger.clone(),
                fired_at: now,
                scheduled_fire_time: scheduled.next_fire,
            });
            // Simple triggers count intervals from their schedule, cron
            // triggers resume from the current time.
            let base = match scheduled.trigger {
                Trigger::Simple(_) => scheduled.next_fire,
                Trigger::Cron(_) => now,
            };
            match scheduled.trigger.next_fire_after(base) {
                Some(next) => scheduled.next_fire = next,
                None => exhausted.push(key.clone()),
            }
        }

        for key in exhausted {
            if let Some(done) = triggers.remove(&key) {
                let job_key = done.trigger.job_key();
                if !triggers.values().any(|s| s.trigger.job_key() == job_key) {
                    jobs.remove(job_key);
                    debug!(job = %job_key, "trigger exhausted, job removed");
                }
            }
        }
        fired
    }

    fn dispatch(self: &Arc<Self>, handle: &Handle, bundle: TriggerFiredBundle) {
        let scheduler = Arc::clone(self);
        let workers = Arc::clone(&self.workers);
        handle.spawn(async move {
            let Ok(permit) = workers.acquire_owned().await else {
                return;
            };
            let job = bundle.job_detail.key().clone();
            let run = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                scheduler.run_bundle(bundle);
            });
            if let Err(e) = run.await {
                error!(job = %job, error = %e, "job worker failed");
            }
        });
    }

    fn run_bundle(&self, bundle: TriggerFiredBundle) {
        let key = bundle.job_detail.key().clone();
        let job = match self.job_factory() {
            Some(factory) => factory.new_job(&bundle, &self.listeners),
            None => Err(SchedulerError::NoJobFactory),
        };
        let job = match job {
            Ok(job) => job,
            Err(e) => {
                error!(job = %key, error = %e, "job could not be instantiated");
                return;
            },
        };

        let context = JobExecutionContext::new(bundle, Some(Arc::clone(&job)));
        self.listeners.notify_to_be_executed(&context);
        debug!(job = %key, "executing job");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.execute(&context)))
            .unwrap_or_else(|payload| Err(JobExecutionError::panicked(payload)));
        if let Err(e) = &outcome {
            warn!(job = %key, error = %e, "job failed");
        }
        self.listeners
            .notify_was_executed(&context, outcome.as_ref().err());
    }
}
