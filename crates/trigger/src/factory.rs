use std::{
    fmt,
    sync::{Arc, Mutex},
};

use {
    cronrepo_core::{Error, InvocableResolver, Result},
    dashmap::DashMap,
    tracing::{debug, error},
};

use crate::{
    engine::{
        Job, JobExecutionContext, JobExecutionError, JobFactory, JobKey, ListenerManager,
        SchedulerError, TriggerFiredBundle,
    },
    method_job::MethodLevelJob,
    rules::{check_job_key_rules, check_job_type_rules, job_identity},
};

type Slot = Arc<Mutex<Option<Arc<MethodLevelJob>>>>;

/// Builds [`MethodLevelJob`]s, one per `(declaring type, method)` pair.
///
/// The first firing of a pair resolves and instantiates it; every later
/// firing reuses the cached job. Each pair resolves under its own slot lock,
/// so concurrent first firings share one instance while a constructor may
/// still ask the factory for other pairs. Cached jobs live as long as the
/// factory, which bounds the cache by the registered methods.
pub struct MethodLevelJobFactory {
    resolver: Arc<dyn InvocableResolver>,
    cache: DashMap<String, Slot>,
}

impl MethodLevelJobFactory {
    pub fn new(resolver: Arc<dyn InvocableResolver>) -> Self {
        Self {
            resolver,
            cache: DashMap::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn InvocableResolver> {
        &self.resolver
    }

    /// Cached job for `key`, created on first use.
    pub fn method_job(&self, key: &JobKey) -> Result<Arc<MethodLevelJob>> {
        check_job_key_rules(key, self.resolver.as_ref())?;
        let identity = job_identity(key);
        // The map entry guard drops here; only the slot stays locked.
        let slot = Arc::clone(self.cache.entry(identity.clone()).or_default().value());
        let mut cached = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = cached.as_ref() {
            return Ok(Arc::clone(job));
        }
        let bound = self
            .resolver
            .resolve(&key.group, &key.name)
            .map_err(|e| Error::illegal_state(e.to_string()))?;
        let job = Arc::new(MethodLevelJob::new(identity, bound));
        debug!(job = %job.identity(), "method job cached");
        *cached = Some(Arc::clone(&job));
        Ok(job)
    }

    pub fn cached_jobs(&self) -> usize {
        self.cache
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()).is_some())
            .count()
    }
}

impl JobFactory for MethodLevelJobFactory {
    fn new_job(
        &self,
        bundle: &TriggerFiredBundle,
        listeners: &ListenerManager,
    ) -> std::result::Result<Arc<dyn Job>, SchedulerError> {
        let key = bundle.job_detail.key();
        if let Err(e) = check_job_type_rules(bundle.job_detail.job_type()) {
            // Supervisors must hear about this firing even though no job ran.
            let failure = JobExecutionError::new(e.to_string());
            let context = JobExecutionContext::new(bundle.clone(), None);
            listeners.notify_was_executed(&context, Some(&failure));
            error!(job = %key, error = %e, "job type rejected");
            return Err(SchedulerError::job_instantiation(key, e));
        }
        let job = self
            .method_job(key)
            .map_err(|e| SchedulerError::job_instantiation(key, e))?;
        Ok(job)
    }
}

impl fmt::Debug for MethodLevelJobFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodLevelJobFactory")
            .field("cached_jobs", &self.cached_jobs())
            .finish_non_exhaustive()
    }
}
