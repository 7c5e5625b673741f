use std::{
    any::{TypeId, type_name},
    fmt,
    sync::Arc,
};

use chrono::{DateTime, Utc};

use super::{
    error::{JobExecutionError, SchedulerError},
    key::JobKey,
    listener::ListenerManager,
    trigger::Trigger,
};

/// Unit of work run by the scheduler.
pub trait Job: Send + Sync + 'static {
    fn execute(&self, context: &JobExecutionContext) -> Result<(), JobExecutionError>;
}

/// Runtime identity of a [`Job`] implementation, recorded on a job detail so
/// factories can check what they are asked to build.
#[derive(Clone, Copy)]
pub struct JobType {
    id: TypeId,
    name: &'static str,
}

impl JobType {
    #[must_use]
    pub fn of<J: Job>() -> Self {
        Self {
            id: TypeId::of::<J>(),
            name: type_name::<J>(),
        }
    }

    pub fn is<J: Job>(&self) -> bool {
        self.id == TypeId::of::<J>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for JobType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JobType {}

impl fmt::Debug for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JobType").field(&self.name).finish()
    }
}

/// Descriptor of a stored job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDetail {
    key: JobKey,
    job_type: JobType,
    description: Option<String>,
}

impl JobDetail {
    pub fn new(key: JobKey, job_type: JobType) -> Self {
        Self {
            key,
            job_type,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Everything known about one firing before a job instance exists.
#[derive(Debug, Clone)]
pub struct TriggerFiredBundle {
    pub job_detail: JobDetail,
    pub trigger: Trigger,
    pub fired_at: DateTime<Utc>,
    pub scheduled_fire_time: DateTime<Utc>,
}

/// Passed to the job and to job listeners. `job` is `None` when the factory
/// failed to produce an instance.
#[derive(Clone)]
pub struct JobExecutionContext {
    bundle: TriggerFiredBundle,
    job: Option<Arc<dyn Job>>,
}

impl JobExecutionContext {
    pub fn new(bundle: TriggerFiredBundle, job: Option<Arc<dyn Job>>) -> Self {
        Self { bundle, job }
    }

    pub fn job_detail(&self) -> &JobDetail {
        &self.bundle.job_detail
    }

    pub fn trigger(&self) -> &Trigger {
        &self.bundle.trigger
    }

    pub fn fired_at(&self) -> DateTime<Utc> {
        self.bundle.fired_at
    }

    pub fn scheduled_fire_time(&self) -> DateTime<Utc> {
        self.bundle.scheduled_fire_time
    }

    pub fn job_instance(&self) -> Option<&Arc<dyn Job>> {
        self.job.as_ref()
    }
}

impl fmt::Debug for JobExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobExecutionContext")
            .field("job", &self.bundle.job_detail.key)
            .field("trigger", self.bundle.trigger.key())
            .field("fired_at", &self.bundle.fired_at)
            .field("has_instance", &self.job.is_some())
            .finish()
    }
}

/// Produces the job instance for a firing.
pub trait JobFactory: Send + Sync {
    fn new_job(
        &self,
        bundle: &TriggerFiredBundle,
        listeners: &ListenerManager,
    ) -> Result<Arc<dyn Job>, SchedulerError>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Job for Noop {
        fn execute(&self, _context: &JobExecutionContext) -> Result<(), JobExecutionError> {
            Ok(())
        }
    }

    struct Other;

    impl Job for Other {
        fn execute(&self, _context: &JobExecutionContext) -> Result<(), JobExecutionError> {
            Err(JobExecutionError::new("other"))
        }
    }

    #[test]
    fn job_type_identity() {
        let ty = JobType::of::<Noop>();
        assert!(ty.is::<Noop>());
        assert!(!ty.is::<Other>());
        assert_ne!(ty, JobType::of::<Other>());
        assert!(ty.name().ends_with("Noop"));
    }

    #[test]
    fn detail_builder() {
        let detail = JobDetail::new(JobKey::new("run", "app.Jobs"), JobType::of::<Noop>())
            .with_description("nightly");
        assert_eq!(detail.description(), Some("nightly"));
        assert_eq!(detail.job_type(), JobType::of::<Noop>());
        assert_eq!(detail.key().group, "app.Jobs");
    }
}
