use std::sync::Arc;

use {
    chrono_tz::Tz,
    cronrepo_core::{
        BoxError, CronExpression, CronListener, CronTaskInfo, CronTaskRepository, Error,
        ExpressionError, ExpressionErrorType, InvocableResolver, LifecycleGuard,
        LifecycleRepository, ListenerRegistry, MethodTaskBody, Result, TaskBody, do_register,
        do_void_invoke, require_non_blank,
    },
    tracing::info,
};

use crate::{
    body::JobDetailTaskBody,
    bridge::ListenerBridge,
    engine::{CronTrigger, JobDetail, JobKey, Scheduler, SchedulerError, Trigger, TriggerKey},
    factory::MethodLevelJobFactory,
    rules::{
        build_standard_job_detail, check_job_key_rules, check_job_type_rules, id_from_job_key,
        job_key_from_id, trigger_expression,
    },
};

const ENGINE: &str = "trigger";

fn expression_error() -> Option<ExpressionErrorType> {
    Some(ExpressionErrorType::of::<ExpressionError>())
}

/// [`CronTaskRepository`] over the structured job engine.
///
/// Accepts [`MethodTaskBody`] and [`JobDetailTaskBody`]. Task ids are the
/// JSON form of the job key, so registering the same method twice fails.
/// Removing an unknown id is an internal error, every time.
pub struct TriggerCronTaskRepository {
    scheduler: Arc<Scheduler>,
    factory: Arc<MethodLevelJobFactory>,
    listeners: Arc<ListenerRegistry>,
    lifecycle: LifecycleGuard,
    timezone: Option<Tz>,
}

impl TriggerCronTaskRepository {
    /// Wire the method job factory and listener bridge into `scheduler`.
    pub fn new(
        scheduler: Arc<Scheduler>,
        resolver: Arc<dyn InvocableResolver>,
        timezone: Option<Tz>,
    ) -> Self {
        let factory = Arc::new(MethodLevelJobFactory::new(resolver));
        scheduler.set_job_factory(Arc::clone(&factory) as _);
        let listeners = Arc::new(ListenerRegistry::new());
        scheduler
            .listener_manager()
            .add_job_listener(Arc::new(ListenerBridge::new(Arc::clone(&listeners))));
        Self {
            scheduler,
            factory,
            listeners,
            lifecycle: LifecycleGuard::new(),
            timezone,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn job_factory(&self) -> &Arc<MethodLevelJobFactory> {
        &self.factory
    }

    fn cron_trigger(&self, key: &JobKey, expression: CronExpression) -> Trigger {
        CronTrigger::new(TriggerKey::from(key), key.clone(), expression)
            .in_timezone(self.timezone)
            .into()
    }

    fn detail_for(body: Box<dyn TaskBody>) -> Result<JobDetail> {
        let kind = body.kind();
        if let Some(method) = body.downcast_ref::<MethodTaskBody>() {
            return Ok(build_standard_job_detail(method.method(), method.declaring_type()));
        }
        body.downcast::<JobDetailTaskBody>()
            .map(|body| body.into_detail())
            .ok_or_else(|| Error::unsupported_body(kind, ENGINE))
    }

    fn info_for(&self, key: &JobKey) -> Option<CronTaskInfo> {
        let detail = self.scheduler.get_job_detail(key)?;
        let trigger = self.scheduler.get_triggers_of_job(key).into_iter().next()?;
        Some(
            CronTaskInfo::new(id_from_job_key(key), trigger_expression(&trigger))
                .with_description(detail.description().map(str::to_string)),
        )
    }
}

impl LifecycleRepository for TriggerCronTaskRepository {
    fn start(&self) -> Result<()> {
        self.lifecycle
            .start_with(|| self.scheduler.start().map_err(Error::internal))
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.stop_with(|| {
            self.scheduler.standby();
            Ok(())
        })
    }

    fn is_started(&self) -> bool {
        self.lifecycle.is_running()
    }
}

impl CronTaskRepository for TriggerCronTaskRepository {
    fn register(&self, expression: &str, body: Box<dyn TaskBody>) -> Result<String> {
        require_non_blank(expression, "expression")?;
        if !self.supports_body(&*body) {
            return Err(Error::unsupported_body(body.kind(), ENGINE));
        }
        let detail = Self::detail_for(body)?;
        check_job_type_rules(detail.job_type())?;
        check_job_key_rules(detail.key(), self.factory.resolver().as_ref())?;

        let key = detail.key().clone();
        let id = do_register(
            || {
                let expression = CronExpression::parse(expression)?;
                self.scheduler
                    .schedule_job(detail, self.cron_trigger(&key, expression))?;
                Ok::<_, BoxError>(id_from_job_key(&key))
            },
            expression_error(),
        )?;
        info!(%id, expression, "cron task registered");
        Ok(id)
    }

    fn supports_body(&self, body: &dyn TaskBody) -> bool {
        body.is::<MethodTaskBody>() || body.is::<JobDetailTaskBody>()
    }

    fn get_cron_task_info(&self, id: &str) -> Option<CronTaskInfo> {
        self.info_for(&job_key_from_id(id)?)
    }

    fn get_all_cron_task_info(&self) -> Vec<CronTaskInfo> {
        self.scheduler
            .get_job_keys()
            .iter()
            .filter_map(|key| self.info_for(key))
            .collect()
    }

    fn update(&self, id: &str, expression: &str) -> Result<()> {
        require_non_blank(id, "id")?;
        require_non_blank(expression, "expression")?;
        do_void_invoke(
            || {
                let expression = CronExpression::parse(expression)?;
                let key = job_key_from_id(id).ok_or_else(|| SchedulerError::job_not_found(id))?;
                let trigger_key = self
                    .scheduler
                    .get_triggers_of_job(&key)
                    .first()
                    .map(|t| t.key().clone())
                    .ok_or_else(|| SchedulerError::trigger_not_found(&key))?;
                self.scheduler
                    .reschedule_job(&trigger_key, self.cron_trigger(&key, expression))?;
                Ok::<_, BoxError>(())
            },
            expression_error(),
        )?;
        info!(id, expression, "cron task updated");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        require_non_blank(id, "id")?;
        do_void_invoke(
            || {
                let key = job_key_from_id(id).ok_or_else(|| SchedulerError::job_not_found(id))?;
                if !self.scheduler.delete_job(&key) {
                    return Err(SchedulerError::job_not_found(&key).into());
                }
                Ok(())
            },
            None,
        )?;
        info!(id, "cron task removed");
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn CronListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn CronListener>) -> bool {
        self.listeners.remove(listener)
    }
}
