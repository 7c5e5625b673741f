use std::sync::Arc;

use {
    cronrepo_core::{
        BoxError, CronListener, CronTaskInfo, CronTaskRepository, Error, ExpressionErrorType,
        InvocableResolver, LifecycleGuard, LifecycleRepository, ListenerRegistry, MethodTaskBody,
        Result, RunnableTaskBody, TaskBody, do_register, do_void_invoke, require_non_blank,
    },
    tracing::{debug, info},
};

use crate::{
    bridge::ListenerBridge,
    engine::{InvalidPatternError, RunnableTask, RunnerError, Scheduler, SchedulingPattern, Task},
    method_task::MethodTask,
};

const ENGINE: &str = "runner";

fn pattern_error() -> Option<ExpressionErrorType> {
    Some(ExpressionErrorType::of::<InvalidPatternError>())
}

/// [`CronTaskRepository`] over the flat runner engine.
///
/// Accepts [`RunnableTaskBody`], and [`MethodTaskBody`] when built with a
/// resolver. Removing an unknown id does nothing.
pub struct RunnerCronTaskRepository {
    scheduler: Arc<Scheduler>,
    resolver: Option<Arc<dyn InvocableResolver>>,
    listeners: Arc<ListenerRegistry>,
    lifecycle: LifecycleGuard,
}

impl RunnerCronTaskRepository {
    pub fn new(scheduler: Arc<Scheduler>, resolver: Option<Arc<dyn InvocableResolver>>) -> Self {
        let listeners = Arc::new(ListenerRegistry::new());
        scheduler.add_listener(Arc::new(ListenerBridge::new(Arc::clone(&listeners))));
        Self {
            scheduler,
            resolver,
            listeners,
            lifecycle: LifecycleGuard::new(),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    fn task_for(&self, body: &dyn TaskBody) -> Result<Arc<dyn Task>> {
        if let Some(runnable) = body.downcast_ref::<RunnableTaskBody>() {
            return Ok(Arc::new(RunnableTask::new(
                Arc::clone(runnable.runnable()),
                runnable.description().map(str::to_string),
            )));
        }
        match (body.downcast_ref::<MethodTaskBody>(), &self.resolver) {
            (Some(method), Some(resolver)) => Ok(Arc::new(MethodTask::resolve(
                resolver.as_ref(),
                method.declaring_type(),
                method.method(),
            )?)),
            _ => Err(Error::unsupported_body(body.kind(), ENGINE)),
        }
    }

    fn info_for(&self, id: &str) -> Option<CronTaskInfo> {
        let pattern = self.scheduler.get_scheduling_pattern(id)?;
        let description = self
            .scheduler
            .get_task(id)
            .and_then(|task| task.description().map(str::to_string));
        Some(CronTaskInfo::new(id, pattern.as_str()).with_description(description))
    }
}

impl LifecycleRepository for RunnerCronTaskRepository {
    fn start(&self) -> Result<()> {
        self.lifecycle.start_with(|| match self.scheduler.start() {
            Ok(()) | Err(RunnerError::AlreadyStarted) => Ok(()),
            Err(e) => Err(Error::internal(e)),
        })
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.stop_with(|| match self.scheduler.stop() {
            Ok(()) | Err(RunnerError::NotStarted) => Ok(()),
            Err(e) => Err(Error::internal(e)),
        })
    }

    fn is_started(&self) -> bool {
        self.lifecycle.is_running()
    }
}

impl CronTaskRepository for RunnerCronTaskRepository {
    fn register(&self, expression: &str, body: Box<dyn TaskBody>) -> Result<String> {
        require_non_blank(expression, "expression")?;
        if !self.supports_body(&*body) {
            return Err(Error::unsupported_body(body.kind(), ENGINE));
        }
        let pattern = do_register(
            || Ok::<_, BoxError>(SchedulingPattern::parse(expression)?),
            pattern_error(),
        )?;
        let task = self.task_for(&*body)?;
        let id = self.scheduler.schedule(pattern, task);
        info!(%id, expression, "cron task registered");
        Ok(id)
    }

    fn supports_body(&self, body: &dyn TaskBody) -> bool {
        body.is::<RunnableTaskBody>() || (self.resolver.is_some() && body.is::<MethodTaskBody>())
    }

    fn get_cron_task_info(&self, id: &str) -> Option<CronTaskInfo> {
        self.info_for(id)
    }

    fn get_all_cron_task_info(&self) -> Vec<CronTaskInfo> {
        self.scheduler
            .task_ids()
            .iter()
            .filter_map(|id| self.info_for(id))
            .collect()
    }

    fn update(&self, id: &str, expression: &str) -> Result<()> {
        require_non_blank(id, "id")?;
        require_non_blank(expression, "expression")?;
        do_void_invoke(
            || {
                let pattern = SchedulingPattern::parse(expression)?;
                if !self.scheduler.reschedule(id, pattern) {
                    return Err(RunnerError::task_not_found(id).into());
                }
                Ok(())
            },
            pattern_error(),
        )?;
        info!(id, expression, "cron task updated");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        require_non_blank(id, "id")?;
        if self.scheduler.deschedule(id) {
            info!(id, "cron task removed");
        } else {
            debug!(id, "remove of unknown cron task ignored");
        }
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn CronListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn CronListener>) -> bool {
        self.listeners.remove(listener)
    }
}
