//! Identity conventions for method jobs.
//!
//! A method job's key is `name = method`, `group = declaring type`. Keys are
//! validated eagerly at registration and again when the job factory builds
//! the job, since job details can reach the scheduler without going through
//! the repository.

use {
    cronrepo_core::{Error, InvocableResolver, Result},
    tracing::warn,
};

use crate::{
    engine::{JobDetail, JobKey, JobType, Trigger},
    method_job::MethodLevelJob,
};

/// Only [`MethodLevelJob`] details can be run by the method job factory.
pub fn check_job_type_rules(job_type: JobType) -> Result<()> {
    if job_type.is::<MethodLevelJob>() {
        return Ok(());
    }
    Err(Error::invalid_argument(format!(
        "job type <{}> is not supported, expected <{}>",
        job_type.name(),
        JobType::of::<MethodLevelJob>().name()
    )))
}

/// Blank segments are malformed input; segments that do not resolve are a
/// configuration problem.
pub fn check_job_key_rules(key: &JobKey, resolver: &dyn InvocableResolver) -> Result<()> {
    if key.group.trim().is_empty() {
        return Err(Error::invalid_argument(
            "job group must name the declaring type",
        ));
    }
    if key.name.trim().is_empty() {
        return Err(Error::invalid_argument("job name must name the method"));
    }
    if !resolver.has_type(&key.group) {
        warn!(job = %key, "declaring type is not registered");
        return Err(Error::illegal_state(format!(
            "declaring type <{}> cannot be resolved",
            key.group
        )));
    }
    if !resolver.has_method(&key.group, &key.name) {
        warn!(job = %key, "method is not registered");
        return Err(Error::illegal_state(format!(
            "method <{}> cannot be resolved on <{}>",
            key.name, key.group
        )));
    }
    Ok(())
}

pub fn build_standard_job_detail(method: &str, declaring_type: &str) -> JobDetail {
    JobDetail::new(
        JobKey::new(method, declaring_type),
        JobType::of::<MethodLevelJob>(),
    )
}

/// Cache identity of a method job: `<declaring type>@<method>`.
pub fn job_identity(key: &JobKey) -> String {
    format!("{}@{}", key.group, key.name)
}

/// Task id handed out by the repository: the job key as JSON.
pub fn id_from_job_key(key: &JobKey) -> String {
    serde_json::json!({ "name": key.name, "group": key.group }).to_string()
}

/// Parse a task id back into a job key. Anything malformed is `None`.
pub fn job_key_from_id(id: &str) -> Option<JobKey> {
    serde_json::from_str(id).ok()
}

/// Cron triggers report their expression. Other triggers are described by
/// their JSON form, which cannot be parsed back into an expression.
pub fn trigger_expression(trigger: &Trigger) -> String {
    match trigger.as_cron() {
        Some(cron) => cron.expression().as_str().to_string(),
        None => serde_json::to_string(trigger).unwrap_or_else(|_| format!("{trigger:?}")),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::engine::{CronTrigger, JobExecutionContext, JobExecutionError, SimpleTrigger, TriggerKey},
        chrono::Utc,
        cronrepo_core::{CronExpression, ErrorKind, MethodRegistry},
        rstest::rstest,
    };

    struct Plain;

    impl crate::engine::Job for Plain {
        fn execute(&self, _context: &JobExecutionContext) -> std::result::Result<(), JobExecutionError> {
            Ok(())
        }
    }

    struct Reports;

    fn resolver() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        let _ = registry
            .register_type("app.Reports", || Ok(Reports))
            .method("daily", |_: &Reports| Ok(()));
        registry
    }

    #[test]
    fn job_type_rules() {
        assert!(check_job_type_rules(JobType::of::<MethodLevelJob>()).is_ok());
        let err = check_job_type_rules(JobType::of::<Plain>()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("Plain"));
    }

    #[rstest]
    #[case("daily", "app.Reports", None)]
    #[case("daily", " ", Some(ErrorKind::InvalidInput))]
    #[case("", "app.Reports", Some(ErrorKind::InvalidInput))]
    #[case("daily", "app.Missing", Some(ErrorKind::Configuration))]
    #[case("weekly", "app.Reports", Some(ErrorKind::Configuration))]
    fn job_key_rules(#[case] name: &str, #[case] group: &str, #[case] expected: Option<ErrorKind>) {
        let result = check_job_key_rules(&JobKey::new(name, group), &resolver());
        assert_eq!(result.err().map(|e| e.kind()), expected);
    }

    #[test]
    fn standard_detail_follows_convention() {
        let detail = build_standard_job_detail("daily", "app.Reports");
        assert_eq!(detail.key(), &JobKey::new("daily", "app.Reports"));
        assert!(detail.job_type().is::<MethodLevelJob>());
        assert_eq!(job_identity(detail.key()), "app.Reports@daily");
    }

    #[test]
    fn ids_round_trip_through_json() {
        let key = JobKey::new("daily", "app.Reports");
        let id = id_from_job_key(&key);
        let v: serde_json::Value = serde_json::from_str(&id).unwrap();
        assert_eq!(v["group"], "app.Reports");
        assert_eq!(v["name"], "daily");
        assert_eq!(job_key_from_id(&id), Some(key));
        assert_eq!(job_key_from_id("not json"), None);
        assert_eq!(job_key_from_id(r#"{"name":"x"}"#), None);
    }

    #[test]
    fn expression_of_cron_and_simple_triggers() {
        let key = JobKey::new("daily", "app.Reports");
        let cron: Trigger = CronTrigger::new(
            TriggerKey::from(&key),
            key.clone(),
            CronExpression::parse("0 15 10 * * *").unwrap(),
        )
        .into();
        assert_eq!(trigger_expression(&cron), "0 15 10 * * *");

        let simple: Trigger = SimpleTrigger::new(TriggerKey::from(&key), key, Utc::now(), 1000, None).into();
        let described = trigger_expression(&simple);
        let v: serde_json::Value = serde_json::from_str(&described).unwrap();
        assert_eq!(v["kind"], "simple");
        assert_eq!(v["intervalMs"], 1000);
    }
}
