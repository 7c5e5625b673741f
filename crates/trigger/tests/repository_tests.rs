#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    error::Error as StdError,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    cronrepo_core::{
        CronListener, CronTaskRepository, Error, ErrorKind, Firing, FiringOutcome,
        LifecycleRepository, MethodRegistry, RunnableTaskBody,
    },
    cronrepo_trigger::{
        JobDetailTaskBody, TriggerCronTaskRepository, build_standard_job_detail,
        engine::Scheduler, job_key_from_id,
    },
    rstest::rstest,
};

struct Reports {
    runs: Arc<AtomicUsize>,
}

fn repository(runs: &Arc<AtomicUsize>) -> TriggerCronTaskRepository {
    let runs = Arc::clone(runs);
    let mut registry = MethodRegistry::new();
    let _ = registry
        .register_type("app.Reports", move || {
            Ok(Reports {
                runs: Arc::clone(&runs),
            })
        })
        .method("daily", |r: &Reports| {
            r.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .method("weekly", |_: &Reports| Ok(()))
        .method("broken", |_: &Reports| anyhow::bail!("report generation failed"));
    TriggerCronTaskRepository::new(Scheduler::new("test", 2), Arc::new(registry), None)
}

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl CronListener for Journal {
    fn on_before(&self, firing: &Firing) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(format!("before {}", firing.task_id));
        Ok(())
    }

    fn on_success(&self, _firing: &Firing) -> anyhow::Result<()> {
        self.0.lock().unwrap().push("success".into());
        Ok(())
    }

    fn on_failure(&self, _firing: &Firing, error: &(dyn StdError + 'static)) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(format!("failure {error}"));
        Ok(())
    }

    fn on_after(&self, _firing: &Firing, outcome: FiringOutcome<'_>) -> anyhow::Result<()> {
        self.0
            .lock()
            .unwrap()
            .push(format!("after {}", outcome.is_success()));
        Ok(())
    }
}

struct Panicky;

impl CronListener for Panicky {
    fn on_before(&self, _firing: &Firing) -> anyhow::Result<()> {
        panic!("listener bug");
    }

    fn order(&self) -> Option<i32> {
        Some(-1)
    }
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
fn registration_round_trips_through_info() {
    let repo = repository(&Arc::default());
    let id = repo.register_method("0 15 10 * * *", "app.Reports", "daily").unwrap();

    let key = job_key_from_id(&id).unwrap();
    assert_eq!(key.group, "app.Reports");
    assert_eq!(key.name, "daily");

    let info = repo.get_cron_task_info(&id).unwrap();
    assert_eq!(info.id, id);
    assert_eq!(info.expression, "0 15 10 * * *");
    assert_eq!(info.description, None);
    assert_eq!(repo.get_all_cron_task_info(), vec![info]);
}

#[test]
fn duplicate_method_registration_is_internal() {
    let repo = repository(&Arc::default());
    repo.register_method("0 0 * * * *", "app.Reports", "daily").unwrap();
    let err = repo
        .register_method("0 30 * * * *", "app.Reports", "daily")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(repo.get_all_cron_task_info().len(), 1);
}

#[test]
fn ids_are_distinct_per_method() {
    let repo = repository(&Arc::default());
    let daily = repo.register_method("0 0 * * * *", "app.Reports", "daily").unwrap();
    let weekly = repo.register_method("0 0 * * * *", "app.Reports", "weekly").unwrap();
    assert_ne!(daily, weekly);
    assert_eq!(repo.get_all_cron_task_info().len(), 2);
}

#[test]
fn update_keeps_id_and_replaces_expression() {
    let repo = repository(&Arc::default());
    let id = repo.register_method("0 0 * * * *", "app.Reports", "daily").unwrap();

    repo.update(&id, "0 30 6 * * *").unwrap();
    assert_eq!(repo.get_cron_task_info(&id).unwrap().expression, "0 30 6 * * *");

    let err = repo.update(&id, "not a cron").unwrap_err();
    assert!(err.is_invalid_expression());
    assert_eq!(repo.get_cron_task_info(&id).unwrap().expression, "0 30 6 * * *");
}

#[test]
fn update_of_unknown_id_is_internal() {
    let repo = repository(&Arc::default());
    let err = repo.update(r#"{"name":"x","group":"y"}"#, "0 0 * * * *").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn removing_a_removed_id_fails_every_time() {
    let repo = repository(&Arc::default());
    let id = repo.register_method("0 0 * * * *", "app.Reports", "daily").unwrap();

    repo.remove(&id).unwrap();
    assert!(repo.get_cron_task_info(&id).is_none());
    for _ in 0..2 {
        assert_eq!(repo.remove(&id).unwrap_err().kind(), ErrorKind::Internal);
    }
}

#[rstest]
#[case("not a cron")]
#[case("61 * * * * *")]
#[case("* * *")]
fn invalid_expression_leaves_no_entry(#[case] expression: &str) {
    let repo = repository(&Arc::default());
    let err = repo
        .register_method(expression, "app.Reports", "daily")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidExpression { .. }), "{err:?}");
    assert!(repo.get_all_cron_task_info().is_empty());
}

#[rstest]
#[case("")]
#[case("   ")]
fn blank_expression_is_contract_error(#[case] expression: &str) {
    let repo = repository(&Arc::default());
    let err = repo
        .register_method(expression, "app.Reports", "daily")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Contract);
}

#[test]
fn runnable_bodies_are_unsupported() {
    let repo = repository(&Arc::default());
    let body = RunnableTaskBody::from_fn(|| Ok(()));
    assert!(!repo.supports_body(&body));

    let err = repo.register("0 0 * * * *", Box::new(body)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedTaskBody { .. }));
    assert!(repo.get_all_cron_task_info().is_empty());
}

#[rstest]
#[case("app.Missing", "daily", ErrorKind::Configuration)]
#[case("app.Reports", "monthly", ErrorKind::Configuration)]
#[case("app.Reports", " ", ErrorKind::InvalidInput)]
fn unresolvable_methods_are_rejected_at_registration(
    #[case] declaring_type: &str,
    #[case] method: &str,
    #[case] expected: ErrorKind,
) {
    let repo = repository(&Arc::default());
    let err = repo
        .register_method("0 0 * * * *", declaring_type, method)
        .unwrap_err();
    assert_eq!(err.kind(), expected, "{err}");
    assert!(repo.get_all_cron_task_info().is_empty());
}

#[test]
fn job_detail_body_keeps_description() {
    let repo = repository(&Arc::default());
    let detail = build_standard_job_detail("weekly", "app.Reports").with_description("weekly digest");
    let id = repo
        .register("0 0 8 * * MON", Box::new(JobDetailTaskBody::new(detail)))
        .unwrap();

    let info = repo.get_cron_task_info(&id).unwrap();
    assert_eq!(info.description.as_deref(), Some("weekly digest"));
}

#[rstest]
#[case("")]
#[case("plain text")]
#[case(r#"{"name":"daily","group":"app.Unknown"}"#)]
fn unknown_ids_have_no_info(#[case] id: &str) {
    let repo = repository(&Arc::default());
    repo.register_method("0 0 * * * *", "app.Reports", "daily").unwrap();
    assert!(repo.get_cron_task_info(id).is_none());
}

#[tokio::test]
async fn firings_reach_listeners_past_a_panicking_one() {
    let runs = Arc::new(AtomicUsize::new(0));
    let repo = repository(&runs);
    let journal = Arc::new(Journal::default());
    repo.add_listener(Arc::new(Panicky));
    repo.add_listener(Arc::clone(&journal) as Arc<dyn CronListener>);

    let id = repo.register_method("* * * * * *", "app.Reports", "daily").unwrap();
    repo.start().unwrap();
    assert!(repo.is_started());

    wait_for(|| journal.entries().len() >= 3).await;
    repo.stop().unwrap();
    assert!(!repo.is_started());

    let entries = journal.entries();
    assert_eq!(entries[0], format!("before {id}"));
    assert_eq!(entries[1], "success");
    assert_eq!(entries[2], "after true");
    assert!(runs.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn failing_method_is_reported_as_failure() {
    let repo = repository(&Arc::default());
    let journal = Arc::new(Journal::default());
    repo.add_listener(Arc::clone(&journal) as Arc<dyn CronListener>);

    repo.register_method("* * * * * *", "app.Reports", "broken").unwrap();
    repo.start().unwrap();
    wait_for(|| journal.entries().len() >= 3).await;
    repo.stop().unwrap();

    let entries = journal.entries();
    assert!(entries[1].starts_with("failure"), "{entries:?}");
    assert!(entries[1].contains("report generation failed"), "{entries:?}");
    assert_eq!(entries[2], "after false");
}

#[tokio::test]
async fn removed_listener_is_not_notified() {
    let repo = repository(&Arc::default());
    let journal: Arc<dyn CronListener> = Arc::new(Journal::default());
    repo.add_listener(Arc::clone(&journal));
    assert!(repo.remove_listener(&journal));
    assert!(!repo.remove_listener(&journal));
}

#[tokio::test]
async fn lifecycle_is_idempotent() {
    let repo = repository(&Arc::default());
    repo.stop().unwrap();
    repo.start().unwrap();
    repo.start().unwrap();
    assert!(repo.scheduler().is_started());
    repo.restart().unwrap();
    assert!(repo.is_started());
    repo.stop().unwrap();
    assert!(!repo.scheduler().is_started());
}

#[test]
fn start_outside_runtime_is_internal() {
    let repo = repository(&Arc::default());
    let err = repo.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!repo.is_started());
}
