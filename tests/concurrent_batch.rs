// tests/concurrent_batch.rs

use std::time::Duration;

use ruleflow::dag::ResultStore;
use ruleflow::engine::{run_concurrent_rules, run_terminal_rule, ExecutionSettings};
use ruleflow::errors::RuleflowError;
use ruleflow_test_utils::builders::{rule, rule_set};
use ruleflow_test_utils::fake_backend::{refs, FakeBackend, Outcome};
use ruleflow_test_utils::{init_tracing, with_timeout};

fn settings() -> ExecutionSettings {
    ExecutionSettings::default().with_poll_interval(Duration::from_millis(10))
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn batch_keeps_polling_until_every_job_is_ready() {
    init_tracing();

    let graph = rule_set([rule("x", &[]), rule("y", &[]), rule("z", &[])]);
    let store = ResultStore::new(["x", "y", "z"]);
    let mut backend = FakeBackend::new()
        .ready_after("x", 0, &["x1"])
        .ready_after("y", 3, &["y1", "y2"])
        .ready_after("z", 1, &["z1"]);

    let outcome = with_timeout(run_concurrent_rules(
        &names(&["x", "y", "z"]),
        &graph,
        &store,
        &mut backend,
        &settings(),
    ))
    .await
    .unwrap();

    assert_eq!(backend.poll_count(), 4);
    assert_eq!(outcome.jobs.len(), 3);
    assert_eq!(outcome.results["x"], refs(&["x1"]));
    assert_eq!(outcome.results["y"], refs(&["y1", "y2"]));
    assert_eq!(outcome.results["z"], refs(&["z1"]));
    assert!(backend.killed().is_empty());
    // A successful batch leaves release to the caller.
    assert!(backend.released().is_empty());
}

#[tokio::test]
async fn batch_inputs_come_from_sub_rule_outputs_in_order() {
    init_tracing();

    let graph = rule_set([
        rule("p", &[]),
        rule("q", &[]),
        rule("r", &["q", "p"]),
    ]);
    let mut store = ResultStore::new(["p", "q", "r"]);
    store.record("p", refs(&["p1", "p2"])).unwrap();
    store.record("q", refs(&["q1"])).unwrap();
    let mut backend = FakeBackend::new();

    with_timeout(run_concurrent_rules(
        &names(&["r"]),
        &graph,
        &store,
        &mut backend,
        &settings(),
    ))
    .await
    .unwrap();

    assert_eq!(backend.inputs_of("r"), Some(refs(&["q1", "p1", "p2"])));
}

#[tokio::test]
async fn first_dead_job_aborts_and_kills_everything_else() {
    init_tracing();

    let graph = rule_set([rule("x", &[]), rule("y", &[]), rule("z", &[])]);
    let store = ResultStore::new(["x", "y", "z"]);
    let mut backend = FakeBackend::new()
        .ready_after("x", 0, &["x1"])
        .dead_after("y", 1)
        .with_outcome("z", Outcome::Hang);

    let err = with_timeout(run_concurrent_rules(
        &names(&["x", "y", "z"]),
        &graph,
        &store,
        &mut backend,
        &settings(),
    ))
    .await
    .unwrap_err();

    match err {
        RuleflowError::JobFailed { rule, job } => {
            assert_eq!(rule, "y");
            assert!(job.starts_with("y@"));
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(backend.killed(), &names(&["x", "z"])[..]);
    assert_eq!(backend.released(), &names(&["x", "y", "z"])[..]);
}

#[tokio::test]
async fn refused_start_kills_jobs_started_earlier_in_the_batch() {
    init_tracing();

    let graph = rule_set([rule("x", &[]), rule("y", &[]), rule("z", &[])]);
    let store = ResultStore::new(["x", "y", "z"]);
    let mut backend = FakeBackend::new().with_outcome("z", Outcome::NotStarted);

    let err = with_timeout(run_concurrent_rules(
        &names(&["x", "y", "z"]),
        &graph,
        &store,
        &mut backend,
        &settings(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, RuleflowError::InsufficientInputs { ref rule } if rule == "z"));
    assert_eq!(backend.killed(), &names(&["x", "y"])[..]);
    assert_eq!(backend.released(), &names(&["x", "y"])[..]);
}

#[tokio::test]
async fn transient_errors_do_not_change_job_status() {
    init_tracing();

    let graph = rule_set([rule("x", &[])]);
    let store = ResultStore::new(["x"]);
    let mut backend = FakeBackend::new()
        .ready_after("x", 1, &["x1"])
        .with_transient_polls(5);

    let outcome = with_timeout(run_concurrent_rules(
        &names(&["x"]),
        &graph,
        &store,
        &mut backend,
        &settings(),
    ))
    .await
    .unwrap();

    assert_eq!(backend.transient_errors(), 5);
    // One poll sees x still active, the next sees it ready.
    assert_eq!(backend.poll_count(), 2);
    assert_eq!(outcome.results["x"], refs(&["x1"]));
}

#[tokio::test]
async fn terminal_runner_resolves_inputs_and_waits() {
    init_tracing();

    let graph = rule_set([rule("a", &[]), rule("b", &[]), rule("root", &["a", "b"])]);
    let mut store = ResultStore::new(["a", "b", "root"]);
    store.record("a", refs(&["a1"])).unwrap();
    store.record("b", refs(&["b1"])).unwrap();
    let mut backend = FakeBackend::new().ready_after("root", 2, &["ignored"]);

    let job = with_timeout(run_terminal_rule("root", &graph, &store, &mut backend))
        .await
        .unwrap();

    assert_eq!(job.rule_name(), "root");
    assert_eq!(backend.inputs_of("root"), Some(refs(&["a1", "b1"])));
    assert_eq!(backend.waited(), &names(&["root"])[..]);
    // The terminal rule's outputs are never recorded.
    assert!(!store.is_recorded("root"));
}
