// tests/orchestrator_run.rs

use std::time::Duration;

use sitedag::dag::TaskRunState;
use sitedag::engine::{ActionFuture, Orchestrator, TaskAction, noop};
use sitedag::errors::SitedagError;
use sitedag_test_utils::{ExecutionLog, TaskGraphBuilder, init_tracing, with_timeout};

/// Panics before it has a future to hand back.
struct PanicsOnStart;

impl TaskAction for PanicsOnStart {
    fn run(&self) -> ActionFuture {
        panic!("could not even start")
    }
}

/// clean, then three asset tasks side by side, then markdown, then an aggregate.
fn site_shaped() -> TaskGraphBuilder {
    TaskGraphBuilder::new()
        .task("clean", &[])
        .task("css", &["clean"])
        .task("scripts", &["clean"])
        .task("graphics", &["clean"])
        .task("markdown", &["clean", "css", "scripts", "graphics"])
        .task("default", &["clean", "css", "scripts", "graphics", "markdown"])
}

#[tokio::test]
async fn full_success_runs_every_task_once_in_dependency_order() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = site_shaped().build(&log);

    let report = with_timeout(orch.run("default")).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.states.len(), 6);
    for task in ["clean", "css", "scripts", "graphics", "markdown", "default"] {
        assert_eq!(log.count(task), 1, "{task} should run exactly once");
    }
    assert_eq!(log.position("clean"), Some(0));
    for asset in ["css", "scripts", "graphics"] {
        assert!(log.position(asset) < log.position("markdown"), "{asset}");
    }
    assert_eq!(log.position("markdown"), Some(4));
    assert_eq!(log.position("default"), Some(5));
}

#[tokio::test]
async fn failure_skips_dependents_and_unrelated_tasks_continue() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = site_shaped().failing("css").build(&log);

    let report = with_timeout(orch.run("default")).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.state_of("css"), Some(TaskRunState::Failed));
    assert_eq!(report.state_of("markdown"), Some(TaskRunState::Skipped));
    assert_eq!(report.state_of("default"), Some(TaskRunState::Skipped));
    for task in ["clean", "scripts", "graphics"] {
        assert_eq!(report.state_of(task), Some(TaskRunState::Succeeded));
    }
    assert!(!log.contains("markdown"));
    assert!(!log.contains("default"));
    assert!(report.failures["css"].contains("css failed on purpose"));
}

#[tokio::test]
async fn transitive_dependents_are_skipped() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new()
        .task("a", &[])
        .task("b", &["a"])
        .task("c", &["b"])
        .task("d", &["c"])
        .failing("a")
        .build(&log);

    let report = with_timeout(orch.run("d")).await.unwrap();

    assert_eq!(report.failed(), vec!["a"]);
    assert_eq!(report.skipped(), vec!["b", "c", "d"]);
    assert_eq!(log.names(), vec!["a".to_string()]);
}

#[tokio::test]
async fn only_the_reachable_subgraph_runs() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = site_shaped().build(&log);

    let report = with_timeout(orch.run("css")).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.states.len(), 2);
    assert_eq!(log.names(), vec!["clean".to_string(), "css".to_string()]);
}

#[tokio::test]
async fn independent_tasks_run_concurrently() {
    init_tracing();
    let log = ExecutionLog::new();
    let slow = Duration::from_millis(300);
    let orch = TaskGraphBuilder::new()
        .task("a", &[])
        .task("b", &[])
        .task("c", &[])
        .task("all", &["a", "b", "c"])
        .delay("a", slow)
        .delay("b", slow)
        .delay("c", slow)
        .build(&log);

    let started = std::time::Instant::now();
    let report = with_timeout(orch.run("all")).await.unwrap();

    assert!(report.is_success());
    assert!(
        started.elapsed() < slow * 2,
        "three {slow:?} tasks took {:?}; they should overlap",
        started.elapsed()
    );
}

#[tokio::test]
async fn cycle_is_rejected_before_anything_runs() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new()
        .task("setup", &[])
        .task("a", &["setup", "b"])
        .task("b", &["a"])
        .build(&log);

    match orch.run("a").await {
        Err(SitedagError::CyclicDependency { cycle }) => {
            assert_eq!(cycle.first(), cycle.last());
            assert!(cycle.contains(&"a".to_string()));
            assert!(cycle.contains(&"b".to_string()));
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
    assert!(log.is_empty(), "nothing may run: {:?}", log.names());
}

#[tokio::test]
async fn self_dependency_is_a_cycle() {
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new().task("a", &["a"]).build(&log);

    let err = orch.run("a").await.unwrap_err();
    assert_eq!(err.to_string(), "Cyclic dependency: a -> a");
    assert!(err.is_validation());
    assert!(log.is_empty());
}

#[tokio::test]
async fn unknown_dependency_is_rejected_before_anything_runs() {
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new()
        .task("a", &[])
        .task("b", &["a", "ghost"])
        .build(&log);

    match orch.run("b").await {
        Err(SitedagError::UnknownDependency { task, dependency }) => {
            assert_eq!(task, "b");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
    assert!(log.is_empty());
}

#[tokio::test]
async fn unknown_target_is_rejected() {
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new().task("a", &[]).build(&log);

    assert!(matches!(
        orch.run("nope").await,
        Err(SitedagError::TaskNotFound(name)) if name == "nope"
    ));
}

#[tokio::test]
async fn panicking_action_fails_its_task() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new()
        .task("boom", &[])
        .task("after_boom", &["boom"])
        .task("fine", &[])
        .task("all", &["after_boom", "fine"])
        .panicking("boom")
        .build(&log);

    let report = with_timeout(orch.run("all")).await.unwrap();

    assert_eq!(report.state_of("boom"), Some(TaskRunState::Failed));
    assert_eq!(report.state_of("after_boom"), Some(TaskRunState::Skipped));
    assert_eq!(report.state_of("fine"), Some(TaskRunState::Succeeded));
    assert!(report.failures["boom"].contains("panicked"));
}

#[tokio::test]
async fn action_panicking_before_its_future_exists_fails_its_task() {
    init_tracing();
    let mut orch = Orchestrator::new();
    orch.register("boom", PanicsOnStart, &[]).unwrap();
    orch.register("after_boom", noop(), &["boom"]).unwrap();
    orch.register("fine", noop(), &[]).unwrap();
    orch.register("all", noop(), &["after_boom", "fine"]).unwrap();

    let report = with_timeout(orch.run("all")).await.unwrap();

    assert_eq!(report.failed(), vec!["boom"]);
    assert_eq!(report.skipped(), vec!["after_boom", "all"]);
    assert_eq!(report.state_of("fine"), Some(TaskRunState::Succeeded));
    assert!(report.failures["boom"].contains("panicked"));
}

#[tokio::test]
async fn repeated_dependency_does_not_stall_the_run() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = TaskGraphBuilder::new()
        .task("clean", &[])
        .task("css", &["clean", "clean"])
        .task("default", &["css", "clean", "css"])
        .build(&log);

    let report = with_timeout(orch.run("default")).await.unwrap();

    assert!(report.is_success(), "{:?}", report.states);
    assert_eq!(log.names(), vec!["clean", "css", "default"]);
}

#[tokio::test]
async fn runs_are_independent() {
    init_tracing();
    let log = ExecutionLog::new();
    let orch = site_shaped().failing("scripts").build(&log);

    let first = with_timeout(orch.run("default")).await.unwrap();
    let second = with_timeout(orch.run("default")).await.unwrap();

    assert_eq!(first.states, second.states);
    assert_eq!(first.failures, second.failures);
    assert_eq!(log.count("clean"), 2);
    assert_eq!(log.count("default"), 0);
}
