//! Integration tests for the review job with MemoryRunLedger.

use std::collections::HashMap;
use std::sync::Arc;

use prreview_ci::{
    CiGate, CiPipeline, EnvSpec, EventKind, JobOutcome, MemoryRunLedger, PullRequestEvent,
    RunId, RunLedger, RunStatus, StageConfig, TriggerRule, WorkflowError, WorkflowSpec,
};

fn sh(name: &str, script: &str) -> StageConfig {
    StageConfig::custom(
        name.to_string(),
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        60,
    )
}

/// Same shape as the default job, with local stand-ins for each step.
fn workflow(steps: Vec<StageConfig>) -> WorkflowSpec {
    WorkflowSpec {
        name: "AI PR Review".to_string(),
        trigger: TriggerRule::default(),
        env: EnvSpec {
            secrets: vec!["GITHUB_TOKEN".to_string(), "CLICKUP_TOKEN".to_string()],
        },
        steps,
    }
}

fn lookup(name: &str) -> Option<String> {
    let secrets = HashMap::from([("GITHUB_TOKEN", "ghp_it"), ("CLICKUP_TOKEN", "pk_it")]);
    secrets.get(name).map(|v| v.to_string())
}

fn ready_event() -> PullRequestEvent {
    PullRequestEvent::labeled("Ready for Review", 42, "org/repo")
}

fn ran(outcome: JobOutcome) -> prreview_ci::PipelineResult {
    match outcome {
        JobOutcome::Ran(result) => result,
        other => panic!("expected the job to run, got {other:?}"),
    }
}

/// Ready for Review on PR 42 runs every step and hands the review step its env.
#[tokio::test]
async fn test_labeled_event_runs_all_steps() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let spec = workflow(vec![
        sh("checkout", "echo fetched"),
        sh("toolchain", "echo stable"),
        sh("install", "echo installed"),
        sh(
            "review",
            "echo \"$PR_NUMBER $GITHUB_REPOSITORY $GITHUB_TOKEN $CLICKUP_TOKEN\"",
        )
        .with_env(),
    ]);

    let result = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .expect("dispatch failed"),
    );

    assert!(result.success);
    assert_eq!(result.passed_count(), 4);
    assert!(result.skipped.is_empty());
    assert_eq!(result.stages[3].stdout.trim(), "42 org/repo ghp_it pk_it");
    assert_eq!(result.workflow_digest, spec.digest());

    let run_id = RunId(result.run_id);
    let record = ledger.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Succeeded);
    assert_eq!(record.metadata.pull_request, "org/repo#42");

    let events = ledger.get_events(&run_id).await.unwrap();
    assert_eq!(events.len(), 9, "job_triggered + 4 x (started, succeeded)");
    assert_eq!(events[0].kind, EventKind::JobTriggered);
    let started: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == EventKind::StepStarted)
        .filter_map(|e| e.step())
        .collect();
    assert_eq!(started, vec!["checkout", "toolchain", "install", "review"]);

    assert!(CiGate::evaluate(&events).passed);
}

/// Any other label is a skip: nothing runs and nothing is recorded.
#[tokio::test]
async fn test_other_label_skips_job() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let spec = workflow(vec![sh("checkout", "exit 1")]);
    let event = PullRequestEvent::labeled("bug", 42, "org/repo");

    let outcome = CiPipeline::dispatch(ledger.clone(), &spec, &event, lookup)
        .await
        .expect("dispatch failed");

    assert!(matches!(outcome, JobOutcome::Skipped { ref reason } if reason.contains("bug")));
    assert!(ledger.list_runs().await.unwrap().is_empty());
}

/// A failing install halts the job; the review step is recorded as skipped.
#[tokio::test]
async fn test_failed_step_halts_remaining_steps() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let marker = tempfile::tempdir().unwrap();
    let review_script = format!("touch {}/reviewed", marker.path().display());
    let spec = workflow(vec![
        sh("checkout", "true"),
        sh("install", "echo 'error: could not compile' >&2; exit 101"),
        sh("review", &review_script).with_env(),
    ]);

    let result = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .expect("dispatch failed"),
    );

    assert!(!result.success);
    assert_eq!(result.stages.len(), 2);
    assert_eq!(result.stages[1].exit_code, 101);
    assert_eq!(result.skipped, vec!["review".to_string()]);
    assert!(!marker.path().join("reviewed").exists());

    let run_id = RunId(result.run_id);
    assert_eq!(
        ledger.get_run(&run_id).await.unwrap().status,
        RunStatus::Failed
    );

    let events = ledger.get_events(&run_id).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::StepSkipped);
    assert_eq!(last.payload["after"], "install");

    let verdict = CiGate::evaluate(&events);
    assert!(!verdict.passed);
    assert_eq!(verdict.violations.len(), 2);
    assert!(verdict.violations[0].contains("exited with code 101"));
}

/// Timeouts count as failures.
#[tokio::test]
async fn test_timeout_fails_job() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let mut slow = sh("checkout", "sleep 5");
    slow.timeout_secs = 1;
    let spec = workflow(vec![slow, sh("review", "true").with_env()]);

    let result = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .expect("dispatch failed"),
    );

    assert!(!result.success);
    assert_eq!(result.stages[0].exit_code, -1);
    assert!(result.stages[0].stderr.contains("timed out"));
    assert_eq!(result.skipped, vec!["review".to_string()]);
}

/// A missing secret fails before any run is recorded.
#[tokio::test]
async fn test_missing_secret_fails_before_steps() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let spec = workflow(vec![sh("review", "true").with_env()]);

    let err = CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), |name| {
        (name == "GITHUB_TOKEN").then(|| "ghp_it".to_string())
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<WorkflowError>(),
        Some(WorkflowError::MissingSecret(name)) if name == "CLICKUP_TOKEN"
    ));
    assert!(ledger.list_runs().await.unwrap().is_empty());
}

/// Disabled steps are skipped without failing the job.
#[tokio::test]
async fn test_disabled_step_does_not_fail_job() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let spec = workflow(vec![
        sh("toolchain", "exit 1").disabled(),
        sh("review", "true").with_env(),
    ]);

    let result = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .expect("dispatch failed"),
    );

    assert!(result.success);
    assert_eq!(result.skipped, vec!["toolchain".to_string()]);

    let events = ledger.get_events(&RunId(result.run_id)).await.unwrap();
    assert!(CiGate::evaluate(&events).passed);
}

/// Re-applying the label starts another, independent run.
#[tokio::test]
async fn test_repeated_label_runs_again() {
    let ledger = Arc::new(MemoryRunLedger::new());
    let spec = workflow(vec![sh("review", "true").with_env()]);

    let first = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .unwrap(),
    );
    let second = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
            .await
            .unwrap(),
    );

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(ledger.list_runs().await.unwrap().len(), 2);
}

/// Workflows load from TOML files and honour a custom trigger label.
#[tokio::test]
async fn test_workflow_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("review.toml");
    std::fs::write(
        &path,
        r#"
name = "Custom review"

[trigger]
label = "ai-review"

[env]
secrets = ["GITHUB_TOKEN"]

[[steps]]
name = "review"
command = ["sh", "-c", "test -n \"$GITHUB_TOKEN\""]
timeout_secs = 30
inject_env = true
"#,
    )
    .unwrap();

    let spec = WorkflowSpec::from_file(&path).unwrap();
    let ledger = Arc::new(MemoryRunLedger::new());

    let skipped = CiPipeline::dispatch(ledger.clone(), &spec, &ready_event(), lookup)
        .await
        .unwrap();
    assert!(matches!(skipped, JobOutcome::Skipped { .. }));

    let event = PullRequestEvent::labeled("ai-review", 7, "org/repo");
    let result = ran(
        CiPipeline::dispatch(ledger.clone(), &spec, &event, lookup)
            .await
            .unwrap(),
    );
    assert!(result.success);
}
