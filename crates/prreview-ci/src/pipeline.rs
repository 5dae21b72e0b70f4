//! Job orchestration and run recording.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::env::JobEnv;
use crate::event::PullRequestEvent;
use crate::gate::{SKIP_DISABLED, SKIP_HALTED};
use crate::ledger::{EventKind, RunEvent, RunId, RunLedger, RunMetadata, RunSummary};
use crate::runner::{CiRunner, StageResult};
use crate::trigger::{JobContext, TriggerDecision};
use crate::workflow::WorkflowSpec;

/// Result of a complete job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Fresh for every run.
    pub run_id: String,

    /// Whether every executed step passed.
    pub success: bool,

    /// Results of the steps that ran, in order.
    pub stages: Vec<StageResult>,

    /// Steps that did not run, in order.
    pub skipped: Vec<String>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the workflow definition.
    pub workflow_digest: String,
}

impl PipelineResult {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// What happened to one incoming event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Skipped { reason: String },
    Ran(PipelineResult),
}

/// Job orchestrator.
pub struct CiPipeline;

impl CiPipeline {
    /// Evaluate the trigger for `event` and, when it fires, run the job.
    ///
    /// Secrets are resolved through `lookup` before anything is recorded; a
    /// missing one fails the job without running a step.
    pub async fn dispatch<F>(
        ledger: Arc<dyn RunLedger>,
        workflow: &WorkflowSpec,
        event: &PullRequestEvent,
        lookup: F,
    ) -> anyhow::Result<JobOutcome>
    where
        F: Fn(&str) -> Option<String>,
    {
        let context = match workflow.trigger.evaluate(event)? {
            TriggerDecision::Skip { reason } => {
                info!(%reason, "Trigger did not fire");
                return Ok(JobOutcome::Skipped { reason });
            }
            TriggerDecision::Run { context } => context,
        };

        let env = JobEnv::resolve(&workflow.env.secrets, &context, lookup)?;
        let result = Self::run(ledger, workflow, &context, &env).await?;
        Ok(JobOutcome::Ran(result))
    }

    /// Execute the workflow's steps in order and record every transition.
    ///
    /// The first failing step (non-zero exit, spawn error or timeout) halts
    /// the run; the remaining steps are recorded as `step_skipped`. Disabled
    /// steps are recorded as skipped and do not affect the outcome.
    pub async fn run(
        ledger: Arc<dyn RunLedger>,
        workflow: &WorkflowSpec,
        context: &JobContext,
        env: &JobEnv,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let workflow_digest = workflow.digest();
        let pull_request = context.pull_request.to_string();

        let metadata = RunMetadata {
            workflow_name: workflow.name.clone(),
            pull_request: pull_request.clone(),
            steps: workflow.steps.iter().map(|s| s.name.clone()).collect(),
        };
        let run_id = ledger.create_run(&workflow_digest, metadata).await?;
        let mut recorder = Recorder::new(ledger.clone(), run_id.clone());

        info!(run_id = %run_id, pull_request = %pull_request, "Starting review job");
        recorder
            .record(
                EventKind::JobTriggered,
                json!({
                    "pull_request": &pull_request,
                    "workflow": &workflow.name,
                    "label": &workflow.trigger.label,
                    "env": env.names().collect::<Vec<_>>(),
                }),
            )
            .await?;

        let mut stage_results = Vec::new();
        let mut skipped = Vec::new();
        let mut halted_by: Option<String> = None;

        for config in &workflow.steps {
            if let Some(failed) = &halted_by {
                recorder
                    .record(
                        EventKind::StepSkipped,
                        json!({ "step": &config.name, "reason": SKIP_HALTED, "after": failed }),
                    )
                    .await?;
                skipped.push(config.name.clone());
                continue;
            }

            if !config.enabled {
                info!(step = %config.name, "Skipping disabled step");
                recorder
                    .record(
                        EventKind::StepSkipped,
                        json!({ "step": &config.name, "reason": SKIP_DISABLED }),
                    )
                    .await?;
                skipped.push(config.name.clone());
                continue;
            }

            info!(step = %config.name, "Executing step");
            recorder
                .record(
                    EventKind::StepStarted,
                    json!({
                        "step": &config.name,
                        "command": &config.command,
                        "timeout_secs": config.timeout_secs,
                        "inject_env": config.inject_env,
                    }),
                )
                .await?;

            let step_start = Instant::now();
            let result = match CiRunner::execute_stage(config, env).await {
                Ok(result) => result,
                Err(e) => {
                    // Spawn errors and timeouts never produce an exit code.
                    StageResult {
                        stage_name: config.name.clone(),
                        exit_code: -1,
                        stdout: String::new(),
                        stderr: e.to_string(),
                        duration_ms: step_start.elapsed().as_millis() as u64,
                        success: false,
                    }
                }
            };
            debug!(step = %config.name, stdout = %result.stdout, stderr = %result.stderr, "Step output");

            if result.passed() {
                recorder
                    .record(
                        EventKind::StepSucceeded,
                        json!({
                            "step": &config.name,
                            "exit_code": result.exit_code,
                            "stdout": &result.stdout,
                            "stderr": &result.stderr,
                            "duration_ms": result.duration_ms,
                        }),
                    )
                    .await?;
            } else {
                let error = if result.exit_code == -1 && !result.stderr.is_empty() {
                    result.stderr.clone()
                } else {
                    format!("Step '{}' exited with code {}", config.name, result.exit_code)
                };
                warn!(step = %config.name, %error, "Step failed; halting job");
                recorder
                    .record(
                        EventKind::StepFailed,
                        json!({
                            "step": &config.name,
                            "exit_code": result.exit_code,
                            "stdout": &result.stdout,
                            "stderr": &result.stderr,
                            "duration_ms": result.duration_ms,
                            "error": error,
                        }),
                    )
                    .await?;
                halted_by = Some(config.name.clone());
            }

            stage_results.push(result);
        }

        let success = halted_by.is_none();
        let duration_ms = start.elapsed().as_millis() as u64;
        let summary = RunSummary {
            total_events: recorder.count(),
            duration_ms,
            success,
        };

        if success {
            ledger.succeed_run(&run_id, summary).await?;
            info!(run_id = %run_id, "Review job completed successfully");
        } else {
            ledger.fail_run(&run_id, summary).await?;
            info!(run_id = %run_id, "Review job failed");
        }

        Ok(PipelineResult {
            run_id: run_id.to_string(),
            success,
            stages: stage_results,
            skipped,
            duration_ms,
            workflow_digest,
        })
    }
}

/// Appends events with consecutive sequence numbers.
struct Recorder {
    ledger: Arc<dyn RunLedger>,
    run_id: RunId,
    seq: u64,
}

impl Recorder {
    fn new(ledger: Arc<dyn RunLedger>, run_id: RunId) -> Self {
        Self {
            ledger,
            run_id,
            seq: 0,
        }
    }

    async fn record(&mut self, kind: EventKind, payload: serde_json::Value) -> anyhow::Result<()> {
        self.seq += 1;
        debug!(run_id = %self.run_id, seq = self.seq, kind = kind.as_str(), "Recording event");
        self.ledger
            .append_event(&self.run_id, RunEvent::new(self.seq, kind, payload))
            .await?;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.seq
    }
}
