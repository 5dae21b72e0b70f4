//! prreview - label-gated AI pull-request review
//!
//! ## Commands
//!
//! - `review`: review the pull request named by the environment and post the result
//! - `trigger`: show whether an event would start the review job
//! - `workflow run`: evaluate an event and run the job's steps
//! - `workflow show`: print the default workflow definition

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use prreview_ci::{
    CiGate, CiPipeline, GateVerdict, JobOutcome, MemoryRunLedger, PipelineResult,
    PullRequestEvent, RunEvent, RunId, RunLedger, RunRecord, TriggerDecision, TriggerRule,
    WorkflowSpec,
};
use prreview_core::{run_review, ReviewEnv, ReviewReport, ReviewSettings};

#[derive(Parser)]
#[command(name = "prreview")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Label-gated AI review for pull requests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review a pull request and post the result
    ///
    /// Reads GITHUB_TOKEN, CLICKUP_TOKEN, OLLAMA_API_URL, CHECKLIST_API_URL,
    /// PR_NUMBER and GITHUB_REPOSITORY from the environment.
    Review {
        /// GitHub REST API root
        #[arg(long, env = "PRREVIEW_GITHUB_API_URL", default_value = "https://api.github.com")]
        github_api_url: String,

        /// ClickUp REST API root
        #[arg(long, env = "PRREVIEW_CLICKUP_API_URL", default_value = "https://api.clickup.com")]
        clickup_api_url: String,

        /// Ollama model name
        #[arg(long, env = "PRREVIEW_MODEL", default_value = "llama3.1")]
        model: String,

        /// Attempts per file before recording a failure
        #[arg(long, default_value = "5")]
        retries: u32,

        /// Pause between attempts for the same file, in milliseconds
        #[arg(long, default_value = "0")]
        retry_delay_ms: u64,

        /// Build the review but do not post it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the trigger decision for an event as JSON
    Trigger {
        /// Event payload file
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        event: PathBuf,

        /// Label that starts the job
        #[arg(long)]
        label: Option<String>,
    },

    /// Review job operations
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Evaluate the trigger and, when it fires, run the job's steps
    Run {
        /// Event payload file
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        event: PathBuf,

        /// Workflow definition (default: built-in)
        #[arg(short, long)]
        workflow: Option<PathBuf>,

        /// Write the run record and events to this JSON file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Print the default workflow definition
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    prreview_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Review {
            github_api_url,
            clickup_api_url,
            model,
            retries,
            retry_delay_ms,
            dry_run,
        } => {
            let settings = ReviewSettings {
                github_api_url,
                clickup_api_url,
                model,
                retries,
                retry_delay: Duration::from_millis(retry_delay_ms),
                dry_run,
            };
            cmd_review(settings).await
        }
        Commands::Trigger { event, label } => cmd_trigger(&event, label.as_deref()),
        Commands::Workflow { action } => match action {
            WorkflowAction::Run {
                event,
                workflow,
                record,
            } => cmd_workflow_run(&event, workflow.as_deref(), record.as_deref()).await,
            WorkflowAction::Show => cmd_workflow_show(),
        },
    }
}

async fn cmd_review(settings: ReviewSettings) -> Result<()> {
    let env = ReviewEnv::from_env().context("Review environment is incomplete")?;
    let dry_run = settings.dry_run;

    let report = run_review(&env, &settings)
        .await
        .with_context(|| format!("Review of {} failed", env.pull_request))?;

    print_review_report(&report, dry_run)?;
    Ok(())
}

fn print_review_report(report: &ReviewReport, dry_run: bool) -> Result<()> {
    println!("Pull request: {}", report.pull_request);
    println!(
        "Files reviewed: {} ({} failed)",
        report.files_reviewed, report.files_failed
    );

    match (&report.payload, &report.github_response) {
        (None, _) => println!("Diff is empty; nothing to review"),
        (Some(payload), None) if dry_run => {
            println!("Dry run; review not posted:");
            println!("{}", serde_json::to_string_pretty(payload)?);
        }
        (Some(_), Some(response)) => {
            let id = response.get("id").map(|v| v.to_string()).unwrap_or_default();
            println!("Review posted {}", id);
        }
        (Some(_), None) => {}
    }
    Ok(())
}

fn trigger_decision(event_path: &Path, label: Option<&str>) -> Result<TriggerDecision> {
    let event = PullRequestEvent::from_file(event_path)
        .with_context(|| format!("Failed to read event {}", event_path.display()))?;
    let rule = label.map(TriggerRule::with_label).unwrap_or_default();
    Ok(rule.evaluate(&event)?)
}

fn cmd_trigger(event_path: &Path, label: Option<&str>) -> Result<()> {
    let decision = trigger_decision(event_path, label)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Run record as written by `workflow run --record`.
#[derive(Debug, Serialize)]
struct RunFile {
    record: RunRecord,
    events: Vec<RunEvent>,
    verdict: GateVerdict,
}

/// A finished job with its gate verdict.
struct JobReport {
    result: PipelineResult,
    verdict: GateVerdict,
}

async fn run_workflow(
    event_path: &Path,
    workflow_path: Option<&Path>,
    record_path: Option<&Path>,
) -> Result<Option<JobReport>> {
    let workflow = match workflow_path {
        Some(path) => WorkflowSpec::from_file(path)
            .with_context(|| format!("Failed to load workflow {}", path.display()))?,
        None => WorkflowSpec::default(),
    };
    let event = PullRequestEvent::from_file(event_path)
        .with_context(|| format!("Failed to read event {}", event_path.display()))?;

    let ledger = Arc::new(MemoryRunLedger::new());
    let outcome = CiPipeline::dispatch(ledger.clone(), &workflow, &event, |name| {
        std::env::var(name).ok()
    })
    .await
    .context("Review job could not start")?;

    let result = match outcome {
        JobOutcome::Skipped { reason } => {
            info!(%reason, "Review job not triggered");
            println!("Skipped: {}", reason);
            return Ok(None);
        }
        JobOutcome::Ran(result) => result,
    };

    let run_id = RunId(result.run_id.clone());
    let events = ledger.get_events(&run_id).await?;
    let verdict = CiGate::evaluate(&events);

    if let Some(path) = record_path {
        let file = RunFile {
            record: ledger.get_run(&run_id).await?,
            events,
            verdict: verdict.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("Failed to write run record {}", path.display()))?;
    }

    Ok(Some(JobReport { result, verdict }))
}

async fn cmd_workflow_run(
    event_path: &Path,
    workflow_path: Option<&Path>,
    record_path: Option<&Path>,
) -> Result<()> {
    let report = match run_workflow(event_path, workflow_path, record_path).await? {
        Some(report) => report,
        None => return Ok(()),
    };
    let JobReport { result, verdict } = report;

    println!("Run ID: {}", result.run_id);
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms);
    println!();

    for stage_result in &result.stages {
        let status = if stage_result.passed() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms, exit code: {})",
            status, stage_result.stage_name, stage_result.duration_ms, stage_result.exit_code
        );
    }
    for name in &result.skipped {
        println!("  - {} (skipped)", name);
    }

    println!();
    println!("Gate: {}", if verdict.passed { "✓ PASSED" } else { "✗ FAILED" });
    if !verdict.violations.is_empty() {
        println!("Violations:");
        for violation in &verdict.violations {
            println!("  - {}", violation);
        }
    }

    if result.success && verdict.passed {
        Ok(())
    } else {
        anyhow::bail!("Review job failed")
    }
}

fn cmd_workflow_show() -> Result<()> {
    print!("{}", WorkflowSpec::default().to_toml()?);
    Ok(())
}
