//! Run ledger: one record plus an ordered event list per job run.
//!
//! `RunLedger` is the persistence seam; `MemoryRunLedger` keeps everything in
//! process and is what the CLI uses before writing a run out as JSON.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// Unique identifier for a job run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recorded at run creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub workflow_name: String,
    /// `owner/repo#number`
    pub pull_request: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobTriggered,
    StepStarted,
    StepSucceeded,
    StepFailed,
    StepSkipped,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JobTriggered => "job_triggered",
            EventKind::StepStarted => "step_started",
            EventKind::StepSucceeded => "step_succeeded",
            EventKind::StepFailed => "step_failed",
            EventKind::StepSkipped => "step_skipped",
        }
    }
}

/// A single event in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Monotonic sequence number within the run, starting at 1
    pub seq: u64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(seq: u64, kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            seq,
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// `step` field of the payload, if any.
    pub fn step(&self) -> Option<&str> {
        self.payload["step"].as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_events: u64,
    pub duration_ms: u64,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Full run record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub workflow_digest: String,
    pub metadata: RunMetadata,
    pub status: RunStatus,
    pub summary: Option<RunSummary>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job run ledger.
///
/// Guarantees:
/// - Events are returned ordered by `seq`.
/// - A run transitions Running → Succeeded | Failed, and terminal runs are immutable.
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Create a new run with a fresh id.
    async fn create_run(&self, workflow_digest: &str, metadata: RunMetadata) -> Result<RunId>;

    /// Append an event to a running run.
    async fn append_event(&self, run_id: &RunId, event: RunEvent) -> Result<()>;

    async fn succeed_run(&self, run_id: &RunId, summary: RunSummary) -> Result<()>;

    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> Result<()>;

    async fn get_run(&self, run_id: &RunId) -> Result<RunRecord>;

    async fn get_events(&self, run_id: &RunId) -> Result<Vec<RunEvent>>;

    /// All runs, oldest first.
    async fn list_runs(&self) -> Result<Vec<RunRecord>>;
}

#[derive(Debug)]
struct RunState {
    record: RunRecord,
    events: Vec<RunEvent>,
}

/// In-memory run ledger backed by a `HashMap<RunId, RunState>`.
#[derive(Debug, Default)]
pub struct MemoryRunLedger {
    runs: Mutex<HashMap<String, RunState>>,
}

impl MemoryRunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, RunState>>> {
        self.runs
            .lock()
            .map_err(|_| WorkflowError::Ledger("ledger lock poisoned".to_string()))
    }

    fn finish(&self, run_id: &RunId, status: RunStatus, summary: RunSummary) -> Result<()> {
        let mut runs = self.lock()?;
        let state = running_state(&mut runs, run_id)?;
        state.record.status = status;
        state.record.summary = Some(summary);
        state.record.completed_at = Some(Utc::now());
        Ok(())
    }
}

fn running_state<'a>(
    runs: &'a mut HashMap<String, RunState>,
    run_id: &RunId,
) -> Result<&'a mut RunState> {
    let state = runs
        .get_mut(&run_id.0)
        .ok_or_else(|| WorkflowError::Ledger(format!("run {run_id} not found")))?;
    if state.record.status != RunStatus::Running {
        return Err(WorkflowError::Ledger(format!(
            "run {run_id} is {:?}, expected Running",
            state.record.status
        )));
    }
    Ok(state)
}

#[async_trait]
impl RunLedger for MemoryRunLedger {
    async fn create_run(&self, workflow_digest: &str, metadata: RunMetadata) -> Result<RunId> {
        let run_id = RunId::new();
        let record = RunRecord {
            run_id: run_id.clone(),
            workflow_digest: workflow_digest.to_string(),
            metadata,
            status: RunStatus::Running,
            summary: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.lock()?.insert(
            run_id.0.clone(),
            RunState {
                record,
                events: Vec::new(),
            },
        );
        Ok(run_id)
    }

    async fn append_event(&self, run_id: &RunId, event: RunEvent) -> Result<()> {
        let mut runs = self.lock()?;
        running_state(&mut runs, run_id)?.events.push(event);
        Ok(())
    }

    async fn succeed_run(&self, run_id: &RunId, summary: RunSummary) -> Result<()> {
        self.finish(run_id, RunStatus::Succeeded, summary)
    }

    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> Result<()> {
        self.finish(run_id, RunStatus::Failed, summary)
    }

    async fn get_run(&self, run_id: &RunId) -> Result<RunRecord> {
        self.lock()?
            .get(&run_id.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| WorkflowError::Ledger(format!("run {run_id} not found")))
    }

    async fn get_events(&self, run_id: &RunId) -> Result<Vec<RunEvent>> {
        let runs = self.lock()?;
        let state = runs
            .get(&run_id.0)
            .ok_or_else(|| WorkflowError::Ledger(format!("run {run_id} not found")))?;
        let mut events = state.events.clone();
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    async fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let mut records: Vec<RunRecord> =
            self.lock()?.values().map(|s| s.record.clone()).collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}
