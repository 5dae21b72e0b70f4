//! prreview CI - the label-gated review job
//!
//! Decides from a pull-request event whether the review job runs, resolves
//! the job environment, then executes the ordered step sequence while
//! recording every transition into a run ledger that the gate evaluates.

pub mod env;
pub mod error;
pub mod event;
pub mod gate;
pub mod ledger;
pub mod pipeline;
pub mod runner;
pub mod stage;
pub mod trigger;
pub mod workflow;

pub use env::JobEnv;
pub use error::{Result, WorkflowError};
pub use event::PullRequestEvent;
pub use gate::{CiGate, GateVerdict};
pub use ledger::{
    EventKind, MemoryRunLedger, RunEvent, RunId, RunLedger, RunMetadata, RunRecord, RunStatus,
    RunSummary,
};
pub use pipeline::{CiPipeline, JobOutcome, PipelineResult};
pub use runner::{CiRunner, StageResult};
pub use stage::{BuiltinStage, StageConfig};
pub use trigger::{JobContext, TriggerDecision, TriggerRule, DEFAULT_TRIGGER_LABEL};
pub use workflow::{EnvSpec, WorkflowSpec, DEFAULT_SECRETS};
