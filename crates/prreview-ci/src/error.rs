//! Error types for the workflow layer.

use thiserror::Error;

/// Errors raised before or around running the job's steps.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The event payload is not a usable pull-request event
    #[error("invalid event payload: {0}")]
    InvalidEvent(String),

    /// The workflow definition is inconsistent
    #[error("invalid workflow definition: {0}")]
    InvalidWorkflow(String),

    /// A declared secret is not available on the runner
    #[error("secret {0} is declared but not set")]
    MissingSecret(String),

    /// Run ledger failure
    #[error("run ledger error: {0}")]
    Ledger(String),

    /// TOML parsing error
    #[error("workflow TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
