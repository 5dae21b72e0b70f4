//! prreview Core - the review engine run by the CI job
//!
//! Turns a pull request into a GitHub review:
//! - Fetches the PR diff and splits it per file
//! - Pulls the team checklist from a ClickUp doc
//! - Asks an Ollama model to review each file, with retries
//! - Posts one review with a comment per file and a summary

pub mod checklist;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod github;
pub mod ollama;
pub mod prompt;
pub mod render;
pub mod review;
pub mod telemetry;

// Re-export key types
pub use checklist::{clean_markdown, ChecklistClient, ChecklistLocation, DocPage};
pub use config::{ReviewEnv, ReviewSettings, REVIEW_ENV_VARS};
pub use diff::{split_diff, FileDiff};
pub use engine::{run_review, ReviewEngine, ReviewReport};
pub use error::{Result, ReviewError};
pub use github::{GitHubClient, PullRequestRef};
pub use ollama::{OllamaClient, ReviewModel};
pub use render::{ReviewComment, ReviewEvent, ReviewPayload};
pub use review::{FileOutcome, FileReview, ReviewSet};
pub use telemetry::init_tracing;
