//! Error types for the review engine.

use thiserror::Error;

/// Errors that can occur while producing or publishing a review.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// A required environment variable is not set
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    /// An environment variable is set but unusable
    #[error("invalid environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },

    /// The checklist URL does not point at a ClickUp doc page
    #[error("invalid checklist URL: {0}")]
    InvalidChecklistUrl(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// A remote API answered with a non-success status
    #[error("{service} API error: {status} - {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// A remote API answered successfully with an unusable body
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The model output could not be decoded into a review
    #[error("invalid model output: {0}")]
    InvalidModelOutput(String),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        ReviewError::Http(err.to_string())
    }
}

/// Result type for review engine operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
