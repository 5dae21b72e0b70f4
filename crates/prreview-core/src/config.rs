//! Environment the review engine runs in.
//!
//! The CI job injects exactly [`REVIEW_ENV_VARS`]; nothing else is read from
//! the process environment. Endpoint overrides and model settings live in
//! [`ReviewSettings`] and are supplied by the caller.

use std::fmt;
use std::time::Duration;

use crate::error::{ReviewError, Result};
use crate::github::PullRequestRef;

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const CLICKUP_TOKEN: &str = "CLICKUP_TOKEN";
pub const OLLAMA_API_URL: &str = "OLLAMA_API_URL";
pub const CHECKLIST_API_URL: &str = "CHECKLIST_API_URL";
pub const PR_NUMBER: &str = "PR_NUMBER";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";

/// Names of every variable the review step receives, in declaration order.
pub const REVIEW_ENV_VARS: [&str; 6] = [
    GITHUB_TOKEN,
    CLICKUP_TOKEN,
    OLLAMA_API_URL,
    CHECKLIST_API_URL,
    PR_NUMBER,
    GITHUB_REPOSITORY,
];

/// Values of the review step's environment.
#[derive(Clone)]
pub struct ReviewEnv {
    pub github_token: String,
    pub clickup_token: String,
    pub ollama_api_url: String,
    pub checklist_api_url: String,
    pub pull_request: PullRequestRef,
}

impl ReviewEnv {
    /// Read the environment of the current process.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary name -> value lookup.
    ///
    /// Every variable must be present and non-empty. `PR_NUMBER` must be a
    /// positive integer and `GITHUB_REPOSITORY` an `owner/name` slug.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ReviewError::MissingEnv(name.to_string())),
            }
        };

        let number_raw = get(PR_NUMBER)?;
        let number = number_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ReviewError::InvalidEnv {
                name: PR_NUMBER.to_string(),
                reason: format!("expected a positive integer, got {number_raw:?}"),
            })?;

        let repository = get(GITHUB_REPOSITORY)?;
        let pull_request = PullRequestRef::new(repository.trim(), number).map_err(|reason| {
            ReviewError::InvalidEnv {
                name: GITHUB_REPOSITORY.to_string(),
                reason,
            }
        })?;

        Ok(Self {
            github_token: get(GITHUB_TOKEN)?,
            clickup_token: get(CLICKUP_TOKEN)?,
            ollama_api_url: get(OLLAMA_API_URL)?,
            checklist_api_url: get(CHECKLIST_API_URL)?,
            pull_request,
        })
    }
}

// Tokens must never reach the logs.
impl fmt::Debug for ReviewEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewEnv")
            .field("github_token", &"<redacted>")
            .field("clickup_token", &"<redacted>")
            .field("ollama_api_url", &self.ollama_api_url)
            .field("checklist_api_url", &self.checklist_api_url)
            .field("pull_request", &self.pull_request)
            .finish()
    }
}

/// Knobs that are not part of the injected environment.
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// GitHub REST API root.
    pub github_api_url: String,
    /// ClickUp REST API root.
    pub clickup_api_url: String,
    /// Ollama model name.
    pub model: String,
    /// Attempts per file before giving up on it.
    pub retries: u32,
    /// Pause between attempts for the same file.
    pub retry_delay: Duration,
    /// Build the review but do not post it.
    pub dry_run: bool,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            clickup_api_url: "https://api.clickup.com".to_string(),
            model: "llama3.1".to_string(),
            retries: 5,
            retry_delay: Duration::ZERO,
            dry_run: false,
        }
    }
}
