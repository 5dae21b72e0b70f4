//! End-to-end review of one pull request.
//!
//! Order of work: resolve the checklist location, fetch the diff, fetch the
//! checklist, review each file with the model, then publish one GitHub
//! review. Files are reviewed sequentially, in diff order.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::checklist::{ChecklistClient, ChecklistLocation};
use crate::config::{ReviewEnv, ReviewSettings};
use crate::diff::{split_diff, FileDiff};
use crate::error::Result;
use crate::github::{GitHubClient, PullRequestRef};
use crate::ollama::{OllamaClient, ReviewModel};
use crate::prompt::build_review_prompt;
use crate::render::ReviewPayload;
use crate::review::{parse_review, FileOutcome, ReviewSet};

const USER_AGENT: &str = concat!("prreview/", env!("CARGO_PKG_VERSION"));

/// Reviews files with a model, retrying each file independently.
pub struct ReviewEngine<M> {
    model: M,
    retries: u32,
    retry_delay: Duration,
}

impl<M: ReviewModel> ReviewEngine<M> {
    /// `retries` is the number of attempts per file; zero is treated as one.
    pub fn new(model: M, retries: u32, retry_delay: Duration) -> Self {
        Self {
            model,
            retries: retries.max(1),
            retry_delay,
        }
    }

    /// Review one file. Never fails; exhausted retries yield `Failed`.
    pub async fn review_file(&self, file: &FileDiff, checklist: &str) -> FileOutcome {
        let prompt = build_review_prompt(&file.path, checklist, &file.body);
        info!(file = %file.path, model = self.model.name(), "Reviewing file");

        for attempt in 1..=self.retries {
            let result = match self.model.generate(&prompt).await {
                Ok(output) => {
                    debug!(file = %file.path, output = %output, "Model output");
                    parse_review(&output)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(review) => return FileOutcome::Reviewed(review),
                Err(e) => {
                    warn!(
                        file = %file.path,
                        attempt,
                        max_attempts = self.retries,
                        error = %e,
                        "Review attempt failed"
                    );
                    if attempt < self.retries && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        error!(file = %file.path, "All review attempts exhausted");
        FileOutcome::Failed {
            error: format!(
                "Failed to get a valid response after {} attempts",
                self.retries
            ),
        }
    }

    /// Review every file, preserving diff order.
    pub async fn review_all(&self, files: &[FileDiff], checklist: &str) -> ReviewSet {
        let mut reviews = ReviewSet::new();
        for file in files {
            let outcome = self.review_file(file, checklist).await;
            reviews.insert(file.path.clone(), outcome);
        }
        reviews
    }
}

/// What a review run did.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub pull_request: PullRequestRef,
    pub files_reviewed: usize,
    pub files_failed: usize,
    pub reviews: ReviewSet,
    /// Absent when the diff had no files.
    pub payload: Option<ReviewPayload>,
    /// GitHub's reply; absent on dry runs and empty diffs.
    pub github_response: Option<serde_json::Value>,
}

/// Build the shared HTTP client.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Review the pull request described by `env` and publish the result.
pub async fn run_review(env: &ReviewEnv, settings: &ReviewSettings) -> Result<ReviewReport> {
    let pr = &env.pull_request;
    let location = ChecklistLocation::parse(&env.checklist_api_url)?;

    let http = http_client()?;
    let github = GitHubClient::new(http.clone(), &settings.github_api_url, &env.github_token);
    let checklists = ChecklistClient::new(
        http.clone(),
        &settings.clickup_api_url,
        &env.clickup_token,
    );
    let model = OllamaClient::new(http, &env.ollama_api_url, &settings.model);
    let engine = ReviewEngine::new(model, settings.retries, settings.retry_delay);

    let diff = github.fetch_diff(pr).await?;
    debug!(diff = %diff, "Pull request diff");

    let files = split_diff(&diff);
    if files.is_empty() {
        info!(pull_request = %pr, "Diff has no files, nothing to review");
        return Ok(ReviewReport {
            pull_request: pr.clone(),
            files_reviewed: 0,
            files_failed: 0,
            reviews: ReviewSet::new(),
            payload: None,
            github_response: None,
        });
    }
    info!(files = files.len(), "Split diff into files");

    let checklist = checklists.fetch(&location).await;
    debug!(checklist = %checklist, "Review checklist");

    let reviews = engine.review_all(&files, &checklist).await;
    let payload = ReviewPayload::from_reviews(&reviews);

    let github_response = if settings.dry_run {
        info!("Dry run, review not posted");
        None
    } else {
        Some(github.post_review(pr, &payload).await?)
    };

    Ok(ReviewReport {
        pull_request: pr.clone(),
        files_reviewed: reviews.len(),
        files_failed: reviews.failed_count(),
        reviews,
        payload: Some(payload),
        github_response,
    })
}
