//! GitHub REST calls: fetch a pull request's diff and post a review.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{ReviewError, Result};
use crate::render::ReviewPayload;

const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

/// A pull request in a repository (`owner/name#number`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// `owner/name` slug.
    pub repository: String,
    pub number: u64,
}

impl PullRequestRef {
    /// Validate the slug and number and build the reference.
    pub fn new(repository: &str, number: u64) -> std::result::Result<Self, String> {
        if number == 0 {
            return Err("pull request number must be positive".to_string());
        }
        match repository.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    repository: repository.to_string(),
                    number,
                })
            }
            _ => Err(format!("expected owner/name, got {repository:?}")),
        }
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// Minimal GitHub client authenticated with a repository token.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn pull_url(&self, pr: &PullRequestRef) -> String {
        format!("{}/repos/{}/pulls/{}", self.api_url, pr.repository, pr.number)
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    /// Fetch the unified diff of a pull request.
    pub async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<String> {
        info!(pull_request = %pr, "Fetching pull request diff");

        let response = self
            .http
            .get(self.pull_url(pr))
            .header("Authorization", self.auth_header())
            .header("Accept", ACCEPT_DIFF)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(pull_request = %pr, status = status.as_u16(), "GitHub API error fetching diff");
            return Err(ReviewError::Api {
                service: "GitHub",
                status: status.as_u16(),
                body,
            });
        }

        let diff = response.text().await?;
        info!(bytes = diff.len(), "Fetched diff");
        Ok(diff)
    }

    /// Create a review on the pull request and return GitHub's reply.
    pub async fn post_review(
        &self,
        pr: &PullRequestRef,
        payload: &ReviewPayload,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/reviews", self.pull_url(pr));
        info!(
            pull_request = %pr,
            comments = payload.comments.len(),
            "Posting review"
        );
        debug!(
            payload = %serde_json::to_string(payload).unwrap_or_default(),
            "Review payload"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", ACCEPT_JSON)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(pull_request = %pr, status = status.as_u16(), "GitHub API error posting review");
            return Err(ReviewError::Api {
                service: "GitHub",
                status: status.as_u16(),
                body,
            });
        }

        let reply: serde_json::Value = response.json().await?;
        info!(review_id = %reply["id"], "Review posted");
        Ok(reply)
    }
}
