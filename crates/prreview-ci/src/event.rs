//! Pull-request event payloads as delivered by GitHub.
//!
//! Only the fields the trigger reads are modelled; everything else in the
//! payload is ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// A `pull_request` event (webhook body or `$GITHUB_EVENT_PATH` file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,

    /// Present on `labeled` / `unlabeled` actions.
    #[serde(default)]
    pub label: Option<Label>,

    #[serde(default)]
    pub number: Option<u64>,

    #[serde(default)]
    pub pull_request: Option<PullRequest>,

    #[serde(default)]
    pub repository: Option<Repository>,

    /// Present on `issues` events, which share the `labeled` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

impl PullRequestEvent {
    /// Build a `labeled` event; mostly useful for tests and dry runs.
    pub fn labeled(label: &str, number: u64, repository: &str) -> Self {
        Self {
            action: "labeled".to_string(),
            label: Some(Label {
                name: label.to_string(),
            }),
            number: Some(number),
            pull_request: Some(PullRequest { number }),
            repository: Some(Repository {
                full_name: repository.to_string(),
            }),
            issue: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WorkflowError::InvalidEvent(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Event family the payload belongs to.
    pub fn event_name(&self) -> &'static str {
        if self.issue.is_some() && self.pull_request.is_none() {
            "issues"
        } else {
            "pull_request"
        }
    }

    /// PR number, preferring the nested pull request object.
    pub fn pr_number(&self) -> Option<u64> {
        self.pull_request.as_ref().map(|pr| pr.number).or(self.number)
    }

    pub fn label_name(&self) -> Option<&str> {
        self.label.as_ref().map(|l| l.name.as_str())
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.full_name.as_str())
    }
}
