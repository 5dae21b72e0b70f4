//! Label-gated trigger rule.

use prreview_core::PullRequestRef;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};
use crate::event::PullRequestEvent;

/// Label that starts a review unless the workflow says otherwise.
pub const DEFAULT_TRIGGER_LABEL: &str = "Ready for Review";

/// Trigger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Event family; payloads from any other family are skipped.
    #[serde(default = "default_event")]
    pub event: String,

    #[serde(default = "default_action")]
    pub action: String,

    /// Compared byte-for-byte with the applied label.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_event() -> String {
    "pull_request".to_string()
}

fn default_action() -> String {
    "labeled".to_string()
}

fn default_label() -> String {
    DEFAULT_TRIGGER_LABEL.to_string()
}

impl Default for TriggerRule {
    fn default() -> Self {
        Self {
            event: default_event(),
            action: default_action(),
            label: default_label(),
        }
    }
}

/// What the triggered job knows about its pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub pull_request: PullRequestRef,
}

impl JobContext {
    /// Value of `PR_NUMBER`.
    pub fn pr_number(&self) -> String {
        self.pull_request.number.to_string()
    }

    /// Value of `GITHUB_REPOSITORY`.
    pub fn repository(&self) -> &str {
        &self.pull_request.repository
    }
}

/// Outcome of evaluating the rule against one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TriggerDecision {
    Run { context: JobContext },
    Skip { reason: String },
}

impl TriggerDecision {
    pub fn should_run(&self) -> bool {
        matches!(self, TriggerDecision::Run { .. })
    }
}

impl TriggerRule {
    pub fn with_label(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Decide whether `event` schedules the job.
    ///
    /// Evaluations are independent: the same event twice yields two `Run`
    /// decisions. A skip is not an error; a matching event that lacks the PR
    /// number or repository is.
    pub fn evaluate(&self, event: &PullRequestEvent) -> Result<TriggerDecision> {
        if event.event_name() != self.event {
            return Ok(TriggerDecision::Skip {
                reason: format!("event is '{}', not '{}'", event.event_name(), self.event),
            });
        }

        if event.action != self.action {
            return Ok(TriggerDecision::Skip {
                reason: format!("action is '{}', not '{}'", event.action, self.action),
            });
        }

        let label = match event.label_name() {
            Some(label) => label,
            None => {
                return Ok(TriggerDecision::Skip {
                    reason: "event carries no label".to_string(),
                })
            }
        };

        if label != self.label {
            return Ok(TriggerDecision::Skip {
                reason: format!("label '{}' does not match '{}'", label, self.label),
            });
        }

        let number = event
            .pr_number()
            .ok_or_else(|| WorkflowError::InvalidEvent("pull request number missing".into()))?;
        let repository = event
            .repository_name()
            .ok_or_else(|| WorkflowError::InvalidEvent("repository missing".into()))?;
        let pull_request =
            PullRequestRef::new(repository, number).map_err(WorkflowError::InvalidEvent)?;

        Ok(TriggerDecision::Run {
            context: JobContext { pull_request },
        })
    }
}
