//! Workflow definition: trigger, declared secrets and the ordered steps.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use prreview_core::config::{GITHUB_REPOSITORY, PR_NUMBER};

use crate::error::{Result, WorkflowError};
use crate::stage::{BuiltinStage, StageConfig};
use crate::trigger::TriggerRule;

/// Secrets the default workflow declares.
pub const DEFAULT_SECRETS: [&str; 4] = [
    "GITHUB_TOKEN",
    "CLICKUP_TOKEN",
    "OLLAMA_API_URL",
    "CHECKLIST_API_URL",
];

/// `[env]` table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvSpec {
    #[serde(default)]
    pub secrets: Vec<String>,
}

/// A complete workflow definition, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,

    #[serde(default)]
    pub trigger: TriggerRule,

    #[serde(default)]
    pub env: EnvSpec,

    pub steps: Vec<StageConfig>,
}

impl Default for WorkflowSpec {
    fn default() -> Self {
        Self {
            name: "AI PR Review".to_string(),
            trigger: TriggerRule::default(),
            env: EnvSpec {
                secrets: DEFAULT_SECRETS.iter().map(|s| s.to_string()).collect(),
            },
            steps: BuiltinStage::ALL
                .into_iter()
                .map(StageConfig::from_builtin)
                .collect(),
        }
    }
}

impl WorkflowSpec {
    /// Parse and validate a TOML definition.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let spec: WorkflowSpec = toml::from_str(source)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WorkflowError::InvalidWorkflow(format!("cannot serialize: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.trigger.event != "pull_request" {
            return Err(WorkflowError::InvalidWorkflow(format!(
                "trigger event '{}' is not supported; only pull_request events carry a pull request",
                self.trigger.event
            )));
        }

        if self.steps.is_empty() {
            return Err(WorkflowError::InvalidWorkflow(
                "workflow has no steps".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
            if step.command.first().map_or(true, |exe| exe.is_empty()) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "step '{}' has an empty command",
                    step.name
                )));
            }
        }

        for secret in &self.env.secrets {
            if secret == PR_NUMBER || secret == GITHUB_REPOSITORY {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "'{secret}' is provided by the job context and cannot be a secret"
                )));
            }
        }

        Ok(())
    }

    /// SHA-256 over the canonical JSON form; identifies the definition a run used.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}
