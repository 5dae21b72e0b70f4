//! Job environment passed to the review step.

use std::collections::BTreeMap;
use std::fmt;

use prreview_core::config::{GITHUB_REPOSITORY, PR_NUMBER};

use crate::error::{Result, WorkflowError};
use crate::trigger::JobContext;

/// Environment variables handed to steps with `inject_env` set.
///
/// Holds exactly the declared secrets plus the two context variables.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JobEnv {
    vars: BTreeMap<String, String>,
}

impl JobEnv {
    /// Resolve declared secrets through `lookup` and add the job context.
    ///
    /// A secret that is unset or empty fails the job before any step runs.
    pub fn resolve<F>(secrets: &[String], context: &JobContext, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = BTreeMap::new();
        for name in secrets {
            let value = lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| WorkflowError::MissingSecret(name.clone()))?;
            vars.insert(name.clone(), value);
        }
        vars.insert(PR_NUMBER.to_string(), context.pr_number());
        vars.insert(
            GITHUB_REPOSITORY.to_string(),
            context.repository().to_string(),
        );
        Ok(Self { vars })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for JobEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
