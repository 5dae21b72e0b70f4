//! Pass/fail verdict over a run's events.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ledger::{EventKind, RunEvent};

/// Skip reason recorded for steps that never ran because an earlier one failed.
pub const SKIP_HALTED: &str = "halted";

/// Skip reason recorded for steps the workflow turns off.
pub const SKIP_DISABLED: &str = "disabled";

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

pub struct CiGate;

impl CiGate {
    /// Evaluate whether the job ran cleanly.
    ///
    /// Every `step_started` must be followed by a `step_succeeded` with exit
    /// code 0. A `step_failed`, a step skipped because the run halted, or a
    /// step that started but never completed is a violation. Disabled steps
    /// do not count.
    pub fn evaluate(events: &[RunEvent]) -> GateVerdict {
        let mut violations = Vec::new();
        let mut started: Vec<&str> = Vec::new();
        let mut settled: HashSet<&str> = HashSet::new();

        for event in events {
            let step = event.step().unwrap_or("unknown");
            match event.kind {
                EventKind::JobTriggered => {}
                EventKind::StepStarted => started.push(step),
                EventKind::StepSucceeded => {
                    settled.insert(step);
                    let exit_code = event.payload["exit_code"].as_i64().unwrap_or(-1);
                    if exit_code != 0 {
                        violations.push(format!(
                            "Step '{}' returned non-zero exit code: {}",
                            step, exit_code
                        ));
                    }
                }
                EventKind::StepFailed => {
                    settled.insert(step);
                    let error = event.payload["error"].as_str().unwrap_or("Unknown error");
                    violations.push(format!("Step '{}' failed: {}", step, error));
                }
                EventKind::StepSkipped => {
                    if event.payload["reason"].as_str() != Some(SKIP_DISABLED) {
                        violations.push(format!("Step '{}' was not run", step));
                    }
                }
            }
        }

        for step in started {
            if !settled.contains(step) {
                violations.push(format!("Step '{}' was started but never completed", step));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "All steps passed".to_string()
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}
