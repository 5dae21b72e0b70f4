//! Step execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::env::JobEnv;
use crate::stage::StageConfig;

/// Result of a stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success, -1 when the process never exited normally).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Runs one step as a child process.
pub struct CiRunner;

impl CiRunner {
    /// Execute a single stage and return the result.
    ///
    /// Steps with `inject_env` receive the job environment; every other step
    /// has those names removed so secrets never reach it. Spawn failures and
    /// timeouts are returned as errors; a non-zero exit is a normal result.
    pub async fn execute_stage(config: &StageConfig, env: &JobEnv) -> anyhow::Result<StageResult> {
        let start = Instant::now();

        let (exe, args) = config
            .command
            .split_first()
            .with_context(|| format!("Stage {} has empty command", config.name))?;

        let mut command = Command::new(exe);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if config.inject_env {
            command.envs(env.iter());
        } else {
            for name in env.names() {
                command.env_remove(name);
            }
        }
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        debug!(stage = %config.name, inject_env = config.inject_env, "Spawning stage");
        let child = command
            .spawn()
            .with_context(|| format!("Stage {} failed to spawn '{}'", config.name, exe))?;

        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Stage {} timed out after {} seconds",
                    config.name,
                    config.timeout_secs
                )
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
