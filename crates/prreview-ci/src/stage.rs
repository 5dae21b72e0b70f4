//! Step definitions for the review job.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Builtin steps of the default job, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// git fetch --prune --tags origin
    Checkout,

    /// rustup show active-toolchain
    Toolchain,

    /// cargo install --locked --path crates/prreview-cli
    Install,

    /// prreview review
    Review,
}

impl BuiltinStage {
    pub const ALL: [BuiltinStage; 4] = [
        BuiltinStage::Checkout,
        BuiltinStage::Toolchain,
        BuiltinStage::Install,
        BuiltinStage::Review,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Checkout => "checkout",
            BuiltinStage::Toolchain => "toolchain",
            BuiltinStage::Install => "install",
            BuiltinStage::Review => "review",
        }
    }

    /// Get the stage's command.
    pub fn command(&self) -> Vec<String> {
        let argv: &[&str] = match self {
            BuiltinStage::Checkout => &["git", "fetch", "--prune", "--tags", "origin"],
            BuiltinStage::Toolchain => &["rustup", "show", "active-toolchain"],
            BuiltinStage::Install => &[
                "cargo",
                "install",
                "--locked",
                "--path",
                "crates/prreview-cli",
            ],
            BuiltinStage::Review => &["prreview", "review"],
        };
        argv.iter().map(|s| s.to_string()).collect()
    }

    /// Default timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            BuiltinStage::Checkout => 300,
            BuiltinStage::Toolchain => 120,
            BuiltinStage::Install => 1800,
            BuiltinStage::Review => 3600,
        }
    }

    /// Only the review step sees the job environment.
    pub fn injects_env(&self) -> bool {
        matches!(self, BuiltinStage::Review)
    }
}

fn enabled_default() -> bool {
    true
}

/// Configuration for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique step name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds; 0 disables the limit.
    #[serde(default)]
    pub timeout_secs: u64,

    #[serde(default = "enabled_default")]
    pub enabled: bool,

    /// Pass the job environment (secrets + PR context) to this step.
    #[serde(default)]
    pub inject_env: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl StageConfig {
    /// Create a stage configuration from a builtin stage with its default timeout.
    pub fn from_builtin(stage: BuiltinStage) -> Self {
        Self {
            name: stage.name().to_string(),
            command: stage.command(),
            timeout_secs: stage.timeout_secs(),
            enabled: true,
            inject_env: stage.injects_env(),
            working_dir: None,
        }
    }

    /// Create a custom stage configuration.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            timeout_secs,
            enabled: true,
            inject_env: false,
            working_dir: None,
        }
    }

    /// Disable this stage.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_env(mut self) -> Self {
        self.inject_env = true;
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_stage_names() {
        let names: Vec<&str> = BuiltinStage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["checkout", "toolchain", "install", "review"]);
    }

    #[test]
    fn test_builtin_stage_commands() {
        let checkout = BuiltinStage::Checkout.command();
        assert_eq!(checkout[0], "git");
        assert!(checkout.contains(&"--prune".to_string()));

        let install = BuiltinStage::Install.command();
        assert_eq!(install[0], "cargo");
        assert!(install.contains(&"--locked".to_string()));

        assert_eq!(BuiltinStage::Review.command(), vec!["prreview", "review"]);
    }

    #[test]
    fn test_only_review_injects_env() {
        for stage in BuiltinStage::ALL {
            assert_eq!(
                StageConfig::from_builtin(stage).inject_env,
                stage == BuiltinStage::Review
            );
        }
    }

    #[test]
    fn test_stage_config_custom() {
        let config = StageConfig::custom(
            "my_stage".to_string(),
            vec!["echo".to_string(), "hello".to_string()],
            60,
        );
        assert_eq!(config.name, "my_stage");
        assert_eq!(config.timeout_secs, 60);
        assert!(config.enabled);
        assert!(!config.inject_env);
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn test_stage_config_builders() {
        let config = StageConfig::from_builtin(BuiltinStage::Install)
            .disabled()
            .in_dir("/tmp/ws");
        assert!(!config.enabled);
        assert_eq!(config.working_dir, Some(PathBuf::from("/tmp/ws")));

        let config = StageConfig::custom("env".into(), vec!["env".into()], 5).with_env();
        assert!(config.inject_env);
    }

    #[test]
    fn test_toml_defaults() {
        let config: StageConfig =
            toml::from_str(r#"name = "lint"
command = ["cargo", "fmt"]"#)
                .unwrap();
        assert!(config.enabled);
        assert!(!config.inject_env);
        assert_eq!(config.timeout_secs, 0);
    }
}
