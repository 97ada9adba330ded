//! Executor configuration from TOML (`[executor]` section)

use crate::tools::BuiltinTools;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toolflow_application::ExecutorParams;
use toolflow_domain::{ConfigIssue, ConfigIssueCode};

/// Raw executor configuration from TOML
///
/// # Example
///
/// ```toml
/// [executor]
/// rate_limit_per_minute = 60
/// interactive_timeout_ms = 10000
/// long_running_timeout_ms = 30000
/// working_dir = "/srv/workspace"
/// stop_on_failure = false
/// enable_commands = true
/// allowed_programs = ["git", "ls"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    /// Calls per tool per minute
    pub rate_limit_per_minute: u32,
    pub interactive_timeout_ms: u64,
    pub long_running_timeout_ms: u64,
    /// Defaults to the process working directory
    pub working_dir: Option<PathBuf>,
    pub stop_on_failure: bool,
    /// Register `execute_command`
    pub enable_commands: bool,
    /// Programs `execute_command` may run; unset allows any
    pub allowed_programs: Option<Vec<String>>,
    /// Register `fetch_url` (requires the `web-tools` feature)
    pub enable_web: bool,
    pub fetch_max_bytes: Option<usize>,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 60,
            interactive_timeout_ms: 10_000,
            long_running_timeout_ms: 30_000,
            working_dir: None,
            stop_on_failure: false,
            enable_commands: false,
            allowed_programs: None,
            enable_web: true,
            fetch_max_bytes: None,
        }
    }
}

impl FileExecutorConfig {
    pub fn to_params(&self) -> ExecutorParams {
        let mut params = ExecutorParams::default()
            .with_rate_limit(self.rate_limit_per_minute)
            .with_interactive_timeout(Duration::from_millis(self.interactive_timeout_ms))
            .with_long_running_timeout(Duration::from_millis(self.long_running_timeout_ms))
            .with_stop_on_failure(self.stop_on_failure);
        if let Some(dir) = &self.working_dir {
            params = params.with_working_dir(dir.clone());
        }
        params
    }

    pub fn builtin_tools(&self) -> BuiltinTools {
        BuiltinTools {
            commands: self.enable_commands,
            allowed_programs: self.allowed_programs.clone(),
            web: self.enable_web,
            fetch_max_bytes: self.fetch_max_bytes,
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.rate_limit_per_minute == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroRateLimit,
                "executor.rate_limit_per_minute must be at least 1",
            ));
        }
        for (field, value) in [
            ("interactive_timeout_ms", self.interactive_timeout_ms),
            ("long_running_timeout_ms", self.long_running_timeout_ms),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroTimeout,
                    format!("executor.{field} must be greater than 0"),
                ));
            }
        }
        if self.enable_commands && self.allowed_programs.is_none() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnrestrictedCommands,
                "executor.enable_commands is set without executor.allowed_programs; any program may run",
            ));
        }

        issues
    }
}
