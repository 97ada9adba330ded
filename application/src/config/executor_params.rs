//! Executor parameters: rate limiting, handler timeouts, failure policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toolflow_domain::tool::ExecutionClass;

/// Controls how [`PlanExecutor`](crate::use_cases::run_plan::PlanExecutor)
/// dispatches steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorParams {
    /// Calls per tool per sliding one-minute window.
    pub rate_limit_per_minute: u32,
    /// Handler timeout for interactive tools.
    pub interactive_timeout: Duration,
    /// Handler timeout for long-running tools (commands, scripts).
    pub long_running_timeout: Duration,
    /// Working directory tools are confined to. Defaults to the process cwd.
    pub working_dir: Option<PathBuf>,
    /// Stop after the first failed step; later steps are reported as skipped.
    pub stop_on_failure: bool,
}

impl Default for ExecutorParams {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 60,
            interactive_timeout: Duration::from_secs(10),
            long_running_timeout: Duration::from_secs(30),
            working_dir: None,
            stop_on_failure: false,
        }
    }
}

impl ExecutorParams {
    pub fn timeout_for(&self, class: ExecutionClass) -> Duration {
        match class {
            ExecutionClass::Interactive => self.interactive_timeout,
            ExecutionClass::LongRunning => self.long_running_timeout,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn with_interactive_timeout(mut self, timeout: Duration) -> Self {
        self.interactive_timeout = timeout;
        self
    }

    pub fn with_long_running_timeout(mut self, timeout: Duration) -> Self {
        self.long_running_timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }
}
