//! Pipeline parameters: admission bounds, aggregation mode, retention.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolflow_domain::router::CompletionOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Executions allowed to run at once.
    pub max_concurrent: usize,
    /// Executions allowed to wait for a slot; further submissions are rejected.
    pub max_queued: usize,
    /// Report partial success as overall success.
    pub best_effort: bool,
    /// Run plan steps concurrently. Only safe for independent steps.
    pub parallel_steps: bool,
    /// How long finished executions stay in the table.
    pub retention: Duration,
    /// Interval of the background cleanup task.
    pub cleanup_interval: Duration,
    /// Options for the planning completion call.
    pub planning: CompletionOptions,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queued: 100,
            best_effort: false,
            parallel_steps: false,
            retention: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
            planning: CompletionOptions::default(),
        }
    }
}

impl PipelineParams {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_max_queued(mut self, max: usize) -> Self {
        self.max_queued = max;
        self
    }

    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }

    pub fn with_parallel_steps(mut self, parallel: bool) -> Self {
        self.parallel_steps = parallel;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_planning_options(mut self, options: CompletionOptions) -> Self {
        self.planning = options;
        self
    }
}
