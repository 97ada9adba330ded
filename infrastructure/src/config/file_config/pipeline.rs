//! Pipeline configuration from TOML (`[pipeline]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolflow_application::PipelineParams;
use toolflow_domain::router::CompletionOptions;
use toolflow_domain::{ConfigIssue, ConfigIssueCode, Priority};

/// Raw pipeline configuration from TOML
///
/// # Example
///
/// ```toml
/// [pipeline]
/// max_concurrent = 3
/// max_queued = 100
/// best_effort = false
/// default_priority = "normal"   # "low", "normal", "high"
/// retention_secs = 600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub max_concurrent: usize,
    pub max_queued: usize,
    pub best_effort: bool,
    pub parallel_steps: bool,
    pub default_priority: String,
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
    pub planning_max_tokens: Option<u32>,
    pub planning_temperature: Option<f32>,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let planning = CompletionOptions::default();
        Self {
            max_concurrent: 3,
            max_queued: 100,
            best_effort: false,
            parallel_steps: false,
            default_priority: "normal".to_string(),
            retention_secs: 600,
            cleanup_interval_secs: 60,
            planning_max_tokens: planning.max_tokens,
            planning_temperature: planning.temperature,
        }
    }
}

impl FilePipelineConfig {
    /// Parse default_priority, falling back to normal with a warning.
    pub fn parse_priority(&self) -> (Priority, Vec<ConfigIssue>) {
        match self.default_priority.parse::<Priority>() {
            Ok(priority) => (priority, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::UnknownPriority,
                    format!(
                        "pipeline.default_priority: unknown value '{}', falling back to 'normal'",
                        self.default_priority
                    ),
                );
                (Priority::Normal, vec![issue])
            }
        }
    }

    pub fn to_params(&self) -> PipelineParams {
        let planning = CompletionOptions {
            max_tokens: self.planning_max_tokens,
            temperature: self.planning_temperature,
            ..CompletionOptions::default()
        };
        PipelineParams::default()
            .with_max_concurrent(self.max_concurrent)
            .with_max_queued(self.max_queued)
            .with_best_effort(self.best_effort)
            .with_parallel_steps(self.parallel_steps)
            .with_retention(Duration::from_secs(self.retention_secs))
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval_secs.max(1)))
            .with_planning_options(planning)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.max_concurrent == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroConcurrency,
                "pipeline.max_concurrent must be at least 1",
            ));
        }
        if self.max_queued == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroQueueCapacity,
                "pipeline.max_queued is 0; submissions are rejected whenever all slots are busy",
            ));
        }
        issues.extend(self.parse_priority().1);
        issues
    }
}
