//! Pipeline results and counters.

use serde::Serialize;

use super::entities::{ExecutionId, Priority};
use crate::tool::ToolResult;

/// Prefix of every planning failure message.
pub const PLANNING_FAILED: &str = "Tool planning failed";

/// Aggregated outcome of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub execution_id: ExecutionId,
    pub success: bool,
    pub steps: Vec<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: PipelineMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub session_id: String,
    pub priority: Priority,
    /// Backend that produced the plan, if a model was consulted
    pub planned_by: Option<String>,
    pub plan_reasoning: Option<String>,
    pub plan_confidence: Option<f64>,
    pub planning_tokens: u64,
    pub planning_cost: f64,
    pub step_count: usize,
    pub failed_steps: usize,
    pub best_effort: bool,
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Aggregate step results.
    ///
    /// Strict mode succeeds only when every step succeeded. Best-effort mode
    /// succeeds when at least one step did (or the plan was empty); the
    /// per-step detail is kept either way.
    pub fn from_steps(execution_id: ExecutionId, steps: Vec<ToolResult>, best_effort: bool) -> Self {
        let failed = steps.iter().filter(|s| !s.is_success()).count();
        let success = if best_effort {
            steps.is_empty() || failed < steps.len()
        } else {
            failed == 0
        };
        let error = (failed > 0).then(|| format!("{failed} of {} steps failed", steps.len()));

        Self {
            execution_id,
            success,
            metadata: PipelineMetadata {
                step_count: steps.len(),
                failed_steps: failed,
                best_effort,
                ..Default::default()
            },
            steps,
            error,
        }
    }

    /// Planning produced no plan; nothing was executed.
    pub fn planning_failed(execution_id: ExecutionId, reason: impl AsRef<str>) -> Self {
        Self {
            execution_id,
            success: false,
            steps: Vec::new(),
            error: Some(format!("{PLANNING_FAILED}: {}", reason.as_ref())),
            metadata: PipelineMetadata::default(),
        }
    }

    pub fn cancelled(execution_id: ExecutionId, steps: Vec<ToolResult>) -> Self {
        let step_count = steps.len();
        Self {
            execution_id,
            success: false,
            steps,
            error: Some("Execution cancelled".to_string()),
            metadata: PipelineMetadata {
                step_count,
                ..Default::default()
            },
        }
    }

    pub fn is_planning_failure(&self) -> bool {
        self.error
            .as_deref()
            .is_some_and(|e| e.starts_with(PLANNING_FAILED))
    }

    pub fn with_metadata(mut self, f: impl FnOnce(&mut PipelineMetadata)) -> Self {
        f(&mut self.metadata);
        self
    }
}

/// Pipeline-wide counters. `queued` and `running` are gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub queued: usize,
    pub running: usize,
}
