//! Plan value objects.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::parser::sanitize_tool_name;

/// Reasoning used when a parsed plan does not carry one.
pub const DEFAULT_REASONING: &str = "Auto-generated plan";
/// Confidence used when a parsed plan does not carry one.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;
/// Estimated duration used when a parsed plan does not carry one.
pub const DEFAULT_ESTIMATED_TIME_MS: f64 = 60_000.0;

/// A single tool invocation inside a plan.
///
/// The tool name is always sanitized to `[A-Za-z0-9_-]`, whichever way the
/// step was built. `args` is passed through untouched; argument validation
/// happens against the tool's schema at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    tool: String,
    args: Value,
}

impl PlanStep {
    /// Build a step from a trusted caller. The name is sanitized.
    pub fn new(tool: &str, args: Value) -> Self {
        Self {
            tool: sanitize_tool_name(tool),
            args,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn args(&self) -> &Value {
        &self.args
    }
}

/// A validated tool plan.
///
/// Immutable once parsed. Invariants: `0 <= confidence <= 1` and
/// `estimated_time_ms >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPlan {
    steps: Vec<PlanStep>,
    reasoning: String,
    confidence: f64,
    dependencies: Vec<String>,
    estimated_time_ms: f64,
}

impl ToolPlan {
    pub(crate) fn from_parts(
        steps: Vec<PlanStep>,
        reasoning: String,
        confidence: f64,
        dependencies: Vec<String>,
        estimated_time_ms: f64,
    ) -> Self {
        debug_assert!((0.0..=1.0).contains(&confidence));
        debug_assert!(estimated_time_ms >= 0.0);
        Self {
            steps,
            reasoning,
            confidence,
            dependencies,
            estimated_time_ms,
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn estimated_time_ms(&self) -> f64 {
        self.estimated_time_ms
    }

    pub fn estimated_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.estimated_time_ms / 1000.0).unwrap_or(Duration::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of the tools the plan references, in step order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.tool())
    }

    pub fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }
}

/// A guaranteed-safe plan with zero steps.
pub fn empty_plan() -> ToolPlan {
    ToolPlan::from_parts(Vec::new(), "No action".to_string(), 0.0, Vec::new(), 0.0)
}
