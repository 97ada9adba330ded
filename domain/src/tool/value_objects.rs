//! Tool domain value objects: immutable result and error types
//!
//! Every executed plan step produces exactly one [`ToolResult`]. Failures are
//! data: policy rejections, handler errors, timeouts and panics all become a
//! result with `success == false` and a [`ToolErrorCode`] in its metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    UnknownTool,
    NotAllowed,
    RateLimited,
    ElevatedAuthRequired,
    InvalidArgument,
    PathTraversal,
    NotFound,
    PermissionDenied,
    ExecutionFailed,
    Timeout,
    Cancelled,
    Skipped,
    Panicked,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::UnknownTool => "UNKNOWN_TOOL",
            ToolErrorCode::NotAllowed => "NOT_ALLOWED",
            ToolErrorCode::RateLimited => "RATE_LIMITED",
            ToolErrorCode::ElevatedAuthRequired => "ELEVATED_AUTH_REQUIRED",
            ToolErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ToolErrorCode::PathTraversal => "PATH_TRAVERSAL",
            ToolErrorCode::NotFound => "NOT_FOUND",
            ToolErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ToolErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ToolErrorCode::Timeout => "TIMEOUT",
            ToolErrorCode::Cancelled => "CANCELLED",
            ToolErrorCode::Skipped => "SKIPPED",
            ToolErrorCode::Panicked => "PANICKED",
        }
    }

    /// Policy rejections never reach the handler.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            ToolErrorCode::UnknownTool
                | ToolErrorCode::NotAllowed
                | ToolErrorCode::RateLimited
                | ToolErrorCode::ElevatedAuthRequired
        )
    }
}

impl std::fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that occurred while dispatching or running a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ToolErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    pub fn new(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unknown_tool() -> Self {
        Self::new(ToolErrorCode::UnknownTool, "Unknown tool")
    }

    pub fn not_allowed(tool: &str) -> Self {
        Self::new(
            ToolErrorCode::NotAllowed,
            format!("Tool '{}' is not permitted in this context", tool),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(ToolErrorCode::RateLimited, "Rate limit exceeded")
    }

    pub fn elevated_auth_required() -> Self {
        Self::new(
            ToolErrorCode::ElevatedAuthRequired,
            "Elevated authentication required",
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::InvalidArgument, message)
    }

    pub fn path_traversal(path: &str) -> Self {
        Self::new(
            ToolErrorCode::PathTraversal,
            format!("Path traversal is not allowed: {}", path),
        )
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ToolErrorCode::NotFound,
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Self::new(
            ToolErrorCode::PermissionDenied,
            format!("Permission denied: {}", resource.into()),
        )
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::ExecutionFailed, message)
    }

    pub fn timeout(after_ms: u64) -> Self {
        Self::new(
            ToolErrorCode::Timeout,
            format!("Tool timed out after {} ms", after_ms),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ToolErrorCode::Cancelled, "Execution cancelled")
    }

    pub fn skipped() -> Self {
        Self::new(
            ToolErrorCode::Skipped,
            "Skipped after an earlier step failed",
        )
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::Panicked, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Result of executing one plan step.
///
/// `output` is present iff `success`; `error` is present iff not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool the step referenced
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock latency of the step, including policy checks
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolResultMetadata>,
}

/// Structured metadata about a step execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Position of the step in the plan
    pub step_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ToolErrorCode>,
    /// Trace id of the plan run this step belonged to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool: impl Into<String>, output: Value) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            output: Some(output),
            error: None,
            latency_ms: 0,
            metadata: None,
        }
    }

    /// Create a failed result carrying the error's code in metadata
    pub fn failure(tool: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            output: None,
            error: Some(error.message),
            latency_ms: 0,
            metadata: Some(ToolResultMetadata {
                error_code: Some(error.code),
                ..Default::default()
            }),
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Attach the step position and trace id, keeping any error code.
    pub fn with_step(mut self, step_index: usize, trace_id: impl Into<String>) -> Self {
        let metadata = self.metadata.get_or_insert_with(Default::default);
        metadata.step_index = step_index;
        metadata.trace_id = Some(trace_id.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_code(&self) -> Option<ToolErrorCode> {
        self.metadata.as_ref().and_then(|m| m.error_code)
    }
}
