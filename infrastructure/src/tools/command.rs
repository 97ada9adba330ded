//! Command execution tool: execute_command
//!
//! Runs a program with an argument vector. There is no shell: arguments are
//! passed to the program verbatim, so metacharacters are never interpreted.
//! The tool requires elevated auth and runs in the long-running class.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::process::Stdio;
use tokio::process::Command;
use toolflow_application::ToolHandler;
use toolflow_domain::tool::{
    ExecutionClass, ExecutionContext, ParamType, ToolDefinition, ToolError, ToolParameter,
};
use toolflow_domain::tool::path_guard::has_parent_traversal;
use toolflow_domain::util::truncate_str;
use tracing::debug;

use super::require_str;

pub const EXECUTE_COMMAND: &str = "execute_command";

/// Maximum captured size per stream (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

pub fn execute_command_definition() -> ToolDefinition {
    ToolDefinition::new(
        EXECUTE_COMMAND,
        "Run a program with arguments in the working directory. No shell is involved.",
    )
    .with_parameter(ToolParameter::new("program", "Program to run", true))
    .with_parameter(
        ToolParameter::new("args", "Arguments passed verbatim", false)
            .with_type(ParamType::Array)
            .with_default(Value::Array(Vec::new())),
    )
    .with_elevated_auth()
    .with_execution_class(ExecutionClass::LongRunning)
}

/// execute_command, optionally restricted to a set of program names.
#[derive(Debug, Default)]
pub struct ExecuteCommand {
    allowed_programs: Option<HashSet<String>>,
}

impl ExecuteCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_programs<I, S>(mut self, programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_programs = Some(programs.into_iter().map(Into::into).collect());
        self
    }

    fn permits(&self, program: &str) -> bool {
        self.allowed_programs
            .as_ref()
            .is_none_or(|allowed| allowed.contains(program))
    }
}

#[async_trait]
impl ToolHandler for ExecuteCommand {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let program = require_str(args, "program")?;
        if program.trim().is_empty() {
            return Err(ToolError::invalid_argument("program must not be empty"));
        }
        if has_parent_traversal(program) {
            return Err(ToolError::path_traversal(program));
        }
        if !self.permits(program) {
            return Err(ToolError::permission_denied(format!(
                "program '{}' is not in the allowed list",
                program
            )));
        }

        let argv = match args.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(ToolError::invalid_argument(
                        "args must contain only strings or numbers",
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ToolError::invalid_argument("args must be an array")),
        };

        debug!(program, args = ?argv, trace_id = %ctx.trace_id, "Spawning command");

        // kill_on_drop: a timed-out or cancelled step drops this future
        let output = Command::new(program)
            .args(&argv)
            .current_dir(ctx.working_directory())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::not_found(program),
                std::io::ErrorKind::PermissionDenied => ToolError::permission_denied(program),
                _ => ToolError::execution_failed(format!("Failed to spawn command: {}", e)),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Non-zero exit is reported, not treated as a tool failure
        Ok(json!({
            "exit_code": output.status.code(),
            "stdout": truncate_str(&stdout, MAX_OUTPUT_SIZE),
            "stderr": truncate_str(&stderr, MAX_OUTPUT_SIZE),
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use toolflow_domain::tool::{RateLimiter, ToolErrorCode};

    fn ctx(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(
            "trace",
            dir,
            Arc::new(RateLimiter::new(60, Duration::from_secs(60))),
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_definition_requires_elevated_auth() {
        let def = execute_command_definition();
        assert!(def.requires_elevated_auth);
        assert_eq!(def.execution_class, ExecutionClass::LongRunning);
    }

    #[tokio::test]
    async fn test_echo() {
        let dir = tempfile::tempdir().unwrap();
        let out = ExecuteCommand::new()
            .invoke(
                &args(json!({"program": "echo", "args": ["hello"]})),
                &ctx(dir.path()),
            )
            .await
            .unwrap();

        assert_eq!(out["exit_code"], 0);
        assert_eq!(out["stdout"], "hello\n");
    }

    #[tokio::test]
    async fn test_no_shell_interpolation() {
        let dir = tempfile::tempdir().unwrap();
        let out = ExecuteCommand::new()
            .invoke(
                &args(json!({"program": "echo", "args": ["$HOME; rm -rf /"]})),
                &ctx(dir.path()),
            )
            .await
            .unwrap();
        assert_eq!(out["stdout"], "$HOME; rm -rf /\n");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = ExecuteCommand::new()
            .invoke(&args(json!({"program": "pwd"})), &ctx(dir.path()))
            .await
            .unwrap();

        let name = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(out["stdout"].as_str().unwrap().contains(name));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = ExecuteCommand::new()
            .invoke(&args(json!({"program": "false"})), &ctx(dir.path()))
            .await
            .unwrap();
        assert_eq!(out["exit_code"], 1);
    }

    #[tokio::test]
    async fn test_program_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExecuteCommand::new()
            .invoke(
                &args(json!({"program": "definitely-not-a-real-program-xyz"})),
                &ctx(dir.path()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_program_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for program in ["../../bin/sh", "bin/../../sh", "..\\..\\cmd.exe"] {
            let err = ExecuteCommand::new()
                .invoke(&args(json!({"program": program})), &ctx(dir.path()))
                .await
                .unwrap_err();
            assert_eq!(err.code, ToolErrorCode::PathTraversal, "{program}");
        }
    }

    #[tokio::test]
    async fn test_allowed_programs() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExecuteCommand::new().with_allowed_programs(["echo"]);

        let err = tool
            .invoke(&args(json!({"program": "rm", "args": ["-rf", "x"]})), &ctx(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::PermissionDenied);

        assert!(
            tool.invoke(&args(json!({"program": "echo"})), &ctx(dir.path()))
                .await
                .is_ok()
        );
    }
}
