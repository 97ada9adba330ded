//! File operation tools: read_file, write_file, list_directory
//!
//! Every path argument is resolved against the run's working directory.
//! Traversal segments and absolute paths outside it are rejected before any
//! filesystem access.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use toolflow_application::ToolHandler;
use toolflow_domain::tool::path_guard::resolve_within;
use toolflow_domain::tool::{ExecutionContext, ParamType, ToolDefinition, ToolError, ToolParameter};
use tracing::debug;

use super::{io_error, optional_bool, optional_u64, require_str};

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIRECTORY: &str = "list_directory";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(READ_FILE, "Read the contents of a text file")
        .with_parameter(
            ToolParameter::new("path", "Path relative to the working directory", true)
                .with_type(ParamType::Path),
        )
        .with_parameter(
            ToolParameter::new("offset", "Line to start reading from (0-indexed)", false)
                .with_type(ParamType::Integer),
        )
        .with_parameter(
            ToolParameter::new("limit", "Maximum number of lines to read", false)
                .with_type(ParamType::Integer),
        )
}

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE,
        "Write content to a file, creating or overwriting it",
    )
    .with_parameter(
        ToolParameter::new("path", "Path relative to the working directory", true)
            .with_type(ParamType::Path),
    )
    .with_parameter(ToolParameter::new("content", "Content to write", true))
    .with_parameter(
        ToolParameter::new("create_dirs", "Create missing parent directories", false)
            .with_type(ParamType::Boolean)
            .with_default(false),
    )
}

pub fn list_directory_definition() -> ToolDefinition {
    ToolDefinition::new(LIST_DIRECTORY, "List the entries of a directory")
        .with_parameter(
            ToolParameter::new("path", "Directory relative to the working directory", false)
                .with_type(ParamType::Path)
                .with_default("."),
        )
}

fn resolve(ctx: &ExecutionContext, args: &Map<String, Value>) -> Result<PathBuf, ToolError> {
    resolve_within(ctx.working_directory(), require_str(args, "path")?)
}

/// read_file
pub struct ReadFile;

#[async_trait]
impl ToolHandler for ReadFile {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let path = resolve(ctx, args)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if !metadata.is_file() {
            return Err(ToolError::invalid_argument(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        if metadata.len() > MAX_READ_SIZE {
            return Err(ToolError::invalid_argument(format!(
                "File too large ({} bytes). Maximum size is {} bytes",
                metadata.len(),
                MAX_READ_SIZE
            )));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        let offset = optional_u64(args, "offset")?.unwrap_or(0) as usize;
        let limit = optional_u64(args, "limit")?.map(|l| l as usize);
        if offset == 0 && limit.is_none() {
            return Ok(Value::String(content));
        }

        let lines: Vec<&str> = content.lines().collect();
        let start = offset.min(lines.len());
        let end = limit.map_or(lines.len(), |l| start.saturating_add(l).min(lines.len()));
        Ok(Value::String(lines[start..end].join("\n")))
    }
}

/// write_file
pub struct WriteFile;

#[async_trait]
impl ToolHandler for WriteFile {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let path = resolve(ctx, args)?;
        let content = require_str(args, "content")?;

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            if optional_bool(args, "create_dirs")?.unwrap_or(false) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            } else {
                return Err(ToolError::not_found(format!(
                    "Parent directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote file");

        Ok(json!({
            "path": display_relative(ctx.working_directory(), &path),
            "bytes": content.len(),
        }))
    }
}

/// list_directory
pub struct ListDirectory;

#[async_trait]
impl ToolHandler for ListDirectory {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let path = match args.get("path") {
            Some(_) => resolve(ctx, args)?,
            None => ctx.working_directory().to_path_buf(),
        };

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| io_error(&path, e))? {
            let kind = match entry.file_type().await {
                Ok(t) if t.is_dir() => "directory",
                Ok(t) if t.is_symlink() => "symlink",
                Ok(_) => "file",
                Err(_) => "unknown",
            };
            entries.push((entry.file_name().to_string_lossy().into_owned(), kind));
        }
        entries.sort();

        Ok(Value::Array(
            entries
                .into_iter()
                .map(|(name, kind)| json!({ "name": name, "type": kind }))
                .collect(),
        ))
    }
}

fn display_relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
