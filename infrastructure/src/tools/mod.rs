//! Built-in tool handlers
//!
//! Concrete [`ToolHandler`](toolflow_application::ToolHandler)s for the local
//! file system, program execution and (with `web-tools`) HTTP fetches.
//!
//! | Tool | Class | Elevated auth |
//! |------|-------|---------------|
//! | `read_file` | interactive | no |
//! | `write_file` | interactive | no |
//! | `list_directory` | interactive | no |
//! | `execute_command` | long-running | yes |
//! | `fetch_url` | interactive | no |

pub mod command;
pub mod file;
#[cfg(feature = "web-tools")]
pub mod web;

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use toolflow_application::ToolRegistry;
use toolflow_domain::DomainError;
use toolflow_domain::tool::ToolError;

pub use command::{EXECUTE_COMMAND, ExecuteCommand};
pub use file::{LIST_DIRECTORY, ListDirectory, READ_FILE, ReadFile, WRITE_FILE, WriteFile};

/// Which built-in tools to register.
#[derive(Debug, Clone)]
pub struct BuiltinTools {
    pub commands: bool,
    /// Restrict `execute_command` to these programs; `None` allows any
    pub allowed_programs: Option<Vec<String>>,
    pub web: bool,
    pub fetch_max_bytes: Option<usize>,
}

impl Default for BuiltinTools {
    fn default() -> Self {
        Self {
            commands: true,
            allowed_programs: None,
            web: true,
            fetch_max_bytes: None,
        }
    }
}

/// Register the built-in tools into `registry`.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    tools: &BuiltinTools,
) -> Result<(), DomainError> {
    registry.register(file::read_file_definition(), Arc::new(ReadFile))?;
    registry.register(file::write_file_definition(), Arc::new(WriteFile))?;
    registry.register(file::list_directory_definition(), Arc::new(ListDirectory))?;

    if tools.commands {
        let mut handler = ExecuteCommand::new();
        if let Some(programs) = &tools.allowed_programs {
            handler = handler.with_allowed_programs(programs.iter().cloned());
        }
        registry.register(command::execute_command_definition(), Arc::new(handler))?;
    }

    if tools.web {
        register_web_tools(registry, tools)?;
    }

    Ok(())
}

#[cfg(feature = "web-tools")]
fn register_web_tools(registry: &mut ToolRegistry, tools: &BuiltinTools) -> Result<(), DomainError> {
    let mut handler =
        web::FetchUrl::new().map_err(|e| DomainError::InvalidToolDefinition(e.message))?;
    if let Some(max) = tools.fetch_max_bytes {
        handler = handler.with_max_body_size(max);
    }
    registry.register(web::fetch_url_definition(), Arc::new(handler))?;
    Ok(())
}

#[cfg(not(feature = "web-tools"))]
fn register_web_tools(_registry: &mut ToolRegistry, _tools: &BuiltinTools) -> Result<(), DomainError> {
    tracing::debug!("web-tools feature disabled; fetch_url not registered");
    Ok(())
}

/// A registry with the built-in tools.
pub fn builtin_registry(tools: &BuiltinTools) -> Result<ToolRegistry, DomainError> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, tools)?;
    Ok(registry)
}

// ==================== Argument helpers ====================

pub(crate) fn require_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid_argument(format!("Missing required string argument: {}", name)))
}

pub(crate) fn optional_u64(args: &Map<String, Value>, name: &str) -> Result<Option<u64>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| ToolError::invalid_argument(format!("{} must be a non-negative integer", name))),
    }
}

pub(crate) fn optional_bool(args: &Map<String, Value>, name: &str) -> Result<Option<bool>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| ToolError::invalid_argument(format!("{} must be a boolean", name))),
    }
}

pub(crate) fn io_error(path: &Path, err: std::io::Error) -> ToolError {
    match err.kind() {
        std::io::ErrorKind::NotFound => ToolError::not_found(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            ToolError::permission_denied(path.display().to_string())
        }
        _ => ToolError::execution_failed(format!("{}: {}", path.display(), err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolflow_domain::tool::ToolErrorCode;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = builtin_registry(&BuiltinTools::default()).unwrap();
        assert!(registry.contains(READ_FILE));
        assert!(registry.contains(WRITE_FILE));
        assert!(registry.contains(LIST_DIRECTORY));
        assert!(registry.contains(EXECUTE_COMMAND));
        #[cfg(feature = "web-tools")]
        assert!(registry.contains(web::FETCH_URL));

        let (def, _) = registry.get(EXECUTE_COMMAND).unwrap();
        assert!(def.requires_elevated_auth);
    }

    #[test]
    fn test_commands_can_be_disabled() {
        let registry = builtin_registry(&BuiltinTools {
            commands: false,
            web: false,
            ..Default::default()
        })
        .unwrap();
        assert!(!registry.contains(EXECUTE_COMMAND));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({"s": "x", "n": 3, "b": true, "neg": -1})
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(require_str(&args, "s").unwrap(), "x");
        assert_eq!(
            require_str(&args, "n").unwrap_err().code,
            ToolErrorCode::InvalidArgument
        );
        assert_eq!(optional_u64(&args, "n").unwrap(), Some(3));
        assert_eq!(optional_u64(&args, "missing").unwrap(), None);
        assert!(optional_u64(&args, "neg").is_err());
        assert_eq!(optional_bool(&args, "b").unwrap(), Some(true));
    }
}
