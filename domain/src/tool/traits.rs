//! Tool domain traits
//!
//! Contains pure domain logic traits for argument validation.
//! The async handler contract is defined in the application layer (ports).

use super::entities::ToolDefinition;
use serde_json::{Map, Value};

/// Validator for plan-step arguments
///
/// Validates raw step arguments against a tool's parameter schema without
/// any I/O, returning the normalized argument map the handler will receive.
pub trait ToolValidator {
    /// Validate `args` against `definition`, filling in declared defaults.
    fn validate(&self, args: &Value, definition: &ToolDefinition)
    -> Result<Map<String, Value>, String>;
}

/// Default implementation of ToolValidator
///
/// - `args` must be a JSON object (`null` is treated as `{}`)
/// - required parameters must be present and non-null
/// - provided values must match the declared [`ParamType`](super::entities::ParamType)
/// - keys not declared in the schema are rejected
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        args: &Value,
        definition: &ToolDefinition,
    ) -> Result<Map<String, Value>, String> {
        let mut normalized = match args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(format!(
                    "Arguments for tool '{}' must be an object, got {}",
                    definition.name,
                    json_type_name(other)
                ));
            }
        };

        for arg_name in normalized.keys() {
            if definition.parameter(arg_name).is_none() {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            }
        }

        for param in &definition.parameters {
            match normalized.get(&param.name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &param.default {
                        normalized.insert(param.name.clone(), default.clone());
                    } else if param.required {
                        return Err(format!(
                            "Missing required parameter '{}' for tool '{}'",
                            param.name, definition.name
                        ));
                    } else {
                        normalized.remove(&param.name);
                    }
                }
                Some(value) => {
                    if !param.param_type.accepts(value) {
                        return Err(format!(
                            "Parameter '{}' for tool '{}' must be of type {}, got {}",
                            param.name,
                            definition.name,
                            param.param_type,
                            json_type_name(value)
                        ));
                    }
                }
            }
        }

        Ok(normalized)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ParamType, ToolParameter};
    use serde_json::json;

    fn definition() -> ToolDefinition {
        ToolDefinition::new("read_file", "Read a file")
            .with_parameter(ToolParameter::new("path", "Path", true).with_type(ParamType::Path))
            .with_parameter(
                ToolParameter::new("limit", "Max lines", false)
                    .with_type(ParamType::Integer)
                    .with_default(100),
            )
            .with_parameter(
                ToolParameter::new("encoding", "Encoding", false).with_type(ParamType::String),
            )
    }

    #[test]
    fn test_validator_missing_required() {
        let result = DefaultToolValidator.validate(&json!({}), &definition());
        assert!(result.unwrap_err().contains("Missing required parameter 'path'"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let result =
            DefaultToolValidator.validate(&json!({"path": "a", "mode": "x"}), &definition());
        assert!(result.unwrap_err().contains("Unknown parameter 'mode'"));
    }

    #[test]
    fn test_validator_wrong_type() {
        let result = DefaultToolValidator.validate(&json!({"path": 42}), &definition());
        assert!(result.unwrap_err().contains("must be of type path"));
    }

    #[test]
    fn test_validator_applies_defaults() {
        let args = DefaultToolValidator
            .validate(&json!({"path": "notes.txt"}), &definition())
            .unwrap();
        assert_eq!(args["path"], "notes.txt");
        assert_eq!(args["limit"], 100);
        assert!(!args.contains_key("encoding"));
    }

    #[test]
    fn test_validator_rejects_non_object_args() {
        let result = DefaultToolValidator.validate(&json!(["notes.txt"]), &definition());
        assert!(result.unwrap_err().contains("must be an object, got array"));
    }

    #[test]
    fn test_validator_null_args_is_empty_object() {
        let no_params = ToolDefinition::new("ping", "Ping");
        let args = DefaultToolValidator.validate(&Value::Null, &no_params).unwrap();
        assert!(args.is_empty());
    }
}
