//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Execution class of a tool, selecting its timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionClass {
    /// Short interactive calls (file reads, lookups) - seconds
    #[default]
    Interactive,
    /// Shell / script execution - tens of seconds
    LongRunning,
}

impl ExecutionClass {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionClass::Interactive => "interactive",
            ExecutionClass::LongRunning => "long_running",
        }
    }
}

impl std::fmt::Display for ExecutionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of a tool parameter, checked at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// A filesystem path (a string, confined to the working directory)
    Path,
    /// Any JSON value
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Path => "path",
            ParamType::Any => "any",
        }
    }

    /// Whether `value` is acceptable for this parameter type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String | ParamType::Path => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Any => true,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Definition of a tool that a plan may reference.
///
/// The definition is the static, model-readable half of a registered tool.
/// The callable half (the handler) lives in the application layer registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "read_file")
    pub name: String,
    /// Human/model-readable description
    pub description: String,
    /// Parameter schema
    pub parameters: Vec<ToolParameter>,
    /// Whether an elevated-auth proof is required before invocation
    #[serde(default)]
    pub requires_elevated_auth: bool,
    /// Scopes this tool belongs to (empty = unscoped)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_scopes: Vec<String>,
    /// Timeout class
    #[serde(default)]
    pub execution_class: ExecutionClass,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Value used when the argument is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            requires_elevated_auth: false,
            allowed_scopes: Vec::new(),
            execution_class: ExecutionClass::Interactive,
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_elevated_auth(mut self) -> Self {
        self.requires_elevated_auth = true;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.allowed_scopes.push(scope.into());
        self
    }

    pub fn with_execution_class(mut self, class: ExecutionClass) -> Self {
        self.execution_class = class;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters of type [`ParamType::Path`].
    pub fn path_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters
            .iter()
            .filter(|p| p.param_type == ParamType::Path)
    }

    /// JSON description used in planning prompts.
    pub fn to_prompt_json(&self) -> Value {
        let mut params = serde_json::Map::new();
        for p in &self.parameters {
            let mut entry = serde_json::Map::new();
            entry.insert("type".into(), Value::String(p.param_type.as_str().into()));
            entry.insert("required".into(), Value::Bool(p.required));
            if !p.description.is_empty() {
                entry.insert("description".into(), Value::String(p.description.clone()));
            }
            if let Some(default) = &p.default {
                entry.insert("default".into(), default.clone());
            }
            params.insert(p.name.clone(), Value::Object(entry));
        }
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": params,
        })
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParamType::String,
            default: None,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Catalog of tool definitions keyed by name.
///
/// Registering a name that already exists replaces the previous definition.
/// Iteration is ordered by name so prompts are stable between runs.
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Insert or replace a definition. Returns the replaced one, if any.
    pub fn insert(&mut self, tool: ToolDefinition) -> Option<ToolDefinition> {
        self.tools.insert(tool.name.clone(), tool)
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.insert(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
