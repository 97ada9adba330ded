//! Tool registry.
//!
//! Owns every [`ToolDefinition`] together with its handler. Registration
//! happens once at startup; afterwards the registry is shared read-only
//! behind an `Arc`, so lookups need no locking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use toolflow_domain::DomainError;
use toolflow_domain::plan::sanitize_tool_name;
use toolflow_domain::tool::{ToolDefinition, ToolSpec};
use tracing::debug;

use crate::ports::tool_handler::ToolHandler;

#[derive(Default)]
pub struct ToolRegistry {
    spec: ToolSpec,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any previous tool of the same name.
    ///
    /// Returns the replaced definition. Names must already be in sanitized
    /// form, otherwise no plan step could ever reach the tool.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Option<ToolDefinition>, DomainError> {
        validate_definition(&definition)?;

        let name = definition.name.clone();
        let replaced = self.spec.insert(definition);
        self.handlers.insert(name.clone(), handler);

        if replaced.is_some() {
            debug!(tool = %name, "Tool re-registered, previous definition replaced");
        } else {
            debug!(tool = %name, "Tool registered");
        }
        Ok(replaced)
    }

    /// Builder-style registration.
    pub fn with_tool(
        mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, DomainError> {
        self.register(definition, handler)?;
        Ok(self)
    }

    /// All definitions, ordered by name.
    pub fn describe(&self) -> Vec<ToolDefinition> {
        self.spec.all().cloned().collect()
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn get(&self, name: &str) -> Option<(&ToolDefinition, &Arc<dyn ToolHandler>)> {
        let definition = self.spec.get(name)?;
        let handler = self.handlers.get(name)?;
        Some((definition, handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.spec.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.spec.names().collect()
    }

    pub fn len(&self) -> usize {
        self.spec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spec.is_empty()
    }
}

fn validate_definition(definition: &ToolDefinition) -> Result<(), DomainError> {
    let name = &definition.name;
    if name.is_empty() {
        return Err(DomainError::InvalidToolDefinition(
            "tool name must not be empty".to_string(),
        ));
    }
    if sanitize_tool_name(name) != *name {
        return Err(DomainError::InvalidToolDefinition(format!(
            "tool name '{name}' may only contain [A-Za-z0-9_-]"
        )));
    }

    let mut seen = HashSet::new();
    for param in &definition.parameters {
        if !seen.insert(param.name.as_str()) {
            return Err(DomainError::InvalidToolDefinition(format!(
                "tool '{name}' declares parameter '{}' twice",
                param.name
            )));
        }
    }
    Ok(())
}
