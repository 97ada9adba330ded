//! Planning prompt construction.

use crate::tool::ToolDefinition;
use serde_json::Value;

/// Builds the prompt that asks a model for a tool plan.
///
/// The prompt is the system instruction, then the serialized tool
/// descriptions, then the user's request.
pub struct PlanningPromptTemplate;

impl PlanningPromptTemplate {
    pub fn system_instruction() -> &'static str {
        r#"You are a planning component. Decide which tools, if any, are needed to satisfy the user's request.

Respond with a single JSON object and nothing else. It may be wrapped in a ```json fenced block.

Schema:
{
  "steps": [ { "tool": "<tool name>", "args": { "<parameter>": <value> } } ],
  "reasoning": "<short explanation>",
  "confidence": <number between 0 and 1>,
  "dependencies": [ "<label>" ],
  "estimatedTimeMs": <non-negative number>
}

Rules:
- Use only tools listed under "Available tools", with exactly the parameters they declare.
- Paths are relative to the working directory and must not contain "..".
- If no tool is needed or the request is unclear, return {"steps": []}.
- Never invent a tool."#
    }

    /// Serialized tool descriptions, one JSON document.
    pub fn tool_descriptions(tools: &[ToolDefinition]) -> String {
        let described: Vec<Value> = tools.iter().map(ToolDefinition::to_prompt_json).collect();
        serde_json::to_string_pretty(&described).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn build(tools: &[ToolDefinition], request: &str) -> String {
        format!(
            "{}\n\n## Available tools\n\n{}\n\n## Request\n\n{}\n",
            Self::system_instruction(),
            Self::tool_descriptions(tools),
            request.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParamType, ToolParameter};

    #[test]
    fn prompt_contains_tools_and_request_in_order() {
        let tools = vec![
            ToolDefinition::new("read_file", "Read a file").with_parameter(
                ToolParameter::new("path", "File path", true).with_type(ParamType::Path),
            ),
        ];
        let prompt = PlanningPromptTemplate::build(&tools, "  read the file notes.txt ");

        let tools_at = prompt.find("\"read_file\"").unwrap();
        let request_at = prompt.find("read the file notes.txt").unwrap();
        assert!(prompt.starts_with("You are a planning component"));
        assert!(tools_at < request_at);
        assert!(prompt.contains("\"path\""));
    }

    #[test]
    fn no_tools_still_builds() {
        let prompt = PlanningPromptTemplate::build(&[], "hello");
        assert!(prompt.contains("[]"));
    }
}
