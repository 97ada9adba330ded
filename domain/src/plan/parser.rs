//! Fail-closed plan parsing from model output.
//!
//! Model text is untrusted. [`parse_plan`] either returns a fully validated
//! [`ToolPlan`] or `None`; it never returns a partially populated plan and
//! never panics, whatever the input.
//!
//! Extraction order:
//! 1. the whole response as JSON
//! 2. the first ` ```json ` (or untagged) fenced block
//! 3. the first balanced `{ ... }` span
//!
//! A candidate that fails a strict parse gets exactly one [repair](super::repair)
//! pass before it is discarded.

use serde_json::{Map, Value};

use super::entities::{
    DEFAULT_CONFIDENCE, DEFAULT_ESTIMATED_TIME_MS, DEFAULT_REASONING, PlanStep, ToolPlan,
};
use super::repair::repair_json;

/// Reduce a tool name to `[A-Za-z0-9_-]` by deleting everything else.
///
/// Idempotent: `sanitize_tool_name(sanitize_tool_name(x)) == sanitize_tool_name(x)`.
pub fn sanitize_tool_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Parse model text into a validated plan.
pub fn parse_plan(text: &str) -> Option<ToolPlan> {
    let value = extract_plan_value(text)?;
    validate_plan_value(&value)
}

/// Locate the plan JSON inside free-form text.
fn extract_plan_value(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let candidate = extract_fenced_block(text).or_else(|| extract_balanced_object(text))?;
    parse_with_repair(&candidate)
}

fn parse_with_repair(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .or_else(|_| serde_json::from_str::<Value>(&repair_json(candidate)))
        .ok()
}

/// Content of the first fenced block tagged `json` or left untagged.
fn extract_fenced_block(text: &str) -> Option<String> {
    let mut in_block = false;
    let mut block = String::new();

    for line in text.lines() {
        let line_trimmed = line.trim();
        if !in_block {
            if let Some(tag) = line_trimmed.strip_prefix("```") {
                let tag = tag.trim();
                if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
                    in_block = true;
                    block.clear();
                }
            }
        } else if line_trimmed == "```" {
            if !block.trim().is_empty() {
                return Some(block);
            }
            in_block = false;
        } else {
            block.push_str(line);
            block.push('\n');
        }
    }

    None
}

/// First `{ ... }` span whose braces balance, ignoring braces inside strings.
///
/// Single pass: opening offsets are stacked and the earliest opening brace
/// that gets closed wins. Unclosed braces are skipped over.
fn extract_balanced_object(text: &str) -> Option<String> {
    let first = text.find('{')?;
    let mut open: Vec<usize> = Vec::new();
    let mut span: Option<(usize, usize)> = None;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(first) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => open.push(i),
            b'}' => {
                let Some(start) = open.pop() else {
                    continue;
                };
                if span.is_none_or(|(earliest, _)| start < earliest) {
                    span = Some((start, i));
                }
                if open.is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    span.map(|(start, end)| text[start..=end].to_string())
}

/// Structural validation. Any violation rejects the whole plan.
fn validate_plan_value(value: &Value) -> Option<ToolPlan> {
    let obj = value.as_object()?;

    let steps = obj
        .get("steps")?
        .as_array()?
        .iter()
        .map(parse_step)
        .collect::<Option<Vec<_>>>()?;

    let reasoning = match obj.get("reasoning") {
        None => DEFAULT_REASONING.to_string(),
        Some(v) => v.as_str()?.to_string(),
    };

    let confidence = match obj.get("confidence") {
        None => DEFAULT_CONFIDENCE,
        Some(v) => {
            let c = v.as_f64()?;
            if !(0.0..=1.0).contains(&c) {
                return None;
            }
            c
        }
    };

    let dependencies = match obj.get("dependencies") {
        None => Vec::new(),
        Some(v) => v
            .as_array()?
            .iter()
            .map(|d| d.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?,
    };

    let estimated_time_ms = match obj.get("estimatedTimeMs") {
        None => DEFAULT_ESTIMATED_TIME_MS,
        Some(v) => {
            let ms = v.as_f64()?;
            if ms < 0.0 {
                return None;
            }
            ms
        }
    };

    Some(ToolPlan::from_parts(
        steps,
        reasoning,
        confidence,
        dependencies,
        estimated_time_ms,
    ))
}

fn parse_step(value: &Value) -> Option<PlanStep> {
    let step: &Map<String, Value> = value.as_object()?;
    let tool = step.get("tool")?.as_str()?;
    let args = step
        .get("args")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    Some(PlanStep::new(tool, args))
}
