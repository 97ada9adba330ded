//! Tool plans and the fail-closed parser that produces them.

pub mod entities;
pub mod parser;
pub mod repair;

pub use entities::{PlanStep, ToolPlan, empty_plan};
pub use parser::{parse_plan, sanitize_tool_name};
