//! Prompt domain
//!
//! Templates for the prompts the pipeline sends to model backends.

pub mod planning;

pub use planning::PlanningPromptTemplate;
