//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod route_completion;
pub mod run_plan;
pub mod submit_request;
