//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_sink;
pub mod elevated_auth;
pub mod events;
pub mod model_backend;
pub mod tool_handler;
