//! Application-level configuration.
//!
//! Parameter structs that control how the use cases behave:
//!
//! - [`ExecutorParams`]: rate limits, handler timeouts, stop-on-failure
//! - [`RouterParams`]: circuit breaker and retry policy
//! - [`PipelineParams`]: admission bounds, aggregation mode, retention

pub mod executor_params;
pub mod pipeline_params;
pub mod router_params;

pub use executor_params::ExecutorParams;
pub use pipeline_params::PipelineParams;
pub use router_params::RouterParams;
