//! Model routing domain: breaker state machine, completion values, cost and
//! metrics. The router itself lives in the application layer.

pub mod circuit_breaker;
pub mod completion;
pub mod cost;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitState, Rejection, Transition};
pub use completion::{Completion, CompletionOptions, RoutedCompletion};
pub use cost::{CostRates, estimate_tokens};
pub use metrics::RouterMetrics;
