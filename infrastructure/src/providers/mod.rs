//! Model backends and router construction.

pub mod fixed;
pub mod openai;
pub mod routing;

pub use fixed::FixedResponseBackend;
pub use openai::OpenAiCompatibleBackend;
pub use routing::{ProviderBuildError, build_backend, build_router};
