//! Backend that always answers with a configured response.
//!
//! Used for offline runs (`kind = "fixed"`) and as a deterministic planner
//! in tests.

use async_trait::async_trait;
use toolflow_application::{BackendError, ModelBackend};
use toolflow_domain::router::{Completion, CompletionOptions};

pub struct FixedResponseBackend {
    name: String,
    response: String,
}

impl FixedResponseBackend {
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: response.into(),
        }
    }
}

#[async_trait]
impl ModelBackend for FixedResponseBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<Completion, BackendError> {
        Ok(Completion::text(self.response.clone()).with_finish_reason("stop"))
    }
}
