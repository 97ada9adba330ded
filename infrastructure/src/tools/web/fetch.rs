//! fetch_url tool: GET a URL and return its body as text

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value, json};
use std::time::Duration;
use toolflow_application::ToolHandler;
use toolflow_domain::tool::{ExecutionContext, ToolDefinition, ToolError, ToolParameter};
use tracing::debug;

use crate::tools::require_str;

pub const FETCH_URL: &str = "fetch_url";

/// Maximum response body size (5 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

const USER_AGENT: &str = concat!("toolflow/", env!("CARGO_PKG_VERSION"));

pub fn fetch_url_definition() -> ToolDefinition {
    ToolDefinition::new(FETCH_URL, "Fetch an http(s) URL and return the response body")
        .with_parameter(ToolParameter::new("url", "The URL to fetch", true))
}

pub struct FetchUrl {
    client: reqwest::Client,
    max_body_size: usize,
}

impl FetchUrl {
    pub fn new() -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ToolError::execution_failed(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        })
    }

    pub fn with_max_body_size(mut self, max: usize) -> Self {
        self.max_body_size = max;
        self
    }

    fn too_large(&self, size: u64) -> ToolError {
        ToolError::execution_failed(format!(
            "Response too large: {} bytes (max: {} bytes)",
            size, self.max_body_size
        ))
    }
}

/// Parse `raw` and accept only http and https URLs.
fn parse_url(raw: &str) -> Result<Url, ToolError> {
    let url = Url::parse(raw)
        .map_err(|e| ToolError::invalid_argument(format!("Invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::invalid_argument(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

#[async_trait]
impl ToolHandler for FetchUrl {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let url = parse_url(require_str(args, "url")?)?;
        debug!(url = %url, trace_id = %ctx.trace_id, "Fetching URL");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ToolError::execution_failed(format!("Failed to fetch URL: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution_failed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(len) = response.content_length()
            && len > self.max_body_size as u64
        {
            return Err(self.too_large(len));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Content-Length may be absent or wrong; enforce the cap while streaming
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ToolError::execution_failed(format!("Failed to read response body: {}", e)))?
        {
            if body.len() + chunk.len() > self.max_body_size {
                return Err(self.too_large((body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(json!({
            "url": url.as_str(),
            "status": status.as_u16(),
            "content_type": content_type,
            "body": String::from_utf8_lossy(&body),
        }))
    }
}
