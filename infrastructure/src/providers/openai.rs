//! OpenAI-compatible chat-completions backend.
//!
//! Works with any server exposing `POST {endpoint}/chat/completions`
//! (OpenAI, Ollama, vLLM, llama.cpp). HTTP failures are mapped onto
//! [`BackendError`] so the router can decide what to retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolflow_application::{BackendError, ModelBackend};
use toolflow_domain::router::{Completion, CompletionOptions, CostRates};
use toolflow_domain::util::preview;
use tracing::debug;

/// TCP connection timeout. The overall call deadline is enforced by the router.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest error-body excerpt carried in a [`BackendError`]
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

pub struct OpenAiCompatibleBackend {
    name: String,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    rates: CostRates,
    http: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            rates: CostRates::free(),
            http,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_rates(mut self, rates: CostRates) -> Self {
        self.rates = rates;
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

/// Map a non-success HTTP status (and its body) onto a backend error.
fn status_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    let message = preview(body.trim(), MAX_ERROR_BODY);
    match status.as_u16() {
        401 | 403 => BackendError::Unauthorized(message),
        code => BackendError::Http {
            status: code,
            message,
        },
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Connection(err.to_string())
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_rates(&self) -> CostRates {
        self.rates
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, BackendError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let mut request = self.http.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(backend = %self.name, model = %self.model, "Sending chat completion");
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("response has no choices".into()))?;

        let mut completion = Completion::text(choice.message.content.unwrap_or_default());
        if let Some(usage) = parsed.usage {
            completion.tokens_in = usage.prompt_tokens;
            completion.tokens_out = usage.completion_tokens;
        }
        if let Some(reason) = choice.finish_reason {
            completion = completion.with_finish_reason(reason);
        }
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OpenAiCompatibleBackend {
        OpenAiCompatibleBackend::new("primary", format!("{}/v1/", server.uri()), "test-model")
            .unwrap()
    }

    #[tokio::test]
    async fn test_parses_completion_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({"model": "test-model", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "{\"steps\": []}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = backend(&server)
            .with_api_key("sk-test")
            .complete("plan this", &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.content, "{\"steps\": []}");
        assert_eq!(completion.tokens_in, Some(12));
        assert_eq!(completion.tokens_out, Some(4));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_missing_usage_is_left_for_estimation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "hi"}}]
            })))
            .mount(&server)
            .await;

        let completion = backend(&server)
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(completion.tokens_in, None);
        assert_eq!(completion.tokens_out, None);
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = backend(&server)
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        let backend =
            OpenAiCompatibleBackend::new("dead", "http://127.0.0.1:9", "m").unwrap();
        let err = backend
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
