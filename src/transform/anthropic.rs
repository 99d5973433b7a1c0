//! Anthropic Messages API backend.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{RetryPolicy, TransformError, Transformer};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Response token ceiling for a single call.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Transformer backed by Claude.
pub struct AnthropicTransformer {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl AnthropicTransformer {
    /// Create a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Config`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransformError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransformError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: ANTHROPIC_API_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            retry: RetryPolicy::default(),
        })
    }

    /// Point the client at a different Messages endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Model identifier sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn send_once(&self, system: &str, user: &str) -> Result<String, TransformError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(TransformError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_response(&body)
    }
}

impl Transformer for AnthropicTransformer {
    fn complete(&self, system: &str, user: &str) -> Result<String, TransformError> {
        self.retry
            .run("Anthropic request failed", || self.send_once(system, user))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Concatenate every text block of a Messages API response.
fn parse_response(body: &str) -> Result<String, TransformError> {
    let parsed: ApiResponse = serde_json::from_str(body)
        .map_err(|e| TransformError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(TransformError::MalformedResponse(
            "response contained no text".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}
