//! OpenAI-compatible chat completions backend for locally hosted models.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{RetryPolicy, TransformError, Transformer};

const DEFAULT_TEMPERATURE: f32 = 0.7;

// Local servers ignore the key but some reject a missing header.
const PLACEHOLDER_API_KEY: &str = "not-needed";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Transformer backed by an OpenAI-compatible server.
pub struct OpenAiTransformer {
    client: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiTransformer {
    /// Create a client for `base_url` (for example `http://localhost:1234/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Config`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransformError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransformError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Full URL of the chat completions endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn send_once(&self, system: &str, user: &str) -> Result<String, TransformError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(PLACEHOLDER_API_KEY)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(TransformError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_response(&body)
    }
}

impl Transformer for OpenAiTransformer {
    fn complete(&self, system: &str, user: &str) -> Result<String, TransformError> {
        self.retry
            .run("Local LLM request failed", || self.send_once(system, user))
    }
}

fn parse_response(body: &str) -> Result<String, TransformError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| TransformError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            TransformError::MalformedResponse("response contained no choices".to_string())
        })
}
