//! Content transformation backends.
//!
//! The pipeline only knows the [`Transformer`] trait: a blocking call taking
//! system instructions and user content and returning unstructured text.
//! Each backend retries transient failures internally (see [`RetryPolicy`])
//! and only returns an error once its retry budget is exhausted.
//!
//! Backends:
//! * [`anthropic`]: Anthropic Messages API.
//! * [`openai`]: Any OpenAI-compatible chat completions server (LM Studio,
//!   Ollama, vLLM).

pub mod anthropic;
pub mod openai;

use std::thread;
use std::time::Duration;

use crate::config::{Config, LlmBackend};

pub use anthropic::AnthropicTransformer;
pub use openai::OpenAiTransformer;

/// Environment variable holding the Anthropic API key.
///
/// The key is never read from the config file.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// A blocking text-in, text-out transformation service.
pub trait Transformer {
    /// Run one transformation.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] after the backend's own retries are exhausted.
    fn complete(&self, system: &str, user: &str) -> Result<String, TransformError>;
}

impl<F> Transformer for F
where
    F: Fn(&str, &str) -> Result<String, TransformError>,
{
    fn complete(&self, system: &str, user: &str) -> Result<String, TransformError> {
        self(system, user)
    }
}

/// Errors returned by a transformation backend.
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    /// The backend is not usable with the given settings.
    #[error("Transformer configuration error: {0}")]
    Config(String),

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message reported by the server
        message: String,
    },

    /// The server answered but the body had no usable text.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl TransformError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500 | 503),
            Self::Config(_) | Self::MalformedResponse(_) | Self::Http(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransformError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connection(e.to_string())
        } else if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, TransformError>
    where
        F: FnMut() -> Result<T, TransformError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let wait = self.delay_for(attempt);
                    log::warn!(
                        "{}: {}. Retrying in {:?} (attempt {}/{})",
                        label,
                        e,
                        wait,
                        attempt + 1,
                        attempts
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build the transformer selected by the configuration.
///
/// # Errors
///
/// Returns [`TransformError::Config`] if required settings or credentials
/// are missing, or the HTTP client cannot be built.
pub fn create_transformer(config: &Config) -> Result<Box<dyn Transformer>, TransformError> {
    let timeout = Duration::from_secs(config.llm_timeout_secs);

    match config.llm_backend {
        LlmBackend::Anthropic => {
            let api_key = std::env::var(ANTHROPIC_API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    TransformError::Config(format!(
                        "{ANTHROPIC_API_KEY_ENV} environment variable not set"
                    ))
                })?;
            log::debug!("Using Anthropic backend with model {}", config.claude_model);
            Ok(Box::new(AnthropicTransformer::new(
                api_key,
                config.claude_model.clone(),
                timeout,
            )?))
        }
        LlmBackend::Local => {
            let base_url = config.local_base_url.clone().ok_or_else(|| {
                TransformError::Config(
                    "llm_backend is 'local' but local_base_url is not configured".to_string(),
                )
            })?;
            log::debug!(
                "Using local backend at {} with model {}",
                base_url,
                config.local_model
            );
            Ok(Box::new(OpenAiTransformer::new(
                base_url,
                config.local_model.clone(),
                timeout,
            )?))
        }
    }
}
