use std::time::Duration;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::providers::{Completion, Provider};

/// Client for an OpenAI-compatible chat completion endpoint
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `http://localhost:1234/v1`
    base_url: String,
    /// Credential, sent as a bearer token when non-empty
    api_key: String,
    /// Model identifier
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Request timeout, reported in timeout errors
    timeout_secs: u64,
    /// Retries for rate limits and server errors
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    pub model: String,

    /// The messages for the conversation
    pub messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message; some servers send `null` for empty answers
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Generated choices, the first one is used
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// A single choice of a completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl OpenAIRequest {
    /// Create a new request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: Some(content.into()),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl OpenAI {
    /// Create a client with default tuning
    pub fn new(base_url: &Url, api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let defaults = crate::app_config::TranslationConfig::default();
        Self::with_settings(
            base_url,
            api_key,
            model,
            defaults.temperature,
            defaults.timeout_secs,
            defaults.retry_count,
            defaults.retry_backoff_ms,
        )
    }

    /// Create a client from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let base_url = config
            .endpoint_url()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Self::with_settings(
            &base_url,
            config.api_key.clone(),
            config.model.clone(),
            config.translation.temperature,
            config.translation.timeout_secs,
            config.translation.retry_count,
            config.translation.retry_backoff_ms,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn with_settings(
        base_url: &Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            timeout_secs,
            max_retries,
            backoff_base_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    fn map_send_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            ProviderError::ConnectionError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }

    /// Turn a non-success status into the matching error
    async fn status_error(&self, response: Response) -> ProviderError {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
            StatusCode::NOT_FOUND => ProviderError::ModelNotFound(format!("{} ({})", self.model, message)),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            },
        }
    }

    /// One HTTP round trip, no retries
    async fn send_once(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let builder = self.client.post(self.url("chat/completions")).json(request);
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        response.json::<OpenAIResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::ParseError(e.to_string())
            }
        })
    }

    /// Send a request, retrying rate limits and server errors with exponential backoff
    pub async fn send(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms = Self::backoff_ms(self.backoff_base_ms, attempt);
                    warn!(
                        "Endpoint error: {} - retrying in {} ms (retry {}/{})",
                        e, backoff_ms, attempt, self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                other => return other,
            }
        }
    }

    /// Delay before retry number `retry` (1-based): the base doubled per retry, saturating
    pub fn backoff_ms(base_ms: u64, retry: u32) -> u64 {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        base_ms.saturating_mul(factor)
    }

    /// Extract the text of the first choice
    pub fn extract_text(response: &OpenAIResponse) -> Result<String, ProviderError> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))?;
        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let request = OpenAIRequest::new(&self.model)
            .add_message("user", prompt)
            .temperature(self.temperature);

        debug!("POST {} ({} prompt chars)", self.url("chat/completions"), prompt.len());
        let response = self.send(&request).await?;
        let text = Self::extract_text(&response)?;

        Ok(Completion {
            text,
            prompt_tokens: response.usage.map(|u| u.prompt_tokens),
            completion_tokens: response.usage.map(|u| u.completion_tokens),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let builder = self.client.get(self.url("models"));
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Not every compatible server lists its models
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            _ => Err(self.status_error(response).await),
        }
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
