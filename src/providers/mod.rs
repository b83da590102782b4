/*!
 * Model transport.
 *
 * - `openai`: any OpenAI-compatible `/chat/completions` endpoint
 * - `mock`: scripted provider for tests and dry runs
 *
 * The translation engine sees a provider only through the `Provider`
 * trait: one prompt in, raw model text out. Transport-level retries are
 * the provider's own business.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Raw model output plus whatever token accounting the endpoint reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// The text of the first choice
    pub text: String,
    /// Prompt tokens, when reported
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when reported
    pub completion_tokens: Option<u64>,
}

impl Completion {
    /// Completion without token accounting
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Common trait for model transports
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send one prompt and return the model's raw answer
    ///
    /// # Returns
    /// * `Result<Completion, ProviderError>` - The answer, or a fatal transport error
    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError>;

    /// Check that the endpoint is reachable and accepts the credential
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short name used in logs and usage summaries
    fn name(&self) -> &str;

    /// Model identifier used in logs and usage summaries
    fn model(&self) -> &str;
}

pub mod mock;
pub mod openai;
