/*!
 * Mock provider for tests.
 *
 * - `MockProvider::echo()` answers every prompt with a well-formed answer
 *   that marks each input text as translated
 * - `MockProvider::malformed()` always answers with text the parser rejects
 * - `MockProvider::failing()` always fails with a transport error
 *
 * Scripted replies queued with `with_replies` are served first, in order.
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Completion, Provider};

// Input elements carry timing attributes, the answer template does not
static INPUT_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<text id="(\d+)" start="[^"]*" end="[^"]*">(.*?)</text>"#)
        .expect("input text regex is valid")
});

/// Prefix the echo mode puts in front of every source text
pub const ECHO_PREFIX: &str = "[translated] ";

/// What the mock does once the scripted replies run out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Well-formed answer for every id in the prompt
    Echo,
    /// Prose with no answer element
    Malformed,
    /// Connection failure
    Failing,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior after the script is exhausted
    behavior: MockBehavior,
    /// Replies served before falling back to `behavior`
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Every prompt received, in order
    prompts: Arc<Mutex<Vec<String>>>,
    /// Request counter
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Queue replies to serve before the fallback behavior kicks in
    pub fn with_replies<I>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        self.script.lock().extend(replies);
        self
    }

    /// Number of `complete` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Build a well-formed answer for every input element of `prompt`
    pub fn echo_answer(prompt: &str) -> String {
        let mut answer = String::from("Reasoning: the lines are short.\n<answer>\n");
        for caps in INPUT_TEXT_REGEX.captures_iter(prompt) {
            answer.push_str(&format!("<text id=\"{}\">{}{}</text>\n", &caps[1], ECHO_PREFIX, &caps[2]));
        }
        answer.push_str("</answer>");
        answer
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        let scripted = self.script.lock().pop_front();
        let text = match scripted {
            Some(reply) => reply?,
            None => match self.behavior {
                MockBehavior::Echo => Self::echo_answer(prompt),
                MockBehavior::Malformed => "Sorry, I can only answer in prose.".to_string(),
                MockBehavior::Failing => {
                    return Err(ProviderError::ConnectionError("Simulated connection refused".to_string()));
                }
            },
        };

        Ok(Completion {
            prompt_tokens: Some((prompt.len() / 4) as u64),
            completion_tokens: Some((text.len() / 4) as u64),
            text,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection refused".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
