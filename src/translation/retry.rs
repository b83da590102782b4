/*!
 * Per-window retry loop.
 *
 * Each window runs a small state machine:
 *
 * ```text
 * Attempting(1) --parse ok--> Succeeded
 * Attempting(n) --parse failed, n < max--> Attempting(n+1) with feedback
 * Attempting(max) --parse failed--> FallenBack (source text kept)
 * ```
 *
 * Only parse failures are retried here. Transport errors leave the loop
 * immediately and end the run.
 */

use log::{debug, warn};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::subtitle_processor::SubtitleEntry;
use crate::translation::parser::{self, ParseFailure, Translations};
use crate::translation::prompts;
use crate::translation::usage::TokenUsageStats;

/// Request/parse cycles per window
pub const MAX_ATTEMPTS: u32 = 3;

/// State of one window's retry loop
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    /// About to send attempt `attempt`, with feedback from the previous one
    Attempting { attempt: u32, feedback: Option<ParseFailure> },
    /// A parseable answer arrived on attempt `attempt`
    Succeeded { attempt: u32, translations: Translations },
    /// Every attempt failed to parse
    FallenBack { attempts: u32, last_failure: ParseFailure },
}

impl AttemptState {
    pub fn initial() -> Self {
        Self::Attempting { attempt: 1, feedback: None }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting { .. })
    }

    /// Apply the parse result of the current attempt. Terminal states stay put.
    pub fn advance(self, parsed: Result<Translations, ParseFailure>, max_attempts: u32) -> Self {
        let Self::Attempting { attempt, .. } = self else {
            return self;
        };

        match parsed {
            Ok(translations) => Self::Succeeded { attempt, translations },
            Err(failure) if attempt < max_attempts => Self::Attempting {
                attempt: attempt + 1,
                feedback: Some(failure),
            },
            Err(failure) => Self::FallenBack {
                attempts: attempt,
                last_failure: failure,
            },
        }
    }
}

/// How a window ended
#[derive(Debug, Clone, PartialEq)]
pub enum WindowStatus {
    Succeeded { attempts: u32 },
    FallenBack { attempts: u32, last_failure: ParseFailure },
}

impl WindowStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallenBack { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts } | Self::FallenBack { attempts, .. } => *attempts,
        }
    }
}

/// Result of a window: one text per entry, in window order
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    pub texts: Vec<String>,
    pub status: WindowStatus,
}

/// Drives the retry loop for one window at a time
pub struct RetryController<'a> {
    provider: &'a dyn Provider,
    context: &'a str,
    target_language: &'a str,
    max_attempts: u32,
}

impl<'a> RetryController<'a> {
    pub fn new(provider: &'a dyn Provider, context: &'a str, target_language: &'a str) -> Self {
        Self {
            provider,
            context,
            target_language,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Run the loop to a terminal state
    pub async fn run(
        &self,
        window: &[SubtitleEntry],
        usage: &mut TokenUsageStats,
    ) -> Result<WindowOutcome, ProviderError> {
        let expected: BTreeSet<u32> = (1..=window.len() as u32).collect();
        let mut state = AttemptState::initial();

        loop {
            let (attempt, feedback) = match state {
                AttemptState::Attempting { attempt, feedback } => (attempt, feedback),
                AttemptState::Succeeded { attempt, mut translations } => {
                    let texts = expected
                        .iter()
                        .map(|id| translations.remove(id).unwrap_or_default())
                        .collect();
                    return Ok(WindowOutcome {
                        texts,
                        status: WindowStatus::Succeeded { attempts: attempt },
                    });
                }
                AttemptState::FallenBack { attempts, last_failure } => {
                    return Ok(WindowOutcome {
                        texts: window.iter().map(|e| e.text.clone()).collect(),
                        status: WindowStatus::FallenBack { attempts, last_failure },
                    });
                }
            };

            let prompt = prompts::build(window, self.context, self.target_language, feedback.as_ref());
            debug!("Attempt {}/{}: sending {} entries", attempt, self.max_attempts, window.len());

            let started = Instant::now();
            let completion = self.provider.complete(&prompt).await?;
            usage.record(&completion, started.elapsed());

            let parsed = parser::parse(&completion.text, &expected);
            if let Err(failure) = &parsed {
                warn!("Attempt {}/{} returned an unusable answer: {}", attempt, self.max_attempts, failure);
            }

            state = AttemptState::Attempting { attempt, feedback }.advance(parsed, self.max_attempts);
        }
    }
}
