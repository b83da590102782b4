/*!
 * Window translation engine.
 *
 * Windows are translated one at a time in document order. For each one
 * the engine runs the retry loop, stores the texts in the collection,
 * reports progress and writes a checkpoint, in that order. A transport
 * error stops the run with the previous checkpoint intact.
 */

use log::{debug, info, warn};
use std::ops::Range;

use crate::errors::AppError;
use crate::providers::Provider;
use crate::subtitle_processor::SubtitleCollection;
use crate::translation::checkpoint::Checkpoint;
use crate::translation::retry::{RetryController, WindowStatus, MAX_ATTEMPTS};
use crate::translation::usage::TokenUsageStats;

/// Settings fixed for the whole run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Entries per window
    pub window_size: usize,
    /// Free-text hints, identical in every prompt
    pub context: String,
    /// Target language as it should appear in prompts
    pub target_language: String,
    /// Attempts per window
    pub max_attempts: u32,
}

impl EngineSettings {
    pub fn new(window_size: usize, context: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            window_size,
            context: context.into(),
            target_language: target_language.into(),
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// What happened to one window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    /// 0-based window number
    pub window_index: usize,
    /// Number of windows in the run
    pub total_windows: usize,
    /// Entry positions covered, 0-based and half-open
    pub entries: Range<usize>,
    pub status: WindowStatus,
}

impl WindowReport {
    /// Entries as 1-based inclusive numbers, e.g. "5-8"
    pub fn entry_span(&self) -> String {
        let first = self.entries.start + 1;
        let last = self.entries.end;
        if first == last {
            format!("{}", first)
        } else {
            format!("{}-{}", first, last)
        }
    }
}

/// Totals for a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_windows: usize,
    pub total_entries: usize,
    pub succeeded_first_try: usize,
    pub succeeded_after_retry: usize,
    pub fallen_back: Vec<WindowReport>,
    pub usage: TokenUsageStats,
}

impl RunSummary {
    pub fn fallen_back_count(&self) -> usize {
        self.fallen_back.len()
    }
}

/// Mutable state of a run: settings, the entry store and the usage counters
pub struct RunContext<'a> {
    pub settings: &'a EngineSettings,
    pub store: &'a mut SubtitleCollection,
    pub usage: TokenUsageStats,
}

pub struct TranslationEngine<'a> {
    provider: &'a dyn Provider,
    settings: EngineSettings,
}

impl<'a> TranslationEngine<'a> {
    pub fn new(provider: &'a dyn Provider, settings: EngineSettings) -> Self {
        Self { provider, settings }
    }

    /// Translate every window of `store`, checkpointing after each one.
    ///
    /// `on_window` is called once per finished window, before its checkpoint.
    pub async fn run<F>(
        &self,
        store: &mut SubtitleCollection,
        checkpoint: &Checkpoint,
        mut on_window: F,
    ) -> Result<RunSummary, AppError>
    where
        F: FnMut(&WindowReport),
    {
        let mut ctx = RunContext {
            settings: &self.settings,
            store,
            usage: TokenUsageStats::with_provider_info(
                self.provider.name().to_string(),
                self.provider.model().to_string(),
            ),
        };

        let windows = ctx.store.split_into_windows(ctx.settings.window_size);
        let total_windows = windows.len();
        info!(
            "Translating {} entries in {} windows of up to {}",
            ctx.store.len(),
            total_windows,
            ctx.settings.window_size
        );

        // Window-boundary state zero: nothing translated yet
        checkpoint.save(ctx.store)?;

        let retry = RetryController::new(self.provider, &ctx.settings.context, &ctx.settings.target_language)
            .with_max_attempts(ctx.settings.max_attempts);

        let mut summary = RunSummary {
            total_windows,
            total_entries: ctx.store.len(),
            succeeded_first_try: 0,
            succeeded_after_retry: 0,
            fallen_back: Vec::new(),
            usage: TokenUsageStats::default(),
        };

        for (window_index, range) in windows.into_iter().enumerate() {
            debug!("Window {}/{}: entries {:?}", window_index + 1, total_windows, range);

            let outcome = retry.run(&ctx.store.entries[range.clone()], &mut ctx.usage).await?;
            ctx.store.apply_translations(range.clone(), outcome.texts)?;

            let report = WindowReport {
                window_index,
                total_windows,
                entries: range,
                status: outcome.status,
            };

            match &report.status {
                WindowStatus::Succeeded { attempts: 1 } => summary.succeeded_first_try += 1,
                WindowStatus::Succeeded { .. } => summary.succeeded_after_retry += 1,
                WindowStatus::FallenBack { attempts, last_failure } => {
                    warn!(
                        "Window {} (entries {}) kept its source text after {} attempts; last problem: {}",
                        window_index + 1,
                        report.entry_span(),
                        attempts,
                        last_failure
                    );
                    summary.fallen_back.push(report.clone());
                }
            }

            on_window(&report);
            checkpoint.save(ctx.store)?;
        }

        summary.usage = ctx.usage;
        Ok(summary)
    }
}
