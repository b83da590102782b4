use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::{FileManager, FileType};
use crate::language_utils;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::subtitle_processor::SubtitleCollection;
use crate::track_selection::{self, TrackSelector};
use crate::translation::{Checkpoint, EngineSettings, RunSummary, TranslationEngine};

// @module: Application controller for subtitle translation runs

/// Where the entries come from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// An SRT file
    Srt(PathBuf),
    /// A video container; one of its text subtitle streams is extracted
    Video(PathBuf),
}

impl InputSource {
    /// Exactly one of the two paths must be given
    pub fn from_options(srt: Option<PathBuf>, video: Option<PathBuf>) -> Result<Self, AppError> {
        match (srt, video) {
            (Some(path), None) => Ok(Self::Srt(path)),
            (None, Some(path)) => Ok(Self::Video(path)),
            (Some(_), Some(_)) => Err(AppError::Config(
                "Give either a subtitle file or a video file, not both".to_string(),
            )),
            (None, None) => Err(AppError::Config(
                "An input is required: pass a subtitle file or a video file".to_string(),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Srt(path) | Self::Video(path) => path,
        }
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller, rejecting an invalid configuration
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config.validate().map_err(AppError::config)?;
        Ok(Self { config })
    }

    /// Check input and output before anything is loaded or sent.
    ///
    /// Returns the checkpoint store for the output path.
    pub fn validate_paths(&self, input: &InputSource, output_path: &Path) -> Result<Checkpoint, AppError> {
        let path = input.path();
        if !FileManager::file_exists(path) {
            return Err(AppError::Config(format!("Input file does not exist: {}", path.display())));
        }

        let detected = FileManager::detect_file_type(path).map_err(AppError::config)?;
        match (input, detected) {
            (InputSource::Srt(_), FileType::Video) => {
                return Err(AppError::Config(format!(
                    "{} looks like a video file; pass it as a video input",
                    path.display()
                )));
            }
            (InputSource::Video(_), FileType::Subtitle) => {
                return Err(AppError::Config(format!(
                    "{} looks like a subtitle file; pass it as a subtitle input",
                    path.display()
                )));
            }
            _ => {}
        }

        if output_path.is_dir() {
            return Err(AppError::Config(format!("Output path is a directory: {}", output_path.display())));
        }

        let checkpoint = Checkpoint::new(output_path);
        checkpoint.ensure_clean()?;
        Ok(checkpoint)
    }

    /// Load the entries from an SRT file or from a video stream
    pub async fn load_entries(
        &self,
        input: &InputSource,
        selector: &mut dyn TrackSelector,
    ) -> Result<SubtitleCollection, AppError> {
        match input {
            InputSource::Srt(path) => SubtitleCollection::load_srt(path).map_err(AppError::config),
            InputSource::Video(path) => {
                let tracks = SubtitleCollection::list_subtitle_tracks(path)
                    .await
                    .map_err(AppError::config)?;
                let index = track_selection::choose_stream(&tracks, selector).map_err(AppError::config)?;
                SubtitleCollection::extract_from_video(path, index)
                    .await
                    .map_err(AppError::config)
            }
        }
    }

    /// Run against the configured OpenAI-compatible endpoint
    pub async fn run(
        &self,
        input: InputSource,
        output_path: PathBuf,
        selector: &mut dyn TrackSelector,
    ) -> Result<RunSummary, AppError> {
        let provider = OpenAI::from_config(&self.config)?;
        self.run_with_provider(&provider, input, output_path, selector).await
    }

    /// Run with any provider.
    ///
    /// Configuration problems are reported before the provider is used.
    /// The output file only appears once every window is done.
    pub async fn run_with_provider(
        &self,
        provider: &dyn Provider,
        input: InputSource,
        output_path: PathBuf,
        selector: &mut dyn TrackSelector,
    ) -> Result<RunSummary, AppError> {
        let start_time = Instant::now();

        let checkpoint = self.validate_paths(&input, &output_path)?;
        let mut store = self.load_entries(&input, selector).await?;
        info!("Loaded {} entries from {}", store.len(), input.path().display());

        FileManager::ensure_dir(FileManager::parent_dir(&output_path)).map_err(AppError::config)?;

        provider.test_connection().await?;

        let target_language = language_utils::display_name(&self.config.target_language);
        info!("{} - {} -> {}", provider.name(), provider.model(), target_language);

        let settings = EngineSettings {
            window_size: self.config.window_size,
            context: self.config.context.clone(),
            target_language,
            max_attempts: self.config.translation.max_attempts,
        };
        let engine = TranslationEngine::new(provider, settings);

        let total_windows = store.split_into_windows(self.config.window_size).len() as u64;
        let progress_bar = Self::progress_bar(total_windows);

        let result = engine
            .run(&mut store, &checkpoint, |report| {
                progress_bar.set_message(format!("entries {}", report.entry_span()));
                progress_bar.inc(1);
            })
            .await;
        progress_bar.finish_and_clear();

        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                if checkpoint.staging_path().exists() {
                    warn!(
                        "Run stopped; translations so far are kept in {}",
                        checkpoint.staging_path().display()
                    );
                }
                return Err(e);
            }
        };

        checkpoint.finalize()?;
        Self::log_summary(&summary, start_time.elapsed());
        Ok(summary)
    }

    fn progress_bar(total_windows: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total_windows);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));
        progress_bar
    }

    fn log_summary(summary: &RunSummary, elapsed: Duration) {
        info!(
            "Translated {} entries in {} windows ({} first try, {} after retries) in {}",
            summary.total_entries,
            summary.total_windows,
            summary.succeeded_first_try,
            summary.succeeded_after_retry,
            Self::format_duration(elapsed)
        );

        if summary.fallen_back.is_empty() {
            info!("No windows fell back to source text");
        } else {
            let spans: Vec<String> = summary.fallen_back.iter().map(|r| r.entry_span()).collect();
            warn!(
                "{} window(s) fell back to source text (entries {})",
                summary.fallen_back_count(),
                spans.join(", ")
            );
        }

        if summary.usage.has_token_counts() {
            info!("{}", summary.usage.summary());
        }
    }

    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
