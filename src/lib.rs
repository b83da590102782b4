/*!
 * # srtai - windowed subtitle translation
 *
 * Translates subtitle files by sending fixed-size windows of entries to a
 * language model behind an OpenAI-compatible endpoint.
 *
 * ## Features
 *
 * - SRT input, or a text subtitle stream extracted from a video with ffmpeg
 * - Markup protocol with window-local ids and a strict answer parser
 * - Bounded retries that feed the parse problem back to the model
 * - Source text kept for windows that never produce a usable answer
 * - Checkpoint after every window, atomic handoff to the output path
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Entry store, SRT reader/writer, stream extraction
 * - `track_selection`: Choosing a subtitle stream in a video
 * - `translation`: Prompt builder, parser, retry loop, engine, checkpoints
 * - `providers`: Model transports (`openai`, `mock`)
 * - `app_controller`: Input validation and run orchestration
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod track_selection;
pub mod translation;

pub use app_config::Config;
pub use app_controller::{Controller, InputSource};
pub use errors::{AppError, ProviderError};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{RunSummary, TranslationEngine};
