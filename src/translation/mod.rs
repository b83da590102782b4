/*!
 * Windowed translation.
 *
 * - `prompts`: renders the request for one window
 * - `parser`: strict parser for the model's answer
 * - `retry`: per-window retry state machine with feedback
 * - `engine`: drives the windows in order
 * - `checkpoint`: staging writes and the final handoff
 * - `markup`: entity escaping shared by prompts and parser
 * - `usage`: token accounting
 */

pub use self::checkpoint::Checkpoint;
pub use self::engine::{EngineSettings, RunSummary, TranslationEngine, WindowReport};
pub use self::parser::ParseFailure;
pub use self::retry::{AttemptState, RetryController, WindowOutcome, WindowStatus, MAX_ATTEMPTS};
pub use self::usage::TokenUsageStats;

pub mod checkpoint;
pub mod engine;
pub mod markup;
pub mod parser;
pub mod prompts;
pub mod retry;
pub mod usage;
