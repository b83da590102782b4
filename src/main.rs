#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{ArgGroup, Parser, ValueEnum};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use srtai::app_config::{self, Config};
use srtai::app_controller::{Controller, InputSource};
use srtai::errors::AppError;
use srtai::track_selection::{IndexSelector, InteractiveSelector, LanguageSelector, TrackSelector};
use srtai::translation::Checkpoint;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "srtai.json";

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// srtai - translate subtitles with an OpenAI-compatible model
///
/// Subtitles are sent in small windows. Each answer is checked strictly;
/// malformed answers are retried with a description of the problem, and a
/// window that never yields a usable answer keeps its original text.
#[derive(Parser, Debug)]
#[command(name = "srtai")]
#[command(version)]
#[command(about = "Windowed subtitle translation with OpenAI-compatible models")]
#[command(long_about = None, after_help = "EXAMPLES:
    srtai --srt movie.srt -t fr http://localhost:1234/v1 qwen2.5-7b movie.fr.srt
    srtai --video movie.mkv --stream-language en -t de https://api.openai.com/v1 gpt-4o-mini movie.de.srt
    srtai --srt show.srt -t \"Brazilian Portuguese\" -w 6 -c \"Sitcom, casual register\" URL MODEL out.srt

While running, progress is checkpointed to OUTPUT_PATH.part. The final file
is only written once every window is done, and never over an existing file.")]
#[command(group(ArgGroup::new("input").required(true).args(["srt", "video"])))]
struct CommandLineOptions {
    /// Base URL of the OpenAI-compatible API (e.g. http://localhost:1234/v1)
    #[arg(value_name = "BASE_URL")]
    base_url: String,

    /// Model identifier
    #[arg(value_name = "MODEL")]
    model: String,

    /// Where to write the translated SRT file (must not exist)
    #[arg(value_name = "OUTPUT_PATH")]
    output_path: PathBuf,

    /// Input SRT file
    #[arg(long, value_name = "FILE")]
    srt: Option<PathBuf>,

    /// Input video file; a text subtitle stream is extracted with ffmpeg
    #[arg(long, value_name = "FILE")]
    video: Option<PathBuf>,

    /// Target language: ISO code (fr, deu) or a name ("Brazilian Portuguese")
    #[arg(short, long)]
    target_language: Option<String>,

    /// Entries per request
    #[arg(short, long)]
    window_size: Option<usize>,

    /// Background for the translator (genre, dialect, register)
    #[arg(short, long)]
    context: Option<String>,

    /// API key
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Video input: extract this stream index
    #[arg(long, requires = "video", conflicts_with = "stream_language")]
    stream_index: Option<usize>,

    /// Video input: pick the stream in this language automatically
    #[arg(long, requires = "video")]
    stream_language: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Only our own crate below debug; dependencies stay quiet
        if record.level() > Level::Info && !record.target().starts_with("srtai") {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{}{} {:<5} {}\x1B[0m",
            Self::color_for_level(record.level()),
            now,
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Merge the config file (if any) with command-line overrides
fn build_config(options: &CommandLineOptions) -> Result<Config, AppError> {
    let config_path = options
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()));

    let mut config = match &config_path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load_from_file(path).map_err(AppError::config)?
        }
        None => Config::default(),
    };

    config.endpoint = options.base_url.clone();
    config.model = options.model.clone();

    if let Some(target) = &options.target_language {
        config.target_language = target.clone();
    }
    if let Some(window_size) = options.window_size {
        config.window_size = window_size;
    }
    if let Some(context) = &options.context {
        config.context = context.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}

fn stream_selector(options: &CommandLineOptions) -> Box<dyn TrackSelector> {
    if let Some(index) = options.stream_index {
        Box::new(IndexSelector(index))
    } else if options.stream_language.is_some() {
        Box::new(LanguageSelector::new(options.stream_language.clone()))
    } else if std::io::stdin().is_terminal() {
        Box::new(InteractiveSelector::terminal())
    } else {
        Box::new(LanguageSelector::default())
    }
}

async fn run(options: CommandLineOptions) -> Result<(), AppError> {
    let config = build_config(&options)?;
    log::set_max_level(config.log_level.into());

    let input = InputSource::from_options(options.srt.clone(), options.video.clone())?;
    let controller = Controller::with_config(config)?;
    let mut selector = stream_selector(&options);

    controller
        .run(input, options.output_path.clone(), selector.as_mut())
        .await?;
    Ok(())
}

fn report_interrupt(output_path: &Path) {
    let staging = Checkpoint::staging_path_for(output_path);
    if staging.exists() {
        error!("Interrupted. Completed windows are saved in {}", staging.display());
    } else {
        error!("Interrupted before any checkpoint was written");
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let options = CommandLineOptions::parse();
    let output_path = options.output_path.clone();

    // Cancelling drops the run between awaits; checkpoint writes never yield
    let result = tokio::select! {
        result = run(options) => result,
        _ = tokio::signal::ctrl_c() => {
            report_interrupt(&output_path);
            Err(AppError::Interrupted)
        }
    };

    if let Err(e) = result {
        if !matches!(e, AppError::Interrupted) {
            error!("{}", e);
        }
        std::process::exit(1);
    }
}
