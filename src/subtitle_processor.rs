use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{error, warn, debug};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str};
use tokio::process::Command;

// @module: Subtitle entry store, SRT reader/writer and video stream extraction

// @const: SRT timestamp line, accepting '.' as the millisecond separator
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

const FFPROBE_TIMEOUT: Duration = Duration::from_secs(60);
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(120);

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: 1-based position in the file
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Source text, possibly multi-line
    pub text: String,

    // @field: Translation, absent until the entry's window completes
    pub translated_text: Option<String>,
}

impl SubtitleEntry {
    /// Creates a new untranslated entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
            translated_text: None,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: end >= start and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        if end_time_ms < start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} < start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(SubtitleEntry::new(seq_num, start_time_ms, end_time_ms, trimmed_text.to_string()))
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Text that goes to the output file: the translation when there is one
    pub fn output_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.text)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        // An empty line would end the SRT block early
        for line in self.output_text().lines().filter(|line| !line.trim().is_empty()) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Information about a subtitle stream in a video container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleInfo {
    /// Absolute stream index, as used by `-map 0:N`
    pub index: usize,
    /// The codec name of the stream
    pub codec_name: String,
    /// The language tag (ISO 639-1 or ISO 639-2)
    pub language: Option<String>,
    /// The title tag if available
    pub title: Option<String>,
}

impl SubtitleInfo {
    /// Bitmap codecs cannot be converted to text SRT
    pub fn is_bitmap(&self) -> bool {
        matches!(
            self.codec_name.as_str(),
            "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub"
        )
    }
}

impl fmt::Display for SubtitleInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "stream {}: {} [{}]",
            self.index,
            self.language.as_deref().unwrap_or("unknown"),
            self.codec_name
        )?;
        if let Some(title) = &self.title {
            write!(f, " \"{}\"", title)?;
        }
        Ok(())
    }
}

/// Ordered entries of one subtitle file.
///
/// Loaded once, updated window by window as translations arrive, and
/// serialized back to SRT for checkpoints and the final output.
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Where the entries were loaded from
    pub source_file: PathBuf,

    /// Entries in file order
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Wrap already parsed entries
    pub fn from_entries(source_file: PathBuf, entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection { source_file, entries }
    }

    /// Load an SRT file
    pub fn load_srt<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;
        Ok(Self::from_entries(path.to_path_buf(), entries))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partition the entries into consecutive, non-overlapping index ranges
    /// of at most `window_size` entries. The last window may be shorter.
    pub fn split_into_windows(&self, window_size: usize) -> Vec<Range<usize>> {
        let size = window_size.max(1);
        let total = self.entries.len();

        (0..total)
            .step_by(size)
            .map(|start| start..(start + size).min(total))
            .collect()
    }

    /// Store translations for a window, in window order
    pub fn apply_translations(&mut self, window: Range<usize>, texts: Vec<String>) -> Result<()> {
        if window.end > self.entries.len() || window.len() != texts.len() {
            return Err(anyhow!(
                "Translation count {} does not match window {:?} of {} entries",
                texts.len(), window, self.entries.len()
            ));
        }

        for (entry, text) in self.entries[window].iter_mut().zip(texts) {
            entry.translated_text = Some(text);
        }
        Ok(())
    }

    /// Render the collection as SRT text, substituting translations
    pub fn to_srt_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
        }
        out
    }

    /// Parse SRT format string into subtitle entries.
    ///
    /// Invalid blocks are skipped with a warning. File order is kept and the
    /// surviving entries are renumbered from 1.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut push_entry = |seq_num: usize, (start_ms, end_ms): (u64, u64), text: &str| {
            match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", seq_num, e),
            }
        };

        for (line_idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
                    if !current_text.is_empty() {
                        push_entry(seq_num, times, &current_text);
                        current_seq_num = None;
                        current_times = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((Self::captured_ms(&caps, 1), Self::captured_ms(&caps, 5)));
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_idx + 1, trimmed);
            }
        }

        if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
            if !current_text.is_empty() {
                push_entry(seq_num, times, &current_text);
            } else {
                warn!("Skipping empty subtitle entry {}", seq_num);
            }
        }

        if entries.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        let out_of_order = entries
            .windows(2)
            .filter(|pair| pair[1].start_time_ms < pair[0].start_time_ms)
            .count();
        if out_of_order > 0 {
            warn!("{} subtitle entries start before their predecessor; keeping file order", out_of_order);
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        Ok(entries)
    }

    fn captured_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let field = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        ((field(0) * 60 + field(1)) * 60 + field(2)) * 1000 + field(3)
    }

    /// List subtitle streams in a video file
    pub async fn list_subtitle_tracks<P: AsRef<Path>>(video_path: P) -> Result<Vec<SubtitleInfo>> {
        let video_path = video_path.as_ref();

        if !video_path.exists() {
            return Err(anyhow!("Video file not found: {:?}", video_path));
        }

        let ffprobe_future = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "s"])
            .arg(video_path)
            .output();

        let output = tokio::select! {
            result = ffprobe_future => {
                result.map_err(|e| anyhow!("Failed to execute ffprobe command: {}", e))?
            },
            _ = tokio::time::sleep(FFPROBE_TIMEOUT) => {
                return Err(anyhow!("ffprobe command timed out after {} seconds", FFPROBE_TIMEOUT.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffprobe failed: {}", stderr);
            return Err(anyhow!("ffprobe command failed: {}", stderr));
        }

        Self::parse_ffprobe_streams(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse the `streams` array of ffprobe's JSON output
    pub fn parse_ffprobe_streams(stdout: &str) -> Result<Vec<SubtitleInfo>> {
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        let json: Value = from_str(stdout).context("Failed to parse ffprobe JSON output")?;

        let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
            return Ok(Vec::new());
        };

        let tag = |stream: &Value, name: &str| -> Option<String> {
            stream.get("tags")
                .and_then(|t| t.get(name))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let tracks = streams
            .iter()
            .filter_map(|stream| {
                let index = stream.get("index").and_then(|v| v.as_u64())? as usize;
                let codec_name = stream.get("codec_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                Some(SubtitleInfo {
                    index,
                    codec_name,
                    language: tag(stream, "language"),
                    title: tag(stream, "title"),
                })
            })
            .collect();

        Ok(tracks)
    }

    /// Filter ffmpeg stderr down to lines that explain a failure
    fn filter_ffmpeg_stderr(stderr: &str) -> String {
        const NOISE: [&str; 12] = [
            "ffmpeg version",
            "built with",
            "configuration:",
            "lib",
            "Input #",
            "Metadata:",
            "Duration:",
            "Chapter",
            "Stream #",
            "Output #",
            "Stream mapping:",
            "Press [q]",
        ];

        let meaningful: Vec<&str> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !NOISE.iter().any(|p| line.starts_with(p)))
            .collect();

        if meaningful.is_empty() {
            "unknown ffmpeg error (stderr was empty after filtering)".to_string()
        } else {
            meaningful.join("\n")
        }
    }

    /// Extract one subtitle stream from a video into memory.
    ///
    /// ffmpeg writes into a scratch directory that is removed on return.
    pub async fn extract_from_video<P: AsRef<Path>>(video_path: P, track_index: usize) -> Result<Self> {
        let video_path = video_path.as_ref();

        if !video_path.exists() {
            return Err(anyhow!("Video file does not exist: {:?}", video_path));
        }

        let scratch = tempfile::tempdir().context("Failed to create scratch directory for extraction")?;
        let extracted = scratch.path().join(format!("stream_{}.srt", track_index));

        debug!("Extracting stream {} from {:?}", track_index, video_path);

        let ffmpeg_future = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .args(["-map", &format!("0:{}", track_index), "-c:s", "srt"])
            .arg(&extracted)
            .output();

        let result = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| anyhow!("Failed to execute ffmpeg command for subtitle extraction: {}", e))?
            },
            _ = tokio::time::sleep(FFMPEG_TIMEOUT) => {
                return Err(anyhow!("ffmpeg command timed out after {} seconds", FFMPEG_TIMEOUT.as_secs()));
            }
        };

        if !result.status.success() {
            let filtered = Self::filter_ffmpeg_stderr(&String::from_utf8_lossy(&result.stderr));
            error!("Subtitle extraction failed: {}", filtered);
            return Err(anyhow!("ffmpeg extraction failed: {}", filtered));
        }

        let content = fs::read_to_string(&extracted)
            .with_context(|| format!("ffmpeg produced no output for stream {}", track_index))?;
        if content.trim().is_empty() {
            return Err(anyhow!("Extracted file is empty, no subtitles found in stream {}", track_index));
        }

        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitles extracted from stream {}", track_index))?;

        Ok(Self::from_entries(video_path.to_path_buf(), entries))
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
