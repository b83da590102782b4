/*!
 * Subtitle stream selection for video input.
 *
 * The controller asks a `TrackSelector` which stream to extract, so the
 * translation path never depends on a terminal. Bitmap streams are removed
 * before any selector sees the list.
 */

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::io::{BufRead, Write};

use crate::language_utils;
use crate::subtitle_processor::SubtitleInfo;

/// Picks one stream out of the text-based streams of a video
pub trait TrackSelector {
    /// Return the absolute stream index to extract. `tracks` is never empty.
    fn select(&mut self, tracks: &[SubtitleInfo]) -> Result<usize>;
}

/// Drop bitmap streams, failing when nothing convertible is left
pub fn text_tracks(tracks: &[SubtitleInfo]) -> Result<Vec<SubtitleInfo>> {
    if tracks.is_empty() {
        return Err(anyhow!("No subtitle streams found in the video"));
    }

    let text: Vec<SubtitleInfo> = tracks.iter().filter(|t| !t.is_bitmap()).cloned().collect();

    if text.is_empty() {
        let found: Vec<String> = tracks.iter().map(|t| t.to_string()).collect();
        return Err(anyhow!(
            "All subtitle streams are bitmap-based and cannot be converted to text SRT. Found: {}",
            found.join(", ")
        ));
    }

    let skipped = tracks.len() - text.len();
    if skipped > 0 {
        warn!("Skipping {} bitmap subtitle stream(s) (PGS/VobSub/DVB)", skipped);
    }

    Ok(text)
}

/// Filter the streams, then let the selector choose
pub fn choose_stream(tracks: &[SubtitleInfo], selector: &mut dyn TrackSelector) -> Result<usize> {
    let candidates = text_tracks(tracks)?;
    let index = selector.select(&candidates)?;
    info!("Using subtitle stream {}", index);
    Ok(index)
}

/// A stream given explicitly by index
#[derive(Debug, Clone, Copy)]
pub struct IndexSelector(pub usize);

impl TrackSelector for IndexSelector {
    fn select(&mut self, tracks: &[SubtitleInfo]) -> Result<usize> {
        if tracks.iter().any(|t| t.index == self.0) {
            return Ok(self.0);
        }
        let available: Vec<String> = tracks.iter().map(|t| t.index.to_string()).collect();
        Err(anyhow!(
            "Subtitle stream {} is not a text subtitle stream (available: {})",
            self.0,
            available.join(", ")
        ))
    }
}

/// Automatic choice: preferred language, then English, then the first stream
#[derive(Debug, Clone, Default)]
pub struct LanguageSelector {
    pub preferred_language: Option<String>,
}

impl LanguageSelector {
    pub fn new(preferred_language: Option<String>) -> Self {
        Self { preferred_language }
    }

    fn matches(track: &SubtitleInfo, language: &str) -> bool {
        if let Some(tag) = &track.language {
            if language_utils::language_codes_match(tag, language) {
                return true;
            }
        }
        let Some(title) = &track.title else {
            return false;
        };
        let title = title.to_lowercase();
        let name = language_utils::get_language_name(language)
            .map(|n| n.to_lowercase())
            .unwrap_or_else(|_| language.to_lowercase());
        title.contains(&name)
    }
}

impl TrackSelector for LanguageSelector {
    fn select(&mut self, tracks: &[SubtitleInfo]) -> Result<usize> {
        let first = tracks.first().ok_or_else(|| anyhow!("No text subtitle streams to choose from"))?;

        if let Some(preferred) = self.preferred_language.as_deref() {
            if let Some(track) = tracks.iter().find(|t| Self::matches(t, preferred)) {
                return Ok(track.index);
            }
            warn!("No subtitle stream matches language '{}'", preferred);
        }

        if let Some(track) = tracks.iter().find(|t| Self::matches(t, "en")) {
            return Ok(track.index);
        }

        Ok(first.index)
    }
}

/// Numbered menu on a terminal
pub struct InteractiveSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractiveSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl InteractiveSelector<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Menu on stderr, answers from stdin
    pub fn terminal() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TrackSelector for InteractiveSelector<R, W> {
    fn select(&mut self, tracks: &[SubtitleInfo]) -> Result<usize> {
        writeln!(self.output, "Available subtitle streams:")?;
        for (i, track) in tracks.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, track)?;
        }

        loop {
            write!(self.output, "Select a stream [1-{}]: ", tracks.len())?;
            self.output.flush()?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).context("Failed to read stream choice")?;
            if read == 0 {
                return Err(anyhow!("No subtitle stream selected"));
            }

            match line.trim().parse::<usize>() {
                Ok(choice) if (1..=tracks.len()).contains(&choice) => return Ok(tracks[choice - 1].index),
                _ => writeln!(self.output, "Please enter a number between 1 and {}", tracks.len())?,
            }
        }
    }
}
