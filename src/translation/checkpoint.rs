/*!
 * Checkpoints and the final handoff to the output path.
 *
 * While a run is in progress the whole collection is rewritten to a
 * staging file next to the output (`<output>.part`) after every window.
 * Each write replaces the staging file atomically, so it always holds a
 * state at a window boundary. `finalize` moves it onto the output path and
 * never overwrites an existing file.
 */

use log::{debug, info};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleCollection;

const STAGING_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct Checkpoint {
    output_path: PathBuf,
    staging_path: PathBuf,
}

impl Checkpoint {
    pub fn new<P: AsRef<Path>>(output_path: P) -> Self {
        let output_path = output_path.as_ref().to_path_buf();
        let staging_path = Self::staging_path_for(&output_path);
        Self { output_path, staging_path }
    }

    /// `movie.fr.srt` stages as `movie.fr.srt.part`
    pub fn staging_path_for(output_path: &Path) -> PathBuf {
        let mut name: OsString = output_path.as_os_str().to_owned();
        name.push(STAGING_SUFFIX);
        PathBuf::from(name)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Refuse to start over an existing output or a leftover staging file
    pub fn ensure_clean(&self) -> Result<(), AppError> {
        if self.output_path.exists() {
            return Err(AppError::Config(format!(
                "Output file already exists: {}",
                self.output_path.display()
            )));
        }
        if self.staging_path.exists() {
            return Err(AppError::Config(format!(
                "A checkpoint from an earlier run exists at {}; recover or remove it first",
                self.staging_path.display()
            )));
        }
        Ok(())
    }

    /// Write the current state of the collection to the staging path
    pub fn save(&self, collection: &SubtitleCollection) -> Result<(), AppError> {
        FileManager::write_atomic(&self.staging_path, &collection.to_srt_string())
            .map_err(|e| AppError::File(format!("Failed to write checkpoint: {:#}", e)))?;
        debug!("Checkpoint written to {}", self.staging_path.display());
        Ok(())
    }

    /// Move the staging file onto the output path.
    ///
    /// A hard link fails if the destination exists, which makes the
    /// no-overwrite check and the move a single step. Filesystems without
    /// hard links fall back to check-then-rename.
    pub fn finalize(&self) -> Result<PathBuf, AppError> {
        if !self.staging_path.exists() {
            return Err(AppError::File(format!(
                "No checkpoint to finalize at {}",
                self.staging_path.display()
            )));
        }
        if self.output_path.exists() {
            return Err(AppError::Config(format!(
                "Refusing to overwrite existing output file: {}",
                self.output_path.display()
            )));
        }

        match fs::hard_link(&self.staging_path, &self.output_path) {
            Ok(()) => {
                fs::remove_file(&self.staging_path).map_err(|e| {
                    AppError::File(format!("Failed to remove {}: {}", self.staging_path.display(), e))
                })?;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::Config(format!(
                    "Refusing to overwrite existing output file: {}",
                    self.output_path.display()
                )));
            }
            Err(e) => {
                debug!("Hard link unavailable ({}), renaming instead", e);
                fs::rename(&self.staging_path, &self.output_path).map_err(|e| {
                    AppError::File(format!(
                        "Failed to move {} to {}: {}",
                        self.staging_path.display(),
                        self.output_path.display(),
                        e
                    ))
                })?;
            }
        }

        info!("Wrote {}", self.output_path.display());
        Ok(self.output_path.clone())
    }
}
