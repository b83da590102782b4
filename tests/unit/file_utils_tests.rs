/*!
 * Tests for file helpers
 */

use anyhow::Result;
use srtai::file_utils::{FileManager, FileType};
use std::fs;

use crate::common;

#[test]
fn test_writeAtomic_shouldReplaceContentWithoutLeftovers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("state.srt");

    FileManager::write_atomic(&path, "first")?;
    FileManager::write_atomic(&path, "second")?;

    assert_eq!(fs::read_to_string(&path)?, "second");
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn test_writeAtomic_shouldCreateMissingParentDirs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("deeper").join("out.srt");

    FileManager::write_atomic(&path, "content")?;

    assert_eq!(FileManager::read_to_string(&path)?, "content");
    Ok(())
}

#[test]
fn test_detectFileType_shouldUseExtensionThenContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let video = common::create_test_file(temp_dir.path(), "movie.mkv", "not really a video")?;
    let untagged = common::create_test_subtitle(temp_dir.path(), "subs.txt")?;

    assert_eq!(FileManager::detect_file_type(&srt)?, FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type(&video)?, FileType::Video);
    assert_eq!(FileManager::detect_file_type(&untagged)?, FileType::Subtitle);
    assert!(FileManager::detect_file_type(temp_dir.path().join("missing.srt")).is_err());
    Ok(())
}

#[test]
fn test_parentDir_withBareFileName_shouldBeCurrentDir() {
    assert_eq!(FileManager::parent_dir("out.srt"), std::path::PathBuf::from("."));
}
