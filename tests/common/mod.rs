/*!
 * Common test utilities for the srtai test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;


/// Five short entries, enough for windows of 2 to leave a remainder
pub const FIVE_ENTRY_SRT: &str = "1
00:00:01,000 --> 00:00:02,500
Good morning.

2
00:00:03,000 --> 00:00:04,000
Where are you going?

3
00:00:04,500 --> 00:00:06,000
To the market,
like every day.

4
00:00:06,200 --> 00:00:07,000
Bring bread & cheese.

5
00:00:08,000 --> 00:00:09,999
<i>Goodbye!</i>
";

/// Route `log` output through env_logger so failing tests show it
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates the five-entry subtitle file
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, FIVE_ENTRY_SRT)
}

/// Well-formed answer for the given (id, text) pairs
pub fn answer(items: &[(u32, &str)]) -> String {
    let mut out = String::from("The lines form one short conversation.\n<answer>\n");
    for (id, text) in items {
        out.push_str(&format!("<text id=\"{}\">{}</text>\n", id, text));
    }
    out.push_str("</answer>");
    out
}
