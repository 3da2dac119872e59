/*!
 * Common test utilities for the vitranslate test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use vitranslate::app_config::{Config, TranslationProvider};


/// Install a test logger once; later calls are no-ops
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short English article with distinct paragraphs
pub fn sample_article() -> String {
    [
        "The river town wakes up before sunrise.",
        "Fishermen push their boats into the mist.",
        "",
        "By noon the market is full of voices.",
        "Children run between the stalls.",
        "",
        "In the evening the lanterns are lit.",
    ]
    .join("\n")
}

/// `count` paragraphs that each become their own chunk at a 40 char budget
pub fn numbered_paragraphs(count: usize) -> (String, Vec<String>) {
    let lines: Vec<String> = (0..count)
        .map(|i| format!("Paragraph number {} with some words.", i))
        .collect();
    (lines.join("\n\n"), lines)
}

/// A configuration that validates without network credentials
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config
}
