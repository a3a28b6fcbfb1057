//! Shared helpers for config loader tests.

use std::path::PathBuf;

use tempfile::TempDir;

/// Write TOML to a temp file, keeping the directory alive for the test.
pub fn write_temp_toml(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("write temp config");
    (dir, path)
}

/// Active category set used by most loader tests.
pub fn base_categories() -> Vec<String> {
    vec!["base".to_string()]
}
