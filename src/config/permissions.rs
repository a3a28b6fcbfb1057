//! File mode entries from permissions.toml.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A path under `$HOME` that should carry a specific mode.
#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    /// Path relative to `$HOME`.
    pub path: String,
    /// Octal mode string, e.g. `"600"`.
    pub mode: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Permission {
    /// Parse the octal mode string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid octal.
    pub fn mode_bits(&self) -> Result<u32, std::num::ParseIntError> {
        u32::from_str_radix(&self.mode, 8)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PermissionsFile {
    #[serde(default)]
    permission: Vec<Permission>,
}

/// Load permissions.toml, keeping entries whose categories are all active.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, active: &[String]) -> Result<Vec<Permission>, ConfigError> {
    let file: PermissionsFile = super::read_toml(path)?;
    Ok(file
        .permission
        .into_iter()
        .filter(|p| super::categories_match(&p.categories, active))
        .collect())
}
