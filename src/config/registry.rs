//! Windows registry entries from registry.toml.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Registry value kind, matching what `Set-ItemProperty` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    String,
    Dword,
}

/// A registry value that should hold a specific data string.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryValue {
    /// Full key path, e.g. `HKCU:\Software\Microsoft\...`.
    pub key: String,
    pub name: String,
    pub data: String,
    pub kind: RegistryKind,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    value: Vec<RegistryValue>,
}

/// Load registry.toml, keeping entries whose categories are all active.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, active: &[String]) -> Result<Vec<RegistryValue>, ConfigError> {
    let file: RegistryFile = super::read_toml(path)?;
    Ok(file
        .value
        .into_iter()
        .filter(|v| super::categories_match(&v.categories, active))
        .collect())
}
