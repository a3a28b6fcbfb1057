//! Package entries from packages.toml.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Which package manager installs a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pacman,
    Aur,
    Winget,
}

/// A package that should be installed.
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub name: String,
    pub manager: PackageManager,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackagesFile {
    #[serde(default)]
    package: Vec<Package>,
}

/// Load packages.toml, keeping entries whose categories are all active.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, active: &[String]) -> Result<Vec<Package>, ConfigError> {
    let file: PackagesFile = super::read_toml(path)?;
    Ok(file
        .package
        .into_iter()
        .filter(|p| super::categories_match(&p.categories, active))
        .collect())
}
