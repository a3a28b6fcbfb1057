//! Symlink entries from links.toml.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A symlink to maintain: `source` under `links/` in the repo, `target`
/// relative to `$HOME`. When `target` is absent it is derived from the source
/// path by prefixing a dot.
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Link {
    /// The target path relative to `$HOME`.
    #[must_use]
    pub fn target_rel(&self) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| format!(".{}", self.source))
    }
}

#[derive(Debug, Default, Deserialize)]
struct LinksFile {
    #[serde(default)]
    link: Vec<Link>,
}

/// Load links.toml, keeping entries whose categories are all active.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, active: &[String]) -> Result<Vec<Link>, ConfigError> {
    let file: LinksFile = super::read_toml(path)?;
    Ok(file
        .link
        .into_iter()
        .filter(|l| super::categories_match(&l.categories, active))
        .collect())
}
