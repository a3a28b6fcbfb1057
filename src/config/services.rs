//! systemd user unit entries from services.toml.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A systemd user unit that should be enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceUnit {
    /// Unit name including suffix, e.g. `ssh-agent.service`.
    pub unit: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicesFile {
    #[serde(default)]
    service: Vec<ServiceUnit>,
}

/// Load services.toml, keeping entries whose categories are all active.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, active: &[String]) -> Result<Vec<ServiceUnit>, ConfigError> {
    let file: ServicesFile = super::read_toml(path)?;
    Ok(file
        .service
        .into_iter()
        .filter(|s| super::categories_match(&s.categories, active))
        .collect())
}
