//! Declarative configuration loading.
//!
//! All desired state lives under `conf/` as TOML files. Each file holds an
//! array of tables; entries carry an optional `categories` list and are kept
//! only when every listed category is active in the resolved profile.

pub mod links;
pub mod packages;
pub mod permissions;
pub mod profiles;
pub mod registry;
pub mod services;

#[cfg(test)]
pub mod test_helpers;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::ConfigError;
use crate::platform::Platform;

/// All desired state loaded for a resolved profile.
#[derive(Debug, Default)]
pub struct Config {
    pub root: PathBuf,
    pub links: Vec<links::Link>,
    pub packages: Vec<packages::Package>,
    pub permissions: Vec<permissions::Permission>,
    pub registry: Vec<registry::RegistryValue>,
    pub services: Vec<services::ServiceUnit>,
}

impl Config {
    /// Load every config file under `root/conf` for the given profile.
    ///
    /// Registry entries are only loaded when the host has a registry, and
    /// service units only when it has systemd.
    ///
    /// # Errors
    ///
    /// Returns an error if any present config file cannot be read or parsed.
    pub fn load(
        root: &Path,
        profile: &profiles::Profile,
        platform: &Platform,
    ) -> Result<Self, ConfigError> {
        let conf = root.join("conf");
        let active = &profile.active_categories;

        let links = links::load(&conf.join("links.toml"), active)?;
        let packages = packages::load(&conf.join("packages.toml"), active)?;
        let permissions = permissions::load(&conf.join("permissions.toml"), active)?;

        let registry = if platform.has_registry {
            registry::load(&conf.join("registry.toml"), active)?
        } else {
            Vec::new()
        };

        let services = if platform.has_systemd {
            services::load(&conf.join("services.toml"), active)?
        } else {
            Vec::new()
        };

        Ok(Self {
            root: root.to_path_buf(),
            links,
            packages,
            permissions,
            registry,
            services,
        })
    }
}

/// Parse a TOML config file into its wrapper type.
///
/// A missing file deserializes as an empty document, so optional config files
/// need no special casing at call sites.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        file: path.to_path_buf(),
        source,
    })
}

/// Whether an entry tagged with `categories` is active under the profile.
///
/// An entry with no categories is always active; otherwise every listed
/// category must be active.
fn categories_match(categories: &[String], active: &[String]) -> bool {
    categories.iter().all(|c| active.iter().any(|a| a == c))
}
