//! Profile resolution.
//!
//! A profile names a set of active categories. Definitions come from
//! conf/profiles.toml; platform categories (linux, windows, arch) are added
//! or excluded automatically from the detected host.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::platform::Platform;

/// Profile used when none is named on the command line.
pub const DEFAULT_PROFILE: &str = "base";

/// A resolved profile with its final category sets.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub active_categories: Vec<String>,
    pub excluded_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProfileDef {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profile: BTreeMap<String, ProfileDef>,
}

fn default_definitions() -> BTreeMap<String, ProfileDef> {
    let mut defs = BTreeMap::new();
    defs.insert(
        "base".to_string(),
        ProfileDef {
            include: vec![],
            exclude: vec!["desktop".to_string()],
        },
    );
    defs.insert(
        "desktop".to_string(),
        ProfileDef {
            include: vec!["desktop".to_string()],
            exclude: vec![],
        },
    );
    defs
}

/// Resolve a profile by name against conf/profiles.toml.
///
/// Every profile starts from the implicit `base` category, adds its includes,
/// then platform categories are folded in. Excluded categories always win
/// over included ones.
///
/// # Errors
///
/// Returns an error if profiles.toml cannot be parsed or the name is unknown.
pub fn resolve(name: &str, conf_dir: &Path, platform: &Platform) -> Result<Profile, ConfigError> {
    let path = conf_dir.join("profiles.toml");
    let defs = if path.exists() {
        let file: ProfilesFile = super::read_toml(&path)?;
        if file.profile.is_empty() {
            default_definitions()
        } else {
            file.profile
        }
    } else {
        default_definitions()
    };

    let def = defs.get(name).ok_or_else(|| ConfigError::UnknownProfile {
        name: name.to_string(),
        available: defs.keys().cloned().collect::<Vec<_>>().join(", "),
    })?;

    let mut active: Vec<String> = vec!["base".to_string()];
    active.extend(def.include.iter().cloned());
    let mut excluded = def.exclude.clone();

    for category in ["linux", "windows", "arch"] {
        if platform.excludes_category(category) {
            if !excluded.iter().any(|c| c == category) {
                excluded.push(category.to_string());
            }
        } else {
            active.push(category.to_string());
        }
    }

    active.retain(|c| !excluded.contains(c));
    active.sort();
    active.dedup();
    excluded.sort();
    excluded.dedup();

    Ok(Profile {
        name: name.to_string(),
        active_categories: active,
        excluded_categories: excluded,
    })
}
