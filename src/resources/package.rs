//! System package resource.
//!
//! Presence is determined from one bulk query per manager rather than one
//! probe per package, so batches of any size cost a single command.

use std::collections::HashSet;
use std::fmt;

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::config::packages::PackageManager;
use crate::exec::Executor;

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pacman => write!(f, "pacman"),
            Self::Aur => write!(f, "aur"),
            Self::Winget => write!(f, "winget"),
        }
    }
}

/// One package that should be installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    pub name: String,
    pub manager: PackageManager,
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    #[must_use]
    pub const fn new(name: String, manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            manager,
            executor,
        }
    }

    /// State from a pre-fetched installed set; see [`installed_packages`].
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.manager)
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.manager {
            PackageManager::Pacman => {
                self.executor.run(
                    "sudo",
                    &["pacman", "-S", "--noconfirm", "--needed", &self.name],
                )?;
            }
            PackageManager::Aur => {
                if !self.executor.which("paru") {
                    return Ok(ResourceChange::Skipped {
                        reason: "paru not found".to_string(),
                    });
                }
                self.executor
                    .run("paru", &["-S", "--noconfirm", "--needed", &self.name])?;
            }
            PackageManager::Winget => {
                self.executor.run(
                    "winget",
                    &[
                        "install",
                        "--id",
                        &self.name,
                        "--exact",
                        "--silent",
                        "--accept-package-agreements",
                        "--accept-source-agreements",
                    ],
                )?;
            }
        }
        Ok(ResourceChange::Applied)
    }
}

/// Query the full installed set for a manager with a single command.
///
/// # Errors
///
/// Returns an error if the listing command cannot be executed or exits
/// nonzero; the caller decides what one broken query means for the batch.
pub fn installed_packages(
    manager: PackageManager,
    executor: &dyn Executor,
) -> Result<HashSet<String>> {
    let mut set = HashSet::new();
    match manager {
        // One "name version" pair per line.
        PackageManager::Pacman | PackageManager::Aur => {
            let result = executor.run("pacman", &["-Q"])?;
            for line in result.stdout.lines() {
                if let Some(name) = line.split_whitespace().next() {
                    set.insert(name.to_string());
                }
            }
        }
        // Formatted table; winget IDs are reverse-domain tokens so exact
        // matches against any token are unambiguous.
        PackageManager::Winget => {
            let result = executor.run(
                "winget",
                &[
                    "list",
                    "--accept-source-agreements",
                    "--disable-interactivity",
                ],
            )?;
            for line in result.stdout.lines() {
                for token in line.split_whitespace() {
                    set.insert(token.to_string());
                }
            }
        }
    }
    Ok(set)
}
