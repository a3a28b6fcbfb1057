//! File permission resource (Unix only).

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A path under `$HOME` that should carry a specific octal mode.
#[derive(Debug, Clone)]
pub struct ModeResource {
    pub target: PathBuf,
    /// Octal mode string, e.g. `"600"`.
    pub mode: String,
}

impl ModeResource {
    #[must_use]
    pub const fn new(target: PathBuf, mode: String) -> Self {
        Self { target, mode }
    }

    fn desired_bits(&self) -> Result<u32> {
        u32::from_str_radix(&self.mode, 8)
            .with_context(|| format!("invalid octal mode: {}", self.mode))
    }
}

impl Applicable for ModeResource {
    fn description(&self) -> String {
        format!("{} {}", self.mode, self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            let mode = self.desired_bits()?;
            std::fs::set_permissions(&self.target, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("set permissions: {}", self.target.display()))?;
            Ok(ResourceChange::Applied)
        }

        #[cfg(not(unix))]
        {
            Ok(ResourceChange::Skipped {
                reason: "file modes not supported on this platform".to_string(),
            })
        }
    }
}

impl Resource for ModeResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.target.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("target does not exist: {}", self.target.display()),
            });
        }

        let desired = self.desired_bits()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            let observed = std::fs::metadata(&self.target)
                .with_context(|| format!("stat: {}", self.target.display()))?
                .permissions()
                .mode()
                & 0o7777;
            if observed == desired {
                Ok(ResourceState::Correct)
            } else {
                Ok(ResourceState::Incorrect {
                    observed: format!("{observed:o}"),
                })
            }
        }

        #[cfg(not(unix))]
        {
            let _ = desired;
            Ok(ResourceState::Invalid {
                reason: "file modes not supported on this platform".to_string(),
            })
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;

    fn file_with_mode(mode: u32) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret");
        std::fs::write(&path, "key material").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        (dir, path)
    }

    #[test]
    fn matching_mode_is_correct() {
        let (_dir, path) = file_with_mode(0o600);
        let res = ModeResource::new(path, "600".to_string());
        assert_eq!(res.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn differing_mode_reports_observed_octal() {
        let (_dir, path) = file_with_mode(0o644);
        let res = ModeResource::new(path, "600".to_string());
        assert_eq!(
            res.current_state().unwrap(),
            ResourceState::Incorrect {
                observed: "644".to_string()
            }
        );
    }

    #[test]
    fn apply_sets_the_mode() {
        let (_dir, path) = file_with_mode(0o644);
        let res = ModeResource::new(path.clone(), "600".to_string());
        assert_eq!(res.apply().unwrap(), ResourceChange::Applied);
        let observed = std::fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(observed, 0o600);
    }

    #[test]
    fn missing_target_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let res = ModeResource::new(dir.path().join("gone"), "600".to_string());
        assert!(matches!(
            res.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn garbage_mode_string_errors() {
        let (_dir, path) = file_with_mode(0o644);
        let res = ModeResource::new(path, "rw-r--r--".to_string());
        assert!(res.current_state().is_err());
    }
}
