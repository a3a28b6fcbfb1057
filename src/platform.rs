//! Host platform detection.
//!
//! Capabilities are probed once at startup and shared read-only across tasks,
//! so applicability checks never shell out during scheduling.

use std::fmt;
use std::path::Path;

use crate::exec::Executor;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Capabilities of the host the engine is converging.
#[derive(Debug, Clone)]
pub struct Platform {
    pub os: Os,
    /// Arch Linux (pacman present).
    pub is_arch: bool,
    /// systemd user units usable.
    pub has_systemd: bool,
    /// Windows registry usable.
    pub has_registry: bool,
}

impl Platform {
    /// Probe the current host.
    pub fn detect(exec: &dyn Executor) -> Self {
        if cfg!(windows) {
            Self {
                os: Os::Windows,
                is_arch: false,
                has_systemd: false,
                has_registry: true,
            }
        } else {
            Self {
                os: Os::Linux,
                is_arch: Path::new("/etc/arch-release").exists() || exec.which("pacman"),
                has_systemd: exec.which("systemctl"),
                has_registry: false,
            }
        }
    }

    /// Construct an explicit platform, for tests.
    #[must_use]
    pub const fn new(os: Os, is_arch: bool, has_systemd: bool, has_registry: bool) -> Self {
        Self {
            os,
            is_arch,
            has_systemd,
            has_registry,
        }
    }

    /// Whether a config category tag is inapplicable on this host.
    ///
    /// Categories named after a platform the host lacks are excluded before
    /// profile filtering runs.
    #[must_use]
    pub fn excludes_category(&self, category: &str) -> bool {
        match category {
            "windows" => self.os != Os::Windows,
            "linux" => self.os != Os::Linux,
            "arch" => !self.is_arch,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_non_arch() -> Platform {
        Platform::new(Os::Linux, false, true, false)
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::Windows.to_string(), "windows");
    }

    #[test]
    fn linux_excludes_windows_categories() {
        let platform = linux_non_arch();
        assert!(platform.excludes_category("windows"));
        assert!(!platform.excludes_category("linux"));
    }

    #[test]
    fn non_arch_excludes_arch_category() {
        let platform = linux_non_arch();
        assert!(platform.excludes_category("arch"));
        let arch = Platform::new(Os::Linux, true, true, false);
        assert!(!arch.excludes_category("arch"));
    }

    #[test]
    fn unknown_categories_pass() {
        assert!(!linux_non_arch().excludes_category("shell"));
    }
}
