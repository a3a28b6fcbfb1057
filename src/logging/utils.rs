//! Path and formatting helpers shared by the logging backends.

use std::fs;
use std::path::PathBuf;

/// Remove ANSI escape sequences from a string.
///
/// CSI sequences are consumed up to their final byte (`@`..`~`); other
/// escapes drop the single following character.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if let Some('[') = chars.next() {
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        }
    }
    out
}

/// Terminal width in columns, falling back to 80 when not a tty.
pub(super) fn terminal_columns() -> usize {
    terminal_size::terminal_size().map_or(80, |(w, _)| usize::from(w.0).max(1))
}

/// The `$XDG_CACHE_HOME/converge/` directory, created on first use.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var("XDG_CACHE_HOME").map_or_else(
        |_| {
            std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = base.join("converge");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Path of the persistent run log for a command.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Path of the diagnostic stream for a command.
pub(super) fn diag_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.diag.log")))
}

/// Current UTC time with microsecond precision, `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub(super) fn utc_now_us() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn utc_now_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time as `HH:MM:SS`.
pub(super) fn utc_now_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
