//! Domain error types for the engine.
//!
//! Internal modules return typed errors where the failure kind matters to the
//! caller; command handlers at the CLI boundary convert everything to
//! [`anyhow::Error`] via `?`.

use thiserror::Error;

/// Errors from configuration loading and profile resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested profile is not defined in `profiles.toml`.
    #[error("unknown profile '{name}' (available: {available})")]
    UnknownProfile {
        /// The name that was requested.
        name: String,
        /// Comma-separated list of defined profile names.
        available: String,
    },

    /// A TOML file failed to parse.
    #[error("invalid TOML in {}: {source}", file.display())]
    Parse {
        /// File that failed to parse.
        file: std::path::PathBuf,
        /// Underlying deserialisation error.
        #[source]
        source: toml::de::Error,
    },

    /// A configuration file could not be read.
    #[error("cannot read {}", path.display())]
    Io {
        /// Path that could not be read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from leaf resource operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource does not support the requested operation.
    #[error("operation '{operation}' is not supported for '{resource}'")]
    Unsupported {
        /// The operation that was attempted (e.g. `remove`).
        operation: String,
        /// Description of the resource.
        resource: String,
    },
}
