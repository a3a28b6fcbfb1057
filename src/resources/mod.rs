//! Idempotent resource primitives.
//!
//! A resource pairs a desired state with probes and mutations: check what is
//! observed, apply only when needed, never touch what is already correct.

pub mod link;
pub mod mode;
pub mod package;
pub mod registry;
pub mod service;

use anyhow::Result;

/// Observed state of one resource relative to its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing is present where the resource should be.
    Missing,
    /// The observed state matches the desired state.
    Correct,
    /// Something is present but does not match.
    Incorrect {
        /// What was observed instead.
        observed: String,
    },
    /// The resource cannot be reconciled at all (bad precondition).
    Invalid { reason: String },
}

/// Outcome of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The resource was created or corrected.
    Applied,
    /// Nothing needed doing.
    AlreadyCorrect,
    /// The resource was deliberately left alone.
    Skipped { reason: String },
}

/// A resource that can be described and mutated.
///
/// Resources whose state comes from one external bulk query implement only
/// this trait and get their [`ResourceState`] handed to them; resources that
/// can probe themselves implement [`Resource`] on top.
pub trait Applicable {
    /// One-line description used in log and preview output.
    fn description(&self) -> String;

    /// Bring the resource to its desired state.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or permission failure.
    fn apply(&self) -> Result<ResourceChange>;

    /// Undo a previous apply. Only resources that support removal override
    /// this.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails or is unsupported.
    fn remove(&self) -> Result<ResourceChange> {
        Err(crate::error::ResourceError::Unsupported {
            operation: "remove".to_string(),
            resource: self.description(),
        }
        .into())
    }
}

/// An [`Applicable`] resource that can probe its own observed state.
pub trait Resource: Applicable {
    /// Probe the observed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Fixed;

    impl Applicable for Fixed {
        fn description(&self) -> String {
            "fixed resource".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            Ok(ResourceChange::Applied)
        }
    }

    #[test]
    fn remove_unsupported_by_default() {
        let err = Fixed.remove().unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(err.to_string().contains("fixed resource"));
    }
}
