//! Flag shared between [`super::sync::SyncRepository`] and
//! [`super::reload::ReloadConfig`].
//!
//! The two tasks are the only parties, so the flag is injected through
//! their constructors rather than carried on the [`super::Context`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Records whether the repository actually picked up new commits this run.
///
/// Cheaply clonable; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct RefreshSignal {
    refreshed: Arc<AtomicBool>,
}

impl RefreshSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the sync task after a pull that fetched new commits.
    pub fn mark_refreshed(&self) {
        self.refreshed.store(true, Ordering::Release);
    }

    /// Whether [`mark_refreshed`](Self::mark_refreshed) fired.
    #[must_use]
    pub fn was_refreshed(&self) -> bool {
        self.refreshed.load(Ordering::Acquire)
    }
}
