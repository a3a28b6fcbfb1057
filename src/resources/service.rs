//! systemd user unit resource.

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A systemd user unit that should be enabled and running.
#[derive(Debug)]
pub struct ServiceUnitResource<'a> {
    pub unit: String,
    executor: &'a dyn Executor,
}

impl<'a> ServiceUnitResource<'a> {
    #[must_use]
    pub const fn new(unit: String, executor: &'a dyn Executor) -> Self {
        Self { unit, executor }
    }
}

impl Applicable for ServiceUnitResource<'_> {
    fn description(&self) -> String {
        self.unit.clone()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let result = self
            .executor
            .run_unchecked("systemctl", &["--user", "enable", "--now", &self.unit])?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::Skipped {
                reason: format!("enable failed: {}", result.stderr.trim()),
            })
        }
    }
}

impl Resource for ServiceUnitResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("systemctl", &["--user", "is-enabled", &self.unit])?;
        if result.success {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
