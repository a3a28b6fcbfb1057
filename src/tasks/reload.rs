//! Re-read configuration after the repository sync.

use std::any::TypeId;

use anyhow::{Context as _, Result};

use super::{Context, RefreshSignal, Task, TaskResult};
use crate::config::profiles::Profile;
use crate::config::Config;

/// Swap in a freshly-parsed config snapshot when the sync pulled new
/// commits.
///
/// Every task that reads `ctx.config_read()` declares this task as a
/// prerequisite, so all of them see post-pull values. The swap is one
/// atomic write of the `RwLock`; readers never observe a half-loaded
/// config.
pub struct ReloadConfig {
    signal: RefreshSignal,
    profile: Profile,
}

impl ReloadConfig {
    #[must_use]
    pub const fn new(signal: RefreshSignal, profile: Profile) -> Self {
        Self { signal, profile }
    }
}

impl Task for ReloadConfig {
    fn name(&self) -> &'static str {
        "Reload configuration"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![TypeId::of::<super::sync::SyncRepository>()]
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !self.signal.was_refreshed() {
            ctx.log.debug("repository unchanged, keeping loaded config");
            return Ok(TaskResult::Skipped("repository unchanged".to_string()));
        }

        // Parse without holding either lock; the file I/O must not stall
        // readers or writers.
        let root = ctx.config_read().root.clone();
        let fresh = Config::load(&root, &self.profile, &ctx.platform)
            .context("reloading configuration after repository sync")?;

        ctx.log.debug(&format!(
            "{} links, {} packages after reload",
            fresh.links.len(),
            fresh.packages.len()
        ));

        let mut guard = ctx
            .config
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = fresh;
        drop(guard);

        ctx.log.info("configuration reloaded");
        Ok(TaskResult::Ok)
    }
}
