//! Shared execution context handed to every task.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;

/// Everything a task needs, built once per command invocation.
pub struct Context {
    /// Loaded configuration.
    ///
    /// Behind `Arc<RwLock<_>>` so the reload task can swap in a fresh
    /// snapshot after the repository sync while every other task reads
    /// through [`Context::config_read`].
    pub config: Arc<RwLock<Config>>,
    /// Detected platform, immutable for the run.
    pub platform: Arc<Platform>,
    /// Destination for display output and task records.
    pub log: Arc<dyn Log>,
    /// Preview changes without applying them.
    pub dry_run: bool,
    /// The user's home directory.
    pub home: PathBuf,
    /// Process runner, swappable for tests.
    pub executor: Arc<dyn Executor>,
    /// Whether resource batches may run on Rayon.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context, resolving the home directory from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when neither `HOME` nor (on Windows) `USERPROFILE`
    /// is set.
    pub fn new(
        config: Arc<RwLock<Config>>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        parallel: bool,
    ) -> Result<Self> {
        let home = if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE").or_else(|_| std::env::var("HOME"))
        } else {
            std::env::var("HOME")
        }
        .map_err(|_| anyhow::anyhow!("home directory environment variable is not set"))?;

        Ok(Self {
            config,
            platform,
            log,
            dry_run,
            home: PathBuf::from(home),
            executor,
            parallel,
        })
    }

    /// Read access to the configuration.
    ///
    /// A poisoned lock means a task panicked mid-run; the config itself is
    /// never left half-written (the only writer swaps a complete value), so
    /// the poison is consumed.
    pub fn config_read(&self) -> std::sync::RwLockReadGuard<'_, Config> {
        self.config
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Root of the configuration repository.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.config_read().root.clone()
    }

    /// Directory holding link sources.
    #[must_use]
    pub fn links_dir(&self) -> PathBuf {
        self.config_read().root.join("links")
    }

    /// Clone of this context with a different log destination.
    ///
    /// The scheduler uses this to hand each parallel task a buffered log
    /// while sharing everything else.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            config: Arc::clone(&self.config),
            platform: Arc::clone(&self.platform),
            log,
            dry_run: self.dry_run,
            home: self.home.clone(),
            executor: Arc::clone(&self.executor),
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::{empty_config, make_linux_context};

    #[test]
    fn root_and_links_dir_derive_from_config() {
        let ctx = make_linux_context(empty_config(PathBuf::from("/srv/converge")));
        assert_eq!(ctx.root(), PathBuf::from("/srv/converge"));
        assert_eq!(ctx.links_dir(), PathBuf::from("/srv/converge/links"));
    }

    #[test]
    fn with_log_shares_config() {
        let ctx = make_linux_context(empty_config(PathBuf::from("/srv/converge")));
        let log: Arc<dyn Log> = Arc::new(crate::logging::Logger::new("test"));
        let clone = ctx.with_log(log);
        assert!(Arc::ptr_eq(&ctx.config, &clone.config));
        assert_eq!(clone.home, ctx.home);
    }

    #[test]
    fn config_read_sees_writer_updates() {
        let ctx = make_linux_context(empty_config(PathBuf::from("/old")));
        {
            let mut guard = ctx.config.write().unwrap();
            *guard = empty_config(PathBuf::from("/new"));
        }
        assert_eq!(ctx.root(), PathBuf::from("/new"));
    }
}
