//! Subcommand entry points and the shared setup they run through.

pub mod apply;
pub mod remove;
pub mod verify;

mod scheduler;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::profiles::{self, Profile, DEFAULT_PROFILE};
use crate::config::Config;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::Platform;
use crate::tasks::{Context, Task};

/// Everything a subcommand needs: the resolved profile and a ready context.
pub(crate) struct CommandSetup {
    pub context: Context,
    pub profile: Profile,
}

impl CommandSetup {
    /// Resolve the repository root, detect the platform, resolve the
    /// profile, and load the configuration.
    pub(crate) fn init(global: &GlobalOpts, log: &Arc<Logger>) -> Result<Self> {
        let root = resolve_root(global.root.as_deref())?;
        log.debug(&format!("repository root: {}", root.display()));

        let executor: Arc<dyn crate::exec::Executor> = Arc::new(SystemExecutor);
        let platform = Platform::detect(executor.as_ref());
        log.debug(&format!("detected platform: {platform:?}"));

        let name = global.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let profile = profiles::resolve(name, &root.join("conf"), &platform)?;
        log.debug(&format!(
            "profile {} (active categories: {})",
            profile.name,
            profile.active_categories.join(", ")
        ));

        let config = Config::load(&root, &profile, &platform)?;
        log.debug(&format!(
            "loaded {} links, {} packages, {} permissions, {} registry values, {} services",
            config.links.len(),
            config.packages.len(),
            config.permissions.len(),
            config.registry.len(),
            config.services.len()
        ));

        let context = Context::new(
            Arc::new(RwLock::new(config)),
            Arc::new(platform),
            Arc::clone(log) as Arc<dyn crate::logging::Log>,
            global.dry_run,
            executor,
            global.parallel,
        )?;

        Ok(Self { context, profile })
    }
}

/// Run a task set to completion, print the summary, and fail the command
/// if any task failed.
pub(crate) fn run_to_summary(
    tasks: &[Box<dyn Task>],
    ctx: &Context,
    log: &Arc<Logger>,
) -> Result<()> {
    scheduler::run_tasks(tasks, ctx, log);
    log.print_summary();

    let failures = log.failure_count();
    if failures > 0 {
        bail!("{failures} task(s) failed");
    }
    Ok(())
}

/// Whether a directory is a configuration repository root.
fn looks_like_root(dir: &Path) -> bool {
    dir.join("conf").is_dir() && dir.join("links").is_dir()
}

/// Locate the configuration repository.
///
/// Precedence: `--root`, the `CONVERGE_ROOT` environment variable, the
/// directories above the running executable, then the working directory.
/// The first two are explicit and therefore checked strictly; an explicit
/// path that is not a repository is an error, not a fallthrough.
fn resolve_root(cli_root: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = cli_root {
        if looks_like_root(root) {
            return Ok(root.to_path_buf());
        }
        bail!(
            "{} does not contain conf/ and links/ directories",
            root.display()
        );
    }

    if let Ok(env_root) = std::env::var("CONVERGE_ROOT") {
        let root = PathBuf::from(env_root);
        if looks_like_root(&root) {
            return Ok(root);
        }
        bail!(
            "CONVERGE_ROOT={} does not contain conf/ and links/ directories",
            root.display()
        );
    }

    // A binary kept inside the repository (target/release, a bin/ dir)
    // finds its own root without any flags.
    if let Ok(exe) = std::env::current_exe() {
        for dir in exe.ancestors().skip(1) {
            if looks_like_root(dir) {
                return Ok(dir.to_path_buf());
            }
        }
    }

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    if looks_like_root(&cwd) {
        return Ok(cwd);
    }

    bail!("cannot locate the configuration repository; pass --root or set CONVERGE_ROOT")
}
