//! Pull the configuration repository before anything consumes it.

use anyhow::Result;

use super::{Context, RefreshSignal, Task, TaskResult};

/// Fast-forward the repository from its upstream.
///
/// Fires the [`RefreshSignal`] only when the pull actually fetched new
/// commits, so [`super::reload::ReloadConfig`] can tell a no-op pull from a
/// real update.
pub struct SyncRepository {
    signal: RefreshSignal,
}

impl SyncRepository {
    #[must_use]
    pub const fn new(signal: RefreshSignal) -> Self {
        Self { signal }
    }
}

impl Task for SyncRepository {
    fn name(&self) -> &'static str {
        "Sync repository"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.root().join(".git").exists()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let root = ctx.root();

        if ctx.dry_run {
            // Compare HEAD with the upstream tracking branch without pulling.
            let head = ctx.executor.run_in(&root, "git", &["rev-parse", "HEAD"]);
            let upstream = ctx.executor.run_in(&root, "git", &["rev-parse", "@{u}"]);
            if let (Ok(head), Ok(upstream)) = (head, upstream) {
                if head.stdout.trim() == upstream.stdout.trim() {
                    ctx.log.info("already up to date");
                    return Ok(TaskResult::Ok);
                }
            }
            ctx.log.dry_run("git pull --ff-only");
            return Ok(TaskResult::DryRun);
        }

        ctx.log.debug(&format!("pulling in {}", root.display()));
        match ctx.executor.run_in(&root, "git", &["pull", "--ff-only"]) {
            Ok(result) => {
                let output = result.stdout.trim();
                ctx.log.debug(&format!("git pull: {output}"));
                if output.contains("Already up to date") {
                    ctx.log.info("already up to date");
                } else {
                    self.signal.mark_refreshed();
                    ctx.log.info("repository updated");
                }
                Ok(TaskResult::Ok)
            }
            Err(e) => {
                // An unreachable remote must not block local reconciliation.
                ctx.log.warn(&format!("git pull failed: {e:#}"));
                Ok(TaskResult::Skipped("git pull failed".to_string()))
            }
        }
    }
}
