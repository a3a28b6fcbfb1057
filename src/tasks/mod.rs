//! Named, dependency-ordered units of work.
//!
//! Each task drives a batch of resources through the reconciliation loop in
//! [`processing`]. Tasks declare prerequisites by concrete type, never by
//! string name, so a renamed task can never silently orphan a dependency.

mod context;
pub(crate) mod graph;
pub mod links;
pub mod packages;
pub mod permissions;
mod processing;
pub mod refresh;
pub mod registry;
pub mod reload;
pub mod services;
pub mod sync;

pub use context::Context;
pub use processing::{
    process_resource_states, process_resources, process_resources_remove, ProcessOpts,
    TaskResult, TaskStats,
};
pub use refresh::RefreshSignal;

use std::any::TypeId;

use anyhow::Result;

use crate::config::profiles::Profile;
use crate::logging::TaskStatus;

/// A named, schedulable unit of work.
///
/// The `'static` bound gives every concrete task struct a stable [`TypeId`],
/// which is both its identity and the currency of dependency declarations.
pub trait Task: Send + Sync + 'static {
    /// Human-readable name, shown in stage headers and the summary.
    fn name(&self) -> &str;

    /// Identity of this task. The default is right for every concrete
    /// (non-generic) task struct.
    fn task_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Tasks that must complete before this one starts, as the `TypeId`s of
    /// their concrete structs. Defaults to none.
    fn dependencies(&self) -> Vec<TypeId> {
        Vec::new()
    }

    /// Whether the task applies on this platform and profile.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Do the work.
    ///
    /// # Errors
    ///
    /// Returns an error when the work fails in a way the summary should
    /// count as a task failure.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// The tasks run by `apply` (and, in forced dry-run, by `verify`).
///
/// Order in this list is the registration order: the scheduler derives the
/// execution order from dependencies and uses the list position only as a
/// deterministic tie break.
#[must_use]
pub fn all_apply_tasks(profile: &Profile) -> Vec<Box<dyn Task>> {
    let signal = RefreshSignal::new();
    vec![
        Box::new(sync::SyncRepository::new(signal.clone())),
        Box::new(reload::ReloadConfig::new(signal, profile.clone())),
        Box::new(packages::InstallPackages),
        Box::new(links::ApplyLinks),
        Box::new(permissions::ApplyPermissions),
        Box::new(services::EnableServices),
        Box::new(registry::ApplyRegistry),
    ]
}

/// The tasks run by `remove`.
#[must_use]
pub fn all_remove_tasks() -> Vec<Box<dyn Task>> {
    vec![Box::new(links::RemoveLinks)]
}

/// Run one task through the uniform wrapper: applicability check, stage
/// header, run, classification, exactly one summary record.
///
/// Returns the status that was recorded so the scheduler can decide the
/// fate of dependents.
pub fn execute(task: &dyn Task, ctx: &Context) -> TaskStatus {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return TaskStatus::NotApplicable;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
            TaskStatus::Ok
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
            TaskStatus::Skipped
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
            TaskStatus::DryRun
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            TaskStatus::Failed
        }
    }
}
