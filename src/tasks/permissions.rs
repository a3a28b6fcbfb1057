//! Permission-bit reconciliation task.

use std::any::TypeId;

use anyhow::Result;

use super::{process_resources, Context, ProcessOpts, Task, TaskResult};
use crate::platform::Os;
use crate::resources::mode::ModeResource;

/// Set declared permission bits on files under `$HOME`.
///
/// Declared paths are home-relative so linked targets can be tightened
/// right after [`super::links::ApplyLinks`] placed them.
pub struct ApplyPermissions;

impl Task for ApplyPermissions {
    fn name(&self) -> &'static str {
        "Apply permissions"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![
            TypeId::of::<super::reload::ReloadConfig>(),
            TypeId::of::<super::links::ApplyLinks>(),
        ]
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.os == Os::Linux && !ctx.config_read().permissions.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resources: Vec<ModeResource> = ctx
            .config_read()
            .permissions
            .iter()
            .map(|p| ModeResource::new(ctx.home.join(&p.path), p.mode.clone()))
            .collect();
        // Absent targets classify as Invalid and are skipped, so a profile
        // that never linked the file does not fail here.
        process_resources(ctx, resources, &ProcessOpts::apply_all("chmod"))
    }
}
