//! Systemd user-unit task.

use std::any::TypeId;

use anyhow::Result;

use super::{process_resources, Context, ProcessOpts, Task, TaskResult};
use crate::resources::service::ServiceUnitResource;

/// Enable (and start) every declared systemd user unit.
pub struct EnableServices;

impl Task for EnableServices {
    fn name(&self) -> &'static str {
        "Enable services"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![
            TypeId::of::<super::reload::ReloadConfig>(),
            // Unit files are often linked into ~/.config/systemd.
            TypeId::of::<super::links::ApplyLinks>(),
        ]
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.has_systemd
            && ctx.executor.which("systemctl")
            && !ctx.config_read().services.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.dry_run {
            // Newly linked unit files need a daemon reload to be visible.
            let _ = ctx
                .executor
                .run_unchecked("systemctl", &["--user", "daemon-reload"]);
        }

        let units = ctx.config_read().services.clone();
        let executor = ctx.executor.as_ref();
        let resources: Vec<ServiceUnitResource> = units
            .iter()
            .map(|s| ServiceUnitResource::new(s.unit.clone(), executor))
            .collect();

        process_resources(ctx, resources, &ProcessOpts::install_missing("enable"))
    }
}
