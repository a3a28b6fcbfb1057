//! Symlink reconciliation tasks.

use std::any::TypeId;

use anyhow::Result;

use super::{
    process_resources, process_resources_remove, Context, ProcessOpts, Task, TaskResult,
};
use crate::resources::link::LinkResource;

fn link_resources(ctx: &Context) -> Vec<LinkResource> {
    let links_dir = ctx.links_dir();
    ctx.config_read()
        .links
        .iter()
        .map(|link| {
            LinkResource::new(
                links_dir.join(&link.source),
                ctx.home.join(link.target_rel()),
            )
        })
        .collect()
}

/// Link every declared source into `$HOME`.
pub struct ApplyLinks;

impl Task for ApplyLinks {
    fn name(&self) -> &'static str {
        "Apply links"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![TypeId::of::<super::reload::ReloadConfig>()]
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config_read().links.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, link_resources(ctx), &ProcessOpts::apply_all("link"))
    }
}

/// Undo [`ApplyLinks`], leaving the content materialised in place.
pub struct RemoveLinks;

impl Task for RemoveLinks {
    fn name(&self) -> &'static str {
        "Remove links"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config_read().links.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources_remove(ctx, link_resources(ctx), "unlink")
    }
}
