//! Rayon-backed parallel batches for the reconciliation loop.

use std::sync::Mutex;

use anyhow::Result;

use super::apply::{process_single, remove_single};
use super::{ProcessOpts, TaskResult, TaskStats};
use crate::logging::{diag_thread_name, set_diag_thread_name};
use crate::resources::{Applicable, Resource, ResourceState};
use crate::tasks::Context;

pub(super) fn process_resources_parallel<R: Resource + Send>(
    ctx: &Context,
    resources: Vec<R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resources, opts, |resource| {
        let observed = resource.current_state()?;
        Ok((resource, observed))
    })
}

pub(super) fn process_resource_states_parallel<R: Applicable + Send>(
    ctx: &Context,
    resource_states: Vec<(R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resource_states, opts, Ok)
}

pub(super) fn process_remove_parallel<R: Resource + Send>(
    ctx: &Context,
    resources: Vec<R>,
    verb: &str,
) -> Result<TaskResult> {
    let stats = collect_parallel_stats(resources, |resource| {
        let observed = resource.current_state()?;
        remove_single(ctx, &resource, &observed, verb)
    })?;
    Ok(stats.finish(ctx))
}

/// Fan `work` out over Rayon and sum the per-item stats deltas.
///
/// The lock guards only the counter update; probes and mutations run
/// unlocked so items genuinely proceed concurrently. The diagnostic thread
/// name is captured up front and re-set per item, since Rayon reuses
/// worker threads across unrelated batches.
fn collect_parallel_stats<T: Send>(
    items: Vec<T>,
    work: impl Fn(T) -> Result<TaskStats> + Sync + Send,
) -> Result<TaskStats> {
    use rayon::prelude::*;
    let task_name = diag_thread_name();
    let stats = Mutex::new(TaskStats::new());
    items.into_par_iter().try_for_each(|item| -> Result<()> {
        set_diag_thread_name(&task_name);
        let delta = work(item)?;
        *stats
            .lock()
            .map_err(|e| anyhow::anyhow!("stats mutex poisoned: {e}"))? += delta;
        Ok(())
    })?;
    Ok(stats
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner))
}

fn run_parallel<T: Send, R: Applicable + Send>(
    ctx: &Context,
    items: Vec<T>,
    opts: &ProcessOpts,
    classify: impl Fn(T) -> Result<(R, ResourceState)> + Sync,
) -> Result<TaskResult> {
    let stats = collect_parallel_stats(items, |item| {
        let (resource, observed) = classify(item)?;
        process_single(ctx, &resource, observed, opts)
    })?;
    Ok(stats.finish(ctx))
}
