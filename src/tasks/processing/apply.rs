//! Per-resource decision table of the reconciliation loop.

use anyhow::Result;

use super::{ProcessOpts, TaskStats};
use crate::logging::DiagEvent;
use crate::resources::{Applicable, ResourceChange, ResourceState};
use crate::tasks::Context;

/// Route one resource through the decision table, returning a stats delta.
pub(super) fn process_single<R: Applicable>(
    ctx: &Context,
    resource: &R,
    observed: ResourceState,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    if let Some(diag) = ctx.log.diagnostic() {
        diag.emit(
            DiagEvent::ResourceCheck,
            &format!("{desc} state={observed:?}"),
        );
    }
    let mut delta = TaskStats::new();
    match observed {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            delta.already_ok += 1;
        }
        ResourceState::Invalid { reason } => {
            // Invalid resources are surfaced even without verbose output.
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            delta.skipped += 1;
        }
        ResourceState::Missing if !opts.fix_missing => {
            delta.skipped += 1;
        }
        ResourceState::Incorrect { .. } if !opts.fix_incorrect => {
            ctx.log.debug(&format!("skipping {desc} (unexpected state)"));
            delta.skipped += 1;
        }
        observed @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if ctx.dry_run {
                let msg = if let ResourceState::Incorrect { ref observed } = observed {
                    format!("would {} {desc} (currently {observed})", opts.verb)
                } else {
                    format!("would {}: {desc}", opts.verb)
                };
                ctx.log.dry_run(&msg);
                delta.changed += 1;
                return Ok(delta);
            }
            delta += apply_resource(ctx, resource, opts)?;
        }
    }
    Ok(delta)
}

/// Apply one resource and translate the outcome into a stats delta.
pub(super) fn apply_resource<R: Applicable>(
    ctx: &Context,
    resource: &R,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    if let Some(diag) = ctx.log.diagnostic() {
        diag.emit(DiagEvent::ResourceApply, &format!("{} {desc}", opts.verb));
    }
    let mut delta = TaskStats::new();
    let change = match resource.apply() {
        Ok(change) => change,
        Err(e) => {
            if let Some(diag) = ctx.log.diagnostic() {
                diag.emit(DiagEvent::ResourceResult, &format!("{desc} error: {e}"));
            }
            if opts.bail_on_error {
                return Err(e);
            }
            ctx.log.warn(&format!("failed to {} {desc}: {e}", opts.verb));
            delta.skipped += 1;
            return Ok(delta);
        }
    };

    match change {
        ResourceChange::Applied => {
            if let Some(diag) = ctx.log.diagnostic() {
                diag.emit(DiagEvent::ResourceResult, &format!("{desc} applied"));
            }
            ctx.log.debug(&format!("{}: {desc}", opts.verb));
            delta.changed += 1;
        }
        ResourceChange::AlreadyCorrect => {
            if let Some(diag) = ctx.log.diagnostic() {
                diag.emit(DiagEvent::ResourceResult, &format!("{desc} already correct"));
            }
            delta.already_ok += 1;
        }
        ResourceChange::Skipped { reason } => {
            if let Some(diag) = ctx.log.diagnostic() {
                diag.emit(
                    DiagEvent::ResourceResult,
                    &format!("{desc} skipped: {reason}"),
                );
            }
            if opts.bail_on_error {
                anyhow::bail!("failed to {} {desc}: {reason}", opts.verb);
            }
            ctx.log
                .warn(&format!("failed to {} {desc}: {reason}", opts.verb));
            delta.skipped += 1;
        }
    }
    Ok(delta)
}

/// Remove one resource if it is ours, returning a stats delta.
pub(super) fn remove_single<R: Applicable>(
    ctx: &Context,
    resource: &R,
    observed: &ResourceState,
    verb: &str,
) -> Result<TaskStats> {
    let desc = resource.description();
    let mut delta = TaskStats::new();
    if matches!(observed, ResourceState::Correct) {
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would {verb}: {desc}"));
            delta.changed += 1;
            return Ok(delta);
        }
        if let Some(diag) = ctx.log.diagnostic() {
            diag.emit(DiagEvent::ResourceRemove, &format!("{verb} {desc}"));
        }
        resource.remove()?;
        if let Some(diag) = ctx.log.diagnostic() {
            diag.emit(DiagEvent::ResourceResult, &format!("{desc} removed"));
        }
        ctx.log.debug(&format!("{verb}: {desc}"));
        delta.changed += 1;
    } else {
        ctx.log
            .debug(&format!("skipping {desc}: not ours or already gone"));
        delta.skipped += 1;
    }
    Ok(delta)
}
