//! Dependency-aware task execution.
//!
//! Tasks run in parallel on a bounded worker pool when the context allows
//! it, otherwise sequentially in topological order. Either way a failed
//! task poisons its transitive dependents, which are recorded as never run
//! rather than silently skipped, and the run always reaches the summary.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::logging::{set_diag_thread_name, BufferedLog, DiagEvent, Logger, TaskStatus};
use crate::tasks::{execute, graph, Context, Task};

/// Execution state of one task slot.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Pending,
    Running,
    Done(TaskStatus),
}

impl Slot {
    const fn is_done(self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Whether a dependent of this task must never run.
    const fn poisons_dependents(self) -> bool {
        matches!(self, Self::Done(TaskStatus::Failed | TaskStatus::NeverRun))
    }
}

/// Run the whole task list to completion.
///
/// Failures are recorded in the logger rather than returned; the caller
/// reads the failure count after the summary.
pub(crate) fn run_tasks(tasks: &[Box<dyn Task>], ctx: &Context, log: &Arc<Logger>) {
    let refs: Vec<&dyn Task> = tasks.iter().map(AsRef::as_ref).collect();

    if let Some(idx) = graph::find_cycle(&refs) {
        let name = refs.get(idx).map_or("?", |t| t.name());
        log.warn(&format!(
            "dependency cycle involving '{name}'; running tasks in registration order"
        ));
        for task in &refs {
            execute(*task, ctx);
        }
        return;
    }

    if ctx.parallel && refs.len() > 1 {
        run_parallel(&refs, ctx, log);
    } else {
        run_sequential(&refs, ctx, log);
    }
}

/// One task at a time, in topological order.
fn run_sequential(tasks: &[&dyn Task], ctx: &Context, log: &Arc<Logger>) {
    let deps = graph::resolved_deps(tasks);
    let mut slots = vec![Slot::Pending; tasks.len()];

    for idx in graph::topological_order(tasks) {
        let Some(task) = tasks.get(idx) else {
            continue;
        };
        if let Some(dep) = poisoning_dep(idx, &deps, &slots) {
            mark_never_run(*task, tasks, dep, log);
            if let Some(slot) = slots.get_mut(idx) {
                *slot = Slot::Done(TaskStatus::NeverRun);
            }
            continue;
        }
        let status = execute(*task, ctx);
        if let Some(slot) = slots.get_mut(idx) {
            *slot = Slot::Done(status);
        }
    }
}

/// Bounded worker pool over a shared slot table.
///
/// Workers claim the lowest-index pending task whose prerequisites are all
/// terminal; the condvar wakes everyone whenever a slot changes, so a
/// completion immediately unblocks waiting dependents.
fn run_parallel(tasks: &[&dyn Task], ctx: &Context, log: &Arc<Logger>) {
    let workers = thread::available_parallelism()
        .map_or(2, std::num::NonZeroUsize::get)
        .clamp(2, tasks.len());
    log.debug(&format!(
        "running {} tasks on {workers} workers",
        tasks.len()
    ));

    let deps = graph::resolved_deps(tasks);
    let state = Mutex::new(vec![Slot::Pending; tasks.len()]);
    let wake = Condvar::new();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| worker_loop(tasks, &deps, &state, &wake, ctx, log));
        }
    });
}

fn worker_loop(
    tasks: &[&dyn Task],
    deps: &[Vec<usize>],
    state: &Mutex<Vec<Slot>>,
    wake: &Condvar,
    ctx: &Context,
    log: &Arc<Logger>,
) {
    loop {
        let idx = {
            let mut slots = state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            loop {
                if slots.iter().all(|s| s.is_done()) {
                    return;
                }
                match claim_next(tasks, deps, &mut slots, log) {
                    Claim::Run(idx) => break idx,
                    // A poisoned dependent was marked; rescan, others may
                    // have become claimable.
                    Claim::Marked => wake.notify_all(),
                    Claim::Wait => {
                        if let Some(diag) = log.diagnostic() {
                            diag.emit(
                                DiagEvent::TaskWait,
                                "no runnable task; waiting for a completion",
                            );
                        }
                        slots = wake
                            .wait(slots)
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                    }
                }
            }
        };

        let Some(task) = tasks.get(idx) else {
            return;
        };
        let status = run_buffered(*task, ctx, log);

        let mut slots = state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(idx) {
            *slot = Slot::Done(status);
        }
        wake.notify_all();
    }
}

enum Claim {
    /// This index is ours to execute.
    Run(usize),
    /// A task was resolved without running; scan again.
    Marked,
    /// Nothing claimable until another task completes.
    Wait,
}

/// Claim the lowest-index pending task whose prerequisites are terminal.
///
/// Caller holds the slot lock.
fn claim_next(
    tasks: &[&dyn Task],
    deps: &[Vec<usize>],
    slots: &mut [Slot],
    log: &Arc<Logger>,
) -> Claim {
    for idx in 0..slots.len() {
        if slots.get(idx) != Some(&Slot::Pending) {
            continue;
        }
        let ready = deps
            .get(idx)
            .is_some_and(|d| d.iter().all(|&dep| slots.get(dep).copied().is_some_and(Slot::is_done)));
        if !ready {
            continue;
        }
        if let Some(dep) = poisoning_dep(idx, deps, slots) {
            if let Some(task) = tasks.get(idx) {
                mark_never_run(*task, tasks, dep, log);
            }
            if let Some(slot) = slots.get_mut(idx) {
                *slot = Slot::Done(TaskStatus::NeverRun);
            }
            return Claim::Marked;
        }
        if let Some(slot) = slots.get_mut(idx) {
            *slot = Slot::Running;
        }
        return Claim::Run(idx);
    }
    Claim::Wait
}

/// First prerequisite whose outcome forbids this task from running.
fn poisoning_dep(idx: usize, deps: &[Vec<usize>], slots: &[Slot]) -> Option<usize> {
    deps.get(idx)?
        .iter()
        .copied()
        .find(|&dep| slots.get(dep).is_some_and(|s| s.poisons_dependents()))
}

/// Record a task as never run because of a failed prerequisite.
fn mark_never_run(task: &dyn Task, tasks: &[&dyn Task], dep: usize, log: &Arc<Logger>) {
    let dep_name = tasks.get(dep).map_or("?", |t| t.name());
    let message = format!("prerequisite failed: {dep_name}");
    if let Some(diag) = log.diagnostic() {
        diag.emit_task(DiagEvent::TaskSkip, task.name(), &message);
    }
    log.record_task(task.name(), TaskStatus::NeverRun, Some(&message));
}

/// Execute one task with its output buffered, then replay the buffer as a
/// single console block.
fn run_buffered(task: &dyn Task, ctx: &Context, log: &Arc<Logger>) -> TaskStatus {
    set_diag_thread_name(task.name());
    if let Some(diag) = log.diagnostic() {
        diag.emit_task(DiagEvent::TaskStart, task.name(), "starting");
    }
    log.notify_task_start(task.name());

    let buffer = Arc::new(BufferedLog::new(Arc::clone(log)));
    let task_ctx = ctx.with_log(Arc::clone(&buffer) as Arc<dyn crate::logging::Log>);
    let status = execute(task, &task_ctx);

    if let Some(diag) = log.diagnostic() {
        diag.emit_task(DiagEvent::TaskDone, task.name(), &format!("{status:?}"));
    }
    buffer.flush_and_complete(task.name());
    status
}
