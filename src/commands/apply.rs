//! The `apply` subcommand: bring the machine to the declared state.

use std::sync::Arc;

use anyhow::Result;

use super::{run_to_summary, CommandSetup};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::logging::Logger;
use crate::tasks::{self, Task};

pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let tasks = filter_tasks(tasks::all_apply_tasks(&setup.profile), &opts.skip, &opts.only);
    if tasks.is_empty() {
        log.warn("no tasks match the given filter");
        return Ok(());
    }
    run_to_summary(&tasks, &setup.context, log)
}

/// Apply `--only` and `--skip` name filters; `--only` takes precedence.
///
/// Matching is a case-insensitive substring test against the task name, so
/// `--only pack` selects "Install packages". Prerequisites filtered away
/// here count as satisfied for whatever remains.
fn filter_tasks(
    tasks: Vec<Box<dyn Task>>,
    skip: &[String],
    only: &[String],
) -> Vec<Box<dyn Task>> {
    let matches = |task: &dyn Task, needles: &[String]| {
        let name = task.name().to_lowercase();
        needles.iter().any(|n| name.contains(&n.to_lowercase()))
    };

    if !only.is_empty() {
        return tasks
            .into_iter()
            .filter(|t| matches(t.as_ref(), only))
            .collect();
    }
    tasks
        .into_iter()
        .filter(|t| !matches(t.as_ref(), skip))
        .collect()
}
