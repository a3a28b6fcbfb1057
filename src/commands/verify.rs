//! The `verify` subcommand: report drift without changing anything.
//!
//! Runs the same task set as `apply` with dry-run forced on, so every
//! resource is probed and every pending change is previewed, but nothing
//! on the machine moves.

use std::sync::Arc;

use anyhow::Result;

use super::{run_to_summary, CommandSetup};
use crate::cli::{GlobalOpts, VerifyOpts};
use crate::logging::Logger;
use crate::tasks;

pub fn run(global: &GlobalOpts, _opts: &VerifyOpts, log: &Arc<Logger>) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    setup.context.dry_run = true;
    run_to_summary(
        &tasks::all_apply_tasks(&setup.profile),
        &setup.context,
        log,
    )
}
