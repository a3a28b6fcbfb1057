//! The `remove` subcommand: undo previously applied configuration.

use std::sync::Arc;

use anyhow::Result;

use super::{run_to_summary, CommandSetup};
use crate::cli::{GlobalOpts, RemoveOpts};
use crate::logging::Logger;
use crate::tasks;

pub fn run(global: &GlobalOpts, _opts: &RemoveOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    run_to_summary(&tasks::all_remove_tasks(), &setup.context, log)
}
