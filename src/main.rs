use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use converge::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command_name = args.command.name();
    logging::init_subscriber(args.verbose, command_name);
    let log = Arc::new(logging::Logger::new(command_name));

    match args.command {
        cli::Command::Apply(opts) => commands::apply::run(&args.global, &opts, &log),
        cli::Command::Remove(opts) => commands::remove::run(&args.global, &opts, &log),
        cli::Command::Verify(opts) => commands::verify::run(&args.global, &opts, &log),
        cli::Command::Version => {
            println!("converge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
