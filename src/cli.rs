//! Command-line argument definitions.
use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the machine-configuration engine.
#[derive(Parser, Debug)]
#[command(
    name = "converge",
    about = "Declarative local machine-configuration engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (debug lines on the terminal)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Profile to use (defaults to a platform-derived choice)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Preview changes without applying them
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Override the configuration repository root
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Disable parallel execution (enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the machine to the declared state
    Apply(ApplyOpts),
    /// Undo previously applied configuration items
    Remove(RemoveOpts),
    /// Validate the configuration repository without changing anything
    Verify(VerifyOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Short name used for the per-command log files.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::Remove(_) => "remove",
            Self::Verify(_) => "verify",
            Self::Version => "version",
        }
    }
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// Skip tasks whose name contains any of these strings
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only tasks whose name contains any of these strings
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `remove` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RemoveOpts {}

/// Options for the `verify` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VerifyOpts {}
