//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Multibuild - Build every keyboard firmware in parallel
#[derive(Parser)]
#[command(name = "multibuild")]
#[command(about = "Multibuild - Build many keyboard firmwares in parallel through one generated Makefile")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to multibuild.toml (default: searched upward from the firmware root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Firmware root directory (default: directory of multibuild.toml, else cwd)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options that select which keyboards are built.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Only keyboards whose rules.mk sets KEY to VALUE (repeatable, case-insensitive)
    #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Only split keyboards (same as -f SPLIT_KEYBOARD=yes)
    #[arg(long)]
    pub split: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every selected keyboard
    Build {
        #[command(flatten)]
        select: SelectArgs,

        /// Number of keyboards built in parallel
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Run `make clean` before building
        #[arg(short, long)]
        clean: bool,

        /// Keymap to compile for every keyboard
        #[arg(short, long)]
        keymap: Option<String>,

        /// make executable (default: $MAKE, gmake, make)
        #[arg(long)]
        make: Option<String>,

        /// Print status lines without color
        #[arg(long)]
        no_color: bool,
    },

    /// Write the build plan without running it
    Plan {
        #[command(flatten)]
        select: SelectArgs,

        /// Keymap to compile for every keyboard
        #[arg(short, long)]
        keymap: Option<String>,

        /// Print status lines without color
        #[arg(long)]
        no_color: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the selected keyboards
    List {
        #[command(flatten)]
        select: SelectArgs,
    },
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise multibuild logs at `info`, or
/// `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "multibuild=debug" } else { "multibuild=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Ignore a subscriber installed earlier in the process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match cli.command {
        Commands::Build { select, jobs, clean, keymap, make, no_color } => {
            build::run_build(&cli.global, &select, jobs, clean, keymap, make, no_color)
        }
        Commands::Plan { select, keymap, no_color, json } => {
            build::run_plan(&cli.global, &select, keymap, no_color, json)
        }
        Commands::List { select } => build::run_list(&cli.global, &select),
    }
}
