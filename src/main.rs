//! Multibuild - Command-line tool for building keyboard firmwares in parallel

use std::process::ExitCode;

use multibuild::cli;

fn main() -> ExitCode {
    cli::run()
}
