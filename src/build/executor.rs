//! Hand-off of a written plan to `make`.
//!
//! The executor owns the only blocking calls of a run: the optional
//! `make clean` and the `make -j N -f <plan> all` that builds every target.
//! Parallelism, scheduling and per-target failure handling all live inside
//! make and the plan; the executor only reports whether make itself ran.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{BuildContext, ROOT_RULE};

/// Executable tried on `PATH` before falling back to plain `make`.
pub const GNU_MAKE: &str = "gmake";

/// Fallback make executable.
pub const DEFAULT_MAKE: &str = "make";

/// Error while running make.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// make could not be started
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        /// Command line that was attempted
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// make exited with a non-zero status
    #[error("'{command}' exited with status {code}")]
    Failed {
        /// Command line that ran
        command: String,
        /// Exit status
        code: i32,
    },
    /// make was terminated by a signal
    #[error("'{command}' was terminated by a signal")]
    Terminated {
        /// Command line that ran
        command: String,
    },
}

/// Runs the clean step and the generated plan.
pub trait PlanExecutor {
    /// Remove previous build outputs.
    fn clean(&self) -> Result<(), ExecutorError>;

    /// Build the plan at `plan` with up to `jobs` rules in parallel.
    fn execute(&self, plan: &Path, jobs: usize) -> Result<(), ExecutorError>;
}

/// [`PlanExecutor`] backed by a make executable.
#[derive(Debug, Clone)]
pub struct MakeExecutor {
    make: String,
    root: PathBuf,
}

impl MakeExecutor {
    /// Create an executor running `make` inside `root`.
    pub fn new(make: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self { make: make.into(), root: root.into() }
    }

    /// Create an executor for a build context.
    ///
    /// Uses the configured make executable, or `default_make` when none is
    /// configured (usually the result of [`find_make`]).
    pub fn from_context(context: &BuildContext, default_make: impl Into<String>) -> Self {
        let make = context.make().map(String::from).unwrap_or_else(|| default_make.into());
        Self::new(make, context.project_root())
    }

    /// The make executable.
    pub fn make(&self) -> &str {
        &self.make
    }

    /// Directory make runs in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<ExitStatus, ExecutorError> {
        let command = self.describe(args);
        debug!(command = %command, dir = %self.root.display(), "running make");

        Command::new(&self.make)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ExecutorError::Spawn { command, source })
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut command = self.make.clone();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }
}

impl PlanExecutor for MakeExecutor {
    fn clean(&self) -> Result<(), ExecutorError> {
        info!("cleaning previous build outputs");
        let status = self.run(&["clean"])?;
        if !status.success() {
            warn!(status = %status, "make clean failed, continuing");
        }
        Ok(())
    }

    fn execute(&self, plan: &Path, jobs: usize) -> Result<(), ExecutorError> {
        let jobs = jobs.to_string();
        let plan = plan.to_string_lossy();
        let args = ["-j", jobs.as_str(), "-f", &*plan, ROOT_RULE];

        info!(jobs = %jobs, plan = %plan, "executing build plan");
        let status = self.run(&args)?;
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ExecutorError::Failed { command: self.describe(&args), code }),
            None => Err(ExecutorError::Terminated { command: self.describe(&args) }),
        }
    }
}

/// Pick the make executable from the environment.
///
/// `$MAKE` wins when set and non-empty, then `gmake` when it is on `PATH`,
/// then plain `make`.
pub fn find_make() -> String {
    find_make_in(env::var_os("MAKE"), env::var_os("PATH"))
}

fn find_make_in(make_var: Option<OsString>, path_var: Option<OsString>) -> String {
    if let Some(make) = make_var.filter(|m| !m.is_empty()) {
        return make.to_string_lossy().into_owned();
    }

    let has_gmake = path_var
        .map(|paths| env::split_paths(&paths).any(|dir| is_executable(&dir.join(GNU_MAKE))))
        .unwrap_or(false);
    if has_gmake {
        GNU_MAKE.to_string()
    } else {
        DEFAULT_MAKE.to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
