//! Per-target outcome classification.
//!
//! A target's outcome is read from its build log: the sub-make prints
//! `[ERRORS]` or `[WARNINGS]` next to the compile steps that produced them.
//! The markers are checked in a fixed order and the first one found wins.

use serde::Serialize;
use std::fmt;

/// Width of the target column in status lines.
pub const STATUS_WIDTH: usize = 64;

/// Classification of a finished target build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Log contains `[ERRORS]`
    Errors,
    /// Log contains `[WARNINGS]` but no errors
    Warnings,
    /// Neither marker found
    Ok,
}

impl Outcome {
    /// Outcomes in the order they are tested; the last one always matches.
    pub const PRECEDENCE: [Outcome; 3] = [Outcome::Errors, Outcome::Warnings, Outcome::Ok];

    /// Classify build log text.
    pub fn classify(log: &str) -> Self {
        Self::PRECEDENCE
            .into_iter()
            .find(|outcome| outcome.marker().map_or(true, |marker| log.contains(marker)))
            .unwrap_or(Outcome::Ok)
    }

    /// Literal text searched for in the log, `None` for the fallback.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Outcome::Errors => Some("[ERRORS]"),
            Outcome::Warnings => Some("[WARNINGS]"),
            Outcome::Ok => None,
        }
    }

    /// Label printed in the status line.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Errors => "[ERRORS]",
            Outcome::Warnings => "[WARNINGS]",
            Outcome::Ok => "[OK]",
        }
    }

    /// SGR parameters for the label: bold red, yellow or green.
    pub fn sgr(&self) -> &'static str {
        match self {
            Outcome::Errors => "1;31",
            Outcome::Warnings => "1;33",
            Outcome::Ok => "1;32",
        }
    }

    /// `printf` format string of the status line for this outcome.
    ///
    /// Takes the target name as its single `%s` argument. Colors use octal
    /// escapes so any POSIX `printf` renders them.
    pub fn status_format(&self, color: bool) -> String {
        let label = if color {
            format!("\\033[{}m{}\\033[0m", self.sgr(), self.label())
        } else {
            self.label().to_string()
        };
        format!("Build %-{}s {}\\n", STATUS_WIDTH, label)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Errors => write!(f, "errors"),
            Outcome::Warnings => write!(f, "warnings"),
            Outcome::Ok => write!(f, "ok"),
        }
    }
}
