//! Keyboard discovery for the build system.
//!
//! Every directory below the keyboards directory that carries a `rules.mk`
//! is a buildable target; keymap directories are not.

use crate::build::Target;
use crate::rules::RULES_FILE_NAME;
use glob::{glob, Pattern};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Error during target discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Keyboards directory does not exist
    #[error("Keyboards directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
}

/// Source of the full target universe.
pub trait TargetLister {
    /// Every known target, in no particular order.
    fn list_all(&self) -> Result<Vec<Target>, DiscoveryError>;
}

/// A fixed universe of targets.
impl TargetLister for Vec<Target> {
    fn list_all(&self) -> Result<Vec<Target>, DiscoveryError> {
        Ok(self.clone())
    }
}

/// Lists keyboards by scanning a keyboards directory for `rules.mk` files.
#[derive(Debug, Clone)]
pub struct KeyboardLister {
    keyboards_dir: PathBuf,
}

impl KeyboardLister {
    /// Create a lister rooted at the keyboards directory.
    pub fn new(keyboards_dir: impl Into<PathBuf>) -> Self {
        Self { keyboards_dir: keyboards_dir.into() }
    }
}

impl TargetLister for KeyboardLister {
    fn list_all(&self) -> Result<Vec<Target>, DiscoveryError> {
        discover_keyboards(&self.keyboards_dir)
    }
}

/// Discover all keyboards below `keyboards_dir`.
///
/// # Returns
/// Sorted, de-duplicated keyboard identifiers such as `planck/rev6`.
pub fn discover_keyboards(keyboards_dir: &Path) -> Result<Vec<Target>, DiscoveryError> {
    if !keyboards_dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(keyboards_dir.to_path_buf()));
    }

    let base = Pattern::escape(&keyboards_dir.to_string_lossy());
    let pattern = format!("{}/**/{}", base, RULES_FILE_NAME);
    let paths = glob(&pattern).map_err(|e| DiscoveryError::InvalidPattern(pattern.clone(), e))?;

    let mut keyboards = BTreeSet::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if let Some(target) = keyboard_name(keyboards_dir, &path) {
                    keyboards.insert(target);
                }
            }
            Err(e) => {
                // Log but continue on unreadable entries
                warn!(error = %e, "skipping unreadable path during discovery");
            }
        }
    }

    debug!(count = keyboards.len(), dir = %keyboards_dir.display(), "discovered keyboards");
    Ok(keyboards.into_iter().collect())
}

/// Derive the keyboard identifier for a `rules.mk` path.
///
/// Returns `None` for rules files inside keymap directories and for a rules
/// file sitting directly in the keyboards directory.
fn keyboard_name(keyboards_dir: &Path, rules_path: &Path) -> Option<Target> {
    if !rules_path.is_file() {
        return None;
    }

    let relative = rules_path.parent()?.strip_prefix(keyboards_dir).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str()?;
                if part == "keymaps" {
                    return None;
                }
                parts.push(part);
            }
            _ => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(Target::new(parts.join("/")))
}
