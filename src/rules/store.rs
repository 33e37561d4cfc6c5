//! Attribute store backed by a firmware tree's `rules.mk` files.

use super::{parse_rules_mk, AttributeMap, ConfigStore, StoreError};
use crate::build::Target;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// File name holding a keyboard's build rules.
pub const RULES_FILE_NAME: &str = "rules.mk";

/// Reads attributes by layering every `rules.mk` along a keyboard's path.
///
/// For `handwired/split/rev1` the files are read in this order, later ones
/// overriding earlier ones:
///
/// ```text
/// keyboards/handwired/rules.mk
/// keyboards/handwired/split/rules.mk
/// keyboards/handwired/split/rev1/rules.mk
/// ```
#[derive(Debug, Clone)]
pub struct RulesMkStore {
    keyboards_dir: PathBuf,
}

impl RulesMkStore {
    /// Create a store rooted at the keyboards directory.
    pub fn new(keyboards_dir: impl Into<PathBuf>) -> Self {
        Self { keyboards_dir: keyboards_dir.into() }
    }

    /// The keyboards directory this store reads from.
    pub fn keyboards_dir(&self) -> &Path {
        &self.keyboards_dir
    }

    /// Rules files for a target, outermost first.
    pub fn rules_files(&self, target: &Target) -> Vec<PathBuf> {
        let mut dir = self.keyboards_dir.clone();
        target
            .parts()
            .map(|part| {
                dir.push(part);
                dir.join(RULES_FILE_NAME)
            })
            .collect()
    }
}

impl ConfigStore for RulesMkStore {
    fn attributes(&self, target: &Target) -> Result<AttributeMap, StoreError> {
        let mut attrs = AttributeMap::new();

        for path in self.rules_files(target) {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Io { path, source }),
            };
            trace!(file = %path.display(), "layering rules file");
            parse_rules_mk(&contents, &mut attrs);
        }

        Ok(attrs)
    }
}
