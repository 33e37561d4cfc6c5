//! Build target definitions.
//!
//! A target is one keyboard in the firmware tree, named by its
//! slash-separated path below the keyboards directory (e.g. `planck/rev6`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Character substituted for `/` when deriving a [`SafeId`].
pub const SAFE_ID_SEPARATOR: char = '+';

/// Punctuation allowed in identifiers besides ASCII letters and digits.
///
/// Everything else is either special in a Makefile rule line (`:`, `|`,
/// `%`, `&`, wildcards, archive parentheses) or inside a double-quoted shell
/// word.
const ALLOWED_PUNCTUATION: &[char] = &['_', '-', '.', '/', SAFE_ID_SEPARATOR];

/// A buildable keyboard identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// Create a target from its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as given.
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Path components of the identifier.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|p| !p.is_empty())
    }

    /// Filesystem and rule-name safe rendering of this target.
    pub fn safe_id(&self) -> SafeId {
        SafeId(self.0.replace('/', &SAFE_ID_SEPARATOR.to_string()))
    }

    /// Check that the identifier can be embedded in a generated Makefile.
    ///
    /// Only ASCII letters, digits and `_ - . / +` are accepted. Returns the
    /// first offending character, if any.
    pub fn invalid_char(&self) -> Option<char> {
        self.0.chars().find(|c| !c.is_ascii_alphanumeric() && !ALLOWED_PUNCTUATION.contains(c))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Target identifier with path separators replaced, used for rule names,
/// log files and failure markers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeId(String);

impl SafeId {
    /// The safe identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
