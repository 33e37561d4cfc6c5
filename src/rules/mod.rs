//! Per-keyboard build attributes.
//!
//! Every keyboard declares its build configuration as `KEY = value`
//! assignments in `rules.mk` files. The [`ConfigStore`] trait is how the
//! filter engine asks for those attributes; [`RulesMkStore`] reads them from
//! a firmware tree and [`MemoryStore`] serves them from memory.

pub mod parser;
pub mod store;

pub use parser::*;
pub use store::*;

use crate::build::Target;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;

/// Declared build attributes of one target. A missing key means "unset".
pub type AttributeMap = BTreeMap<String, String>;

/// Error while reading a target's attributes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A rules file exists but could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Source of declared build attributes.
pub trait ConfigStore {
    /// Return the attributes declared for `target`.
    fn attributes(&self, target: &Target) -> Result<AttributeMap, StoreError>;
}

/// Attribute store backed by an in-memory map.
///
/// Targets without an entry have no attributes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<Target, AttributeMap>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one attribute for a target.
    pub fn set(
        &mut self,
        target: impl Into<Target>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.entries.entry(target.into()).or_default().insert(key.into(), value.into());
        self
    }

    /// Builder form of [`MemoryStore::set`].
    pub fn with(
        mut self,
        target: impl Into<Target>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set(target, key, value);
        self
    }
}

impl ConfigStore for MemoryStore {
    fn attributes(&self, target: &Target) -> Result<AttributeMap, StoreError> {
        Ok(self.entries.get(target).cloned().unwrap_or_default())
    }
}
