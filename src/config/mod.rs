//! Configuration module for multibuild
//!
//! Provides types, discovery and parsing for `multibuild.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
