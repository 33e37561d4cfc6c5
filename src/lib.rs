//! Multibuild - Library for building many keyboard firmwares in parallel
//!
//! This library provides functionality to:
//! - Discover keyboards and read their `rules.mk` attributes
//! - Narrow the keyboard set with `KEY=value` filters
//! - Generate a Makefile that builds every keyboard under `make -j`
//! - Classify each build from its log as errors, warnings or ok

pub mod build;
pub mod cli;
pub mod config;
pub mod rules;
