//! Build pipeline module for multibuild
//!
//! Compiles many keyboard firmwares in one parallel `make` invocation.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find keyboards by their `rules.mk` files
//! - **Filtering**: Keep targets whose attributes match `KEY=value` filters
//! - **Planning**: Create a build plan with one rule per target and write it
//!   as a Makefile
//! - **Execution**: Hand the plan to `make -j N`
//!
//! # Example
//!
//! ```ignore
//! use multibuild::build::{BuildContext, BuildPipeline, KeyboardLister, MakeExecutor};
//! use multibuild::rules::RulesMkStore;
//!
//! let context = BuildContext::new(config, project_root).with_filters(["SPLIT_KEYBOARD=yes"]);
//! let lister = KeyboardLister::new(context.keyboards_dir());
//! let store = RulesMkStore::new(context.keyboards_dir());
//! let executor = MakeExecutor::from_context(&context, find_make());
//!
//! let outcome = BuildPipeline::new(&context, &lister, &store, &executor).run()?;
//! ```

pub mod context;
pub mod discovery;
pub mod executor;
pub mod filter;
pub mod makefile;
pub mod outcome;
pub mod pipeline;
pub mod plan;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use executor::*;
pub use filter::*;
pub use outcome::*;
pub use pipeline::*;
pub use plan::*;
pub use target::*;
