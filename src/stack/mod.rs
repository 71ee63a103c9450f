//! Runtime and framework descriptions used by discovery.
//!
//! Runtimes are registered behind the [`Runtime`] trait in a [`RuntimeRegistry`];
//! frameworks are plain data ([`FrameworkSpec`]) loaded from a catalog and
//! narrowed by [`match_framework`].
//!
//! # Example
//!
//! ```no_run
//! use appcompose::fs::RealFileSystem;
//! use appcompose::stack::{FrameworkCatalog, RuntimeRegistry};
//! use appcompose::stack::runtime::DiscoveryContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = RealFileSystem::new("./my-app");
//! let catalog = FrameworkCatalog::builtin()?;
//! let registry = RuntimeRegistry::with_defaults();
//! let ctx = DiscoveryContext::default();
//!
//! let spec = appcompose::discovery::discover(&fs, &catalog, &registry, &ctx)?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod id_enum_macro;

pub mod framework;
pub mod runtime;
pub mod runtime_id;

use std::collections::BTreeMap;

pub use framework::{
    match_framework, Command, FrameworkCatalog, FrameworkHooks, FrameworkSpec, LifecycleCommands,
    Phase, RequiredFile,
};
pub use runtime::{Runtime, RuntimeRegistry, RuntimeSpec};
pub use runtime_id::RuntimeId;

/// Resolved dependency name to version (or version range) map
pub type DependencyMap = BTreeMap<String, String>;
