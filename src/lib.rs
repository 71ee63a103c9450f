//! appcompose - runtime discovery and multi-stage build orchestration
//!
//! Given a codebase directory, appcompose identifies the runtime and web framework,
//! reconstructs the dependency set from lockfiles, derives install, build and run
//! commands, and drives them either on the host or as a multi-stage container build.
//! Between phases a deployment bundle ([`AppBundle`]) is passed through framework
//! hooks addressed by id.
//!
//! # Example Usage
//!
//! ```no_run
//! use appcompose::{ComposeConfig, Composer, DriverMode, RealFileSystem};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ComposeConfig::default();
//! let catalog = config.load_catalog()?;
//! let fs = RealFileSystem::new("./my-app");
//!
//! let bundle = Composer::new(config, catalog)
//!     .compose(DriverMode::Local, &fs)
//!     .await?;
//! println!("{}", bundle.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`stack`]: runtimes, framework catalog and matching
//! - [`discovery`]: picks the runtime for a codebase
//! - [`driver`]: local and container execution, Dockerfile pipeline model
//! - [`hooks`]: bundle transforms and the in-stage execution protocol
//! - [`compose`]: the end-to-end phase sequence

pub mod cli;
pub mod compose;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod fs;
pub mod hooks;
pub mod output;
pub mod stack;
pub mod util;

pub use compose::Composer;
pub use config::{ComposeConfig, ConfigError};
pub use discovery::{discover, discover_required};
pub use driver::{Driver, DriverMode};
pub use error::{ComposeError, DiscoveryKind};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use hooks::{Hook, HookRegistry};
pub use output::AppBundle;
pub use stack::{FrameworkCatalog, RuntimeRegistry, RuntimeSpec};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
