//! Configuration management for appcompose
//!
//! Settings load from environment variables with defaults; CLI flags override
//! individual fields afterwards.
//!
//! # Environment Variables
//!
//! - `APPCOMPOSE_ENGINE`: container engine binary - default: "docker"
//! - `APPCOMPOSE_SCRATCH_DIR`: hook request directory, absolute and outside the codebase - default: "<cache dir>/appcompose/adapters"
//! - `APPCOMPOSE_OUTPUT_DIR`: exported bundle directory, absolute and outside the codebase - default: "<cache dir>/appcompose/output"
//! - `APPCOMPOSE_IMAGE`: image reference to tag and push on export - no default
//! - `APPCOMPOSE_CATALOG`: framework catalog file (YAML or JSON) - no default
//! - `APPCOMPOSE_PROCESS_TIMEOUT`: per-process deadline in seconds, 0 disables - default: "0"
//! - `APPCOMPOSE_HOOK_RUNNER`: Linux `appcompose` binary mounted into hook stages - default: the running executable
//! - `APPCOMPOSE_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use appcompose::ComposeConfig;
//!
//! let config = ComposeConfig::default();
//! config.validate().expect("Invalid configuration");
//! let catalog = config.load_catalog().expect("catalog");
//! ```

use crate::error::ComposeError;
use crate::stack::FrameworkCatalog;
use std::env;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_ENGINE: &str = "docker";
const SCRATCH_SUBDIR: &str = "adapters";
const OUTPUT_SUBDIR: &str = "output";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_PROCESS_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// User catalog picked up from the config directory when no path is given
const USER_CATALOG_FILE: &str = "frameworks.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeConfig {
    /// Container engine binary
    pub engine: String,

    /// Host directory for hook requests, passed to the engine as a named build context
    pub scratch_dir: PathBuf,

    /// Host directory bundles are exported into
    pub output_dir: PathBuf,

    /// Image reference for export
    pub image: Option<String>,

    /// Framework catalog override
    pub catalog_path: Option<PathBuf>,

    /// Per-process deadline in seconds, 0 disables
    pub process_timeout_secs: u64,

    /// Binary bind-mounted into hook stages
    pub hook_runner: Option<PathBuf>,

    pub log_level: String,
}

impl Default for ComposeConfig {
    /// Loads from `APPCOMPOSE_*` variables, falling back to defaults
    fn default() -> Self {
        let engine = env::var("APPCOMPOSE_ENGINE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string());

        let scratch_dir = env::var("APPCOMPOSE_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_work_dir(SCRATCH_SUBDIR));

        let output_dir = env::var("APPCOMPOSE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_work_dir(OUTPUT_SUBDIR));

        let image = env::var("APPCOMPOSE_IMAGE")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let catalog_path = env::var("APPCOMPOSE_CATALOG").ok().map(PathBuf::from);

        let process_timeout_secs = env::var("APPCOMPOSE_PROCESS_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let hook_runner = env::var("APPCOMPOSE_HOOK_RUNNER").ok().map(PathBuf::from);

        let log_level = env::var("APPCOMPOSE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            engine,
            scratch_dir,
            output_dir,
            image,
            catalog_path,
            process_timeout_secs,
            hook_runner,
            log_level,
        }
    }
}

impl ComposeConfig {
    /// Checks the engine is set, the scratch and output directories are absolute without
    /// `..` components, the timeout is at most 24h and the log level is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Engine must not be empty".to_string(),
            ));
        }

        check_work_dir("Scratch directory", &self.scratch_dir)?;
        check_work_dir("Output directory", &self.output_dir)?;

        if self.process_timeout_secs > MAX_PROCESS_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Process timeout cannot exceed 24 hours".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        (self.process_timeout_secs > 0).then(|| Duration::from_secs(self.process_timeout_secs))
    }

    /// Explicit catalog path, then `<config dir>/appcompose/frameworks.yaml`, then the built-in catalog
    pub fn load_catalog(&self) -> Result<FrameworkCatalog, ComposeError> {
        if let Some(path) = &self.catalog_path {
            return FrameworkCatalog::load(path);
        }

        if let Some(path) = user_catalog_path().filter(|p| p.is_file()) {
            debug!(path = %path.display(), "Using user framework catalog");
            return FrameworkCatalog::load(&path);
        }

        FrameworkCatalog::builtin()
    }
}

/// `<cache dir>/appcompose/<name>`, under the temp dir when no cache dir is known
fn default_work_dir(name: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("appcompose")
        .join(name)
}

/// Work directories must not resolve into the build context, which would copy them into images
fn check_work_dir(label: &str, path: &Path) -> Result<(), ConfigError> {
    if !path.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be an absolute path outside the codebase: {}",
            label,
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must not contain '..': {}",
            label,
            path.display()
        )));
    }
    Ok(())
}

fn user_catalog_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("appcompose").join(USER_CATALOG_FILE))
}

impl fmt::Display for ComposeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "appcompose configuration:")?;
        writeln!(f, "  Engine: {}", self.engine)?;
        writeln!(f, "  Scratch Dir: {}", self.scratch_dir.display())?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        if let Some(image) = &self.image {
            writeln!(f, "  Image: {}", image)?;
        }
        if let Some(path) = &self.catalog_path {
            writeln!(f, "  Catalog: {}", path.display())?;
        }
        writeln!(f, "  Process Timeout: {}s", self.process_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
