//! Drivers execute a [`RuntimeSpec`] on the host or through a container engine

use crate::config::ComposeConfig;
use crate::error::ComposeError;
use crate::hooks::HookRegistry;
use crate::output::AppBundle;
use crate::stack::RuntimeSpec;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub mod docker;
pub mod local;
pub mod pipeline;
pub mod process;

pub use docker::DockerDriver;
pub use local::LocalDriver;
pub use pipeline::{BindMount, Instruction, Pipeline, Stage};
pub use process::{
    run_checked, CommandRunner, Invocation, ProcessOutcome, RecordingRunner, SystemRunner,
};

/// Non-root user the application runs as inside images
pub const APP_USER: &str = "node";
/// Application directory inside images
pub const APP_DIR: &str = "/home/node/app";
/// Fixed in-image location hooks write the bundle to
pub const BUNDLE_PATH: &str = "/home/node/app/.appcompose/bundle.json";
/// Where the scratch directory is mounted inside hook stages
pub const ADAPTERS_MOUNT: &str = "/framework/adapters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverMode {
    Local,
    Docker,
}

impl fmt::Display for DriverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverMode::Local => write!(f, "local"),
            DriverMode::Docker => write!(f, "docker"),
        }
    }
}

/// Phases of one target's pipeline. Calls must be made in order by a single owner.
#[async_trait]
pub trait Driver: Send {
    fn mode(&self) -> DriverMode;

    async fn install(&mut self) -> Result<(), ComposeError>;

    async fn build(&mut self) -> Result<(), ComposeError>;

    /// Publish the built application described by `bundle`
    async fn export(&mut self, bundle: &AppBundle) -> Result<(), ComposeError>;

    /// Apply hook `hook_id` to `bundle` and return the result
    async fn exec_hook(
        &mut self,
        bundle: &AppBundle,
        hook_id: &str,
    ) -> Result<AppBundle, ComposeError>;
}

/// Everything a driver needs besides the runtime spec
#[derive(Clone)]
pub struct DriverContext {
    /// Codebase directory; build context for the container engine
    pub root: PathBuf,
    pub config: ComposeConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub hooks: Arc<HookRegistry>,
}

pub fn get_driver(
    mode: DriverMode,
    spec: Arc<RuntimeSpec>,
    ctx: DriverContext,
) -> Box<dyn Driver> {
    match mode {
        DriverMode::Local => Box::new(LocalDriver::new(spec, ctx)),
        DriverMode::Docker => Box::new(DockerDriver::new(spec, ctx)),
    }
}
