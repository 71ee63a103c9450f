//! Declarative framework descriptors
//!
//! Frameworks are described as data rather than code: which runtime they run on,
//! which dependencies and files identify them, which lifecycle commands they
//! provide, and which other frameworks they embed. The matcher never looks past
//! this description.

use crate::fs::FileSystem;
use crate::stack::RuntimeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub mod catalog;
pub mod matcher;

pub use catalog::FrameworkCatalog;
pub use matcher::match_framework;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSpec {
    pub id: String,
    pub runtime: RuntimeId,
    #[serde(default)]
    pub required_dependencies: Vec<DependencyRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_files: Vec<RequiredFile>,
    #[serde(default, skip_serializing_if = "LifecycleCommands::is_empty")]
    pub commands: LifecycleCommands,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds_frameworks: Vec<String>,
    #[serde(default, skip_serializing_if = "FrameworkHooks::is_empty")]
    pub hooks: FrameworkHooks,
}

impl FrameworkSpec {
    pub fn new(id: impl Into<String>, runtime: RuntimeId) -> Self {
        Self {
            id: id.into(),
            runtime,
            required_dependencies: Vec::new(),
            required_files: Vec::new(),
            commands: LifecycleCommands::default(),
            embeds_frameworks: Vec::new(),
            hooks: FrameworkHooks::default(),
        }
    }

    pub fn requires_dependency(mut self, name: impl Into<String>) -> Self {
        self.required_dependencies.push(DependencyRequirement {
            name: name.into(),
            semver: None,
        });
        self
    }

    pub fn requires_file(mut self, file: RequiredFile) -> Self {
        self.required_files.push(file);
        self
    }

    pub fn embeds(mut self, id: impl Into<String>) -> Self {
        self.embeds_frameworks.push(id.into());
        self
    }

    pub fn with_command(mut self, phase: Phase, command: Command) -> Self {
        self.commands.set(phase, command);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRequirement {
    pub name: String,
    /// Informational only; matching is by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<String>,
}

/// One `requiredFiles` entry: a single path, or a group where any member suffices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredFile {
    Path(String),
    AnyOf(Vec<String>),
}

impl RequiredFile {
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            RequiredFile::Path(path) => vec![path.as_str()],
            RequiredFile::AnyOf(paths) => paths.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_satisfied(&self, fs: &dyn FileSystem) -> bool {
        self.alternatives()
            .into_iter()
            .any(|path| fs.exists(Path::new(path)))
    }
}

/// A command line plus the environment it runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Command {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Executable followed by arguments, split on whitespace
    pub fn argv(&self) -> Vec<String> {
        self.cmd.split_whitespace().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Build,
    Dev,
    Run,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Build, Phase::Dev, Phase::Run];

    /// Manifest script that takes precedence for this phase
    pub fn script_name(&self) -> &'static str {
        match self {
            Phase::Build => "build",
            Phase::Dev => "dev",
            Phase::Run => "start",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCommands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<Command>,
}

impl LifecycleCommands {
    pub fn get(&self, phase: Phase) -> Option<&Command> {
        match phase {
            Phase::Build => self.build.as_ref(),
            Phase::Dev => self.dev.as_ref(),
            Phase::Run => self.run.as_ref(),
        }
    }

    pub fn set(&mut self, phase: Phase, command: Command) {
        let slot = match phase {
            Phase::Build => &mut self.build,
            Phase::Dev => &mut self.dev,
            Phase::Run => &mut self.run,
        };
        *slot = Some(command);
    }

    pub fn is_empty(&self) -> bool {
        self.build.is_none() && self.dev.is_none() && self.run.is_none()
    }
}

/// Hook ids a framework asks to run between pipeline phases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_install: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_build: Option<String>,
}

impl FrameworkHooks {
    pub fn is_empty(&self) -> bool {
        self.after_install.is_none() && self.after_build.is_none()
    }
}
