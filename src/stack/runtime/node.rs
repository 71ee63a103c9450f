//! Node.js runtime: package.json + npm/yarn lockfiles

use super::cache::DiscoveryContext;
use super::lockfile::{self, NPM_LOCKFILE, YARN_LOCKFILE};
use super::package_json::{PackageJson, MANIFEST_FILE};
use super::package_manager::PackageManager;
use super::{Runtime, RuntimeSpec};
use crate::error::ComposeError;
use crate::fs::{FileSystem, FsError};
use crate::stack::framework::{
    match_framework, Command, FrameworkCatalog, FrameworkSpec, LifecycleCommands, Phase,
};
use crate::stack::{DependencyMap, RuntimeId};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported Node.js major versions, oldest first
pub const SUPPORTED_MAJORS: &[&str] = &["16", "18", "20", "22"];

const REQUIRED_FILES: &[&str] = &[MANIFEST_FILE];

#[derive(Debug, Clone, Default)]
pub struct NodeRuntime;

impl NodeRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn package_manager(fs: &dyn FileSystem) -> PackageManager {
        if fs.exists(Path::new(YARN_LOCKFILE)) {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    /// `node:<major>-slim` for the declared engine constraint, latest major when absent
    pub fn base_image(engine: Option<&str>) -> Result<String, ComposeError> {
        let latest = SUPPORTED_MAJORS[SUPPORTED_MAJORS.len() - 1];

        let major = match engine.map(str::trim).filter(|e| !e.is_empty()) {
            None => latest.to_string(),
            Some(constraint) => engine_major(constraint)
                .filter(|major| SUPPORTED_MAJORS.contains(&major.as_str()))
                .ok_or_else(|| ComposeError::UnsupportedEngineVersion {
                    requested: constraint.to_string(),
                    supported: SUPPORTED_MAJORS.iter().map(|s| s.to_string()).collect(),
                })?,
        };

        Ok(format!("node:{}-slim", major))
    }

    /// Direct + dev dependencies enriched from the lockfile, memoized per codebase root.
    ///
    /// A missing or malformed lockfile is logged and leaves the direct view.
    pub fn resolve_dependencies(
        fs: &dyn FileSystem,
        package_manager: PackageManager,
        manifest: &PackageJson,
        ctx: &DiscoveryContext,
    ) -> DependencyMap {
        ctx.dependency_cache.get_or_insert_with(fs.root(), || {
            let direct = manifest.direct_dependencies();
            let mut resolved = match read_lockfile_dependencies(fs, package_manager, &direct) {
                Ok(from_lock) => from_lock,
                Err(e) => {
                    warn!(error = %e, "Falling back to direct dependencies");
                    DependencyMap::new()
                }
            };
            resolved.extend(direct);
            debug!(count = resolved.len(), "Resolved dependencies");
            resolved
        })
    }

    /// Build, dev and run commands: manifest script first, then the framework's command
    pub fn detected_commands(
        package_manager: PackageManager,
        manifest: &PackageJson,
        framework: Option<&FrameworkSpec>,
    ) -> LifecycleCommands {
        let mut commands = LifecycleCommands::default();

        for phase in Phase::ALL {
            let command = if manifest.script(phase.script_name()).is_some() {
                let cmd = Command::new(package_manager.run_script(phase.script_name()));
                Some(match phase {
                    Phase::Run => cmd.with_env("NODE_ENV", "production"),
                    _ => cmd,
                })
            } else {
                framework
                    .and_then(|spec| spec.commands.get(phase))
                    .filter(|cmd| !cmd.cmd.trim().is_empty())
                    .map(|cmd| with_runner(package_manager, cmd))
            };

            if let Some(command) = command {
                commands.set(phase, command);
            }
        }

        commands
    }
}

impl Runtime for NodeRuntime {
    fn id(&self) -> RuntimeId {
        RuntimeId::NodeJs
    }

    fn required_files(&self) -> &[&'static str] {
        REQUIRED_FILES
    }

    fn analyse_codebase(
        &self,
        fs: &dyn FileSystem,
        catalog: &FrameworkCatalog,
        ctx: &DiscoveryContext,
    ) -> Result<Option<RuntimeSpec>, ComposeError> {
        let content = match fs.read_optional(Path::new(MANIFEST_FILE)) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(ComposeError::Manifest {
                    path: MANIFEST_FILE.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let manifest = PackageJson::parse(&content)?;

        let package_manager = Self::package_manager(fs);
        let base_image = Self::base_image(manifest.node_engine())?;
        let dependencies = Self::resolve_dependencies(fs, package_manager, &manifest, ctx);
        let framework = match_framework(&self.id(), fs, catalog.specs(), &dependencies)?;
        let commands = Self::detected_commands(package_manager, &manifest, framework);

        let has_lockfile = fs.exists(Path::new(package_manager.lockfile()));

        info!(
            package_manager = %package_manager,
            base_image = %base_image,
            framework = framework.map(|f| f.id.as_str()).unwrap_or("none"),
            "Analysed Node.js codebase"
        );

        let mut builder = RuntimeSpec::builder(self.id(), base_image)
            .package_manager(package_manager.name())
            .framework(framework.map(|f| f.id.clone()))
            .package_manager_install_command(package_manager.bootstrap_command())
            .install_command(package_manager.install_command(has_lockfile))
            .manifest_file(MANIFEST_FILE)
            .detected_commands(commands);

        if has_lockfile {
            builder = builder.manifest_file(package_manager.lockfile());
        }
        if let Some(framework) = framework {
            builder = builder.framework_hooks(framework.hooks.clone());
        }

        Ok(Some(builder.build()))
    }
}

/// Major component of an engine constraint such as `>=18`, `^18.2` or `v18.x`
fn engine_major(constraint: &str) -> Option<String> {
    let first = constraint.split_whitespace().next()?;
    let major = first
        .trim_start_matches(['>', '<', '=', '^', '~', 'v'])
        .split('.')
        .next()?;

    if !major.is_empty() && major.chars().all(|c| c.is_ascii_digit()) {
        Some(major.to_string())
    } else {
        None
    }
}

/// Prefix a framework binary invocation with the package manager's runner
fn with_runner(package_manager: PackageManager, command: &Command) -> Command {
    let runner = package_manager.binary_runner();
    let cmd = command.cmd.trim();
    let prefixed = if cmd.split_whitespace().next() == Some(runner) {
        cmd.to_string()
    } else {
        format!("{} {}", runner, cmd)
    };

    Command {
        cmd: prefixed,
        env: command.env.clone(),
    }
}

fn read_lockfile_dependencies(
    fs: &dyn FileSystem,
    package_manager: PackageManager,
    direct: &DependencyMap,
) -> Result<DependencyMap, ComposeError> {
    let lockfile_name = package_manager.lockfile();
    let content = fs
        .read_to_string(Path::new(lockfile_name))
        .map_err(|e| ComposeError::DependencyResolution {
            lockfile: lockfile_name.to_string(),
            reason: match e {
                FsError::NotFound(_) => "lockfile not found".to_string(),
                other => other.to_string(),
            },
        })?;

    match package_manager {
        PackageManager::Npm => lockfile::npm_transitive_dependencies(&content, direct),
        PackageManager::Yarn => Ok(lockfile::parse_yarn_lockfile(&content)),
    }
}
