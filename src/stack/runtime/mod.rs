//! Execution runtimes and the immutable [`RuntimeSpec`] they produce

use crate::error::ComposeError;
use crate::fs::FileSystem;
use crate::stack::framework::{FrameworkCatalog, FrameworkHooks, LifecycleCommands};
use crate::stack::RuntimeId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub mod cache;
pub mod lockfile;
pub mod node;
pub mod package_json;
pub mod package_manager;

pub use cache::{DependencyCache, DiscoveryContext};
pub use node::NodeRuntime;
pub use package_manager::PackageManager;

/// Detector and analyser for one execution environment family
pub trait Runtime: Send + Sync {
    fn id(&self) -> RuntimeId;

    /// Files that must all exist for this runtime to match
    fn required_files(&self) -> &[&'static str];

    fn matches(&self, fs: &dyn FileSystem) -> bool {
        self.required_files()
            .iter()
            .all(|file| fs.exists(Path::new(file)))
    }

    /// Produce the runtime spec for a codebase this runtime matched.
    ///
    /// `Ok(None)` means the runtime declined after a closer look.
    fn analyse_codebase(
        &self,
        fs: &dyn FileSystem,
        catalog: &FrameworkCatalog,
        ctx: &DiscoveryContext,
    ) -> Result<Option<RuntimeSpec>, ComposeError>;
}

/// Discovery result. Built once through [`RuntimeSpecBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    id: RuntimeId,
    base_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_manager_install_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    install_command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    manifest_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    export_commands: Vec<String>,
    detected_commands: LifecycleCommands,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment_variables: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "FrameworkHooks::is_empty")]
    framework_hooks: FrameworkHooks,
}

impl RuntimeSpec {
    pub fn builder(id: RuntimeId, base_image: impl Into<String>) -> RuntimeSpecBuilder {
        RuntimeSpecBuilder {
            spec: RuntimeSpec {
                id,
                base_image: base_image.into(),
                package_manager: None,
                framework: None,
                package_manager_install_command: None,
                install_command: None,
                manifest_files: Vec::new(),
                export_commands: Vec::new(),
                detected_commands: LifecycleCommands::default(),
                environment_variables: BTreeMap::new(),
                framework_hooks: FrameworkHooks::default(),
            },
        }
    }

    pub fn id(&self) -> &RuntimeId {
        &self.id
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    pub fn package_manager(&self) -> Option<&str> {
        self.package_manager.as_deref()
    }

    /// Id of the matched framework, if any
    pub fn framework(&self) -> Option<&str> {
        self.framework.as_deref()
    }

    /// Bootstrap step that installs the package manager itself
    pub fn package_manager_install_command(&self) -> Option<&str> {
        self.package_manager_install_command.as_deref()
    }

    pub fn install_command(&self) -> Option<&str> {
        self.install_command.as_deref()
    }

    /// Files copied into the install stage before dependencies are installed
    pub fn manifest_files(&self) -> &[String] {
        &self.manifest_files
    }

    pub fn export_commands(&self) -> &[String] {
        &self.export_commands
    }

    pub fn detected_commands(&self) -> &LifecycleCommands {
        &self.detected_commands
    }

    pub fn environment_variables(&self) -> &BTreeMap<String, String> {
        &self.environment_variables
    }

    pub fn framework_hooks(&self) -> &FrameworkHooks {
        &self.framework_hooks
    }
}

pub struct RuntimeSpecBuilder {
    spec: RuntimeSpec,
}

impl RuntimeSpecBuilder {
    pub fn package_manager(mut self, name: impl Into<String>) -> Self {
        self.spec.package_manager = Some(name.into());
        self
    }

    pub fn framework(mut self, id: Option<String>) -> Self {
        self.spec.framework = id;
        self
    }

    pub fn package_manager_install_command(mut self, command: Option<String>) -> Self {
        self.spec.package_manager_install_command = command;
        self
    }

    pub fn install_command(mut self, command: impl Into<String>) -> Self {
        self.spec.install_command = Some(command.into());
        self
    }

    pub fn manifest_file(mut self, file: impl Into<String>) -> Self {
        self.spec.manifest_files.push(file.into());
        self
    }

    pub fn export_command(mut self, command: impl Into<String>) -> Self {
        self.spec.export_commands.push(command.into());
        self
    }

    pub fn detected_commands(mut self, commands: LifecycleCommands) -> Self {
        self.spec.detected_commands = commands;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec
            .environment_variables
            .insert(key.into(), value.into());
        self
    }

    pub fn framework_hooks(mut self, hooks: FrameworkHooks) -> Self {
        self.spec.framework_hooks = hooks;
        self
    }

    pub fn build(self) -> RuntimeSpec {
        self.spec
    }
}

/// Registration table of known runtimes, queried in registration order
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    runtimes: Vec<Arc<dyn Runtime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NodeRuntime::new()));
        registry
    }

    pub fn register(&mut self, runtime: Arc<dyn Runtime>) {
        self.runtimes.push(runtime);
    }

    pub fn runtimes(&self) -> &[Arc<dyn Runtime>] {
        &self.runtimes
    }

    pub fn get(&self, id: &RuntimeId) -> Option<&Arc<dyn Runtime>> {
        self.runtimes.iter().find(|runtime| &runtime.id() == id)
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::stack::framework::{Command, Phase};

    #[test]
    fn test_default_registry_has_node() {
        let registry = RuntimeRegistry::with_defaults();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&RuntimeId::NodeJs).is_some());
        assert!(registry
            .get(&RuntimeId::Custom("python".to_string()))
            .is_none());
    }

    #[test]
    fn test_default_match_requires_all_files() {
        let registry = RuntimeRegistry::with_defaults();
        let node = registry.get(&RuntimeId::NodeJs).unwrap();

        assert!(!node.matches(&MockFileSystem::new()));
        assert!(node.matches(&MockFileSystem::with_files([("package.json", "{}")])));
    }

    #[test]
    fn test_builder_and_serialization() {
        let mut commands = LifecycleCommands::default();
        commands.set(Phase::Build, Command::new("npm run build"));

        let spec = RuntimeSpec::builder(RuntimeId::NodeJs, "node:22-slim")
            .package_manager("npm")
            .install_command("npm ci")
            .manifest_file("package.json")
            .detected_commands(commands)
            .build();

        assert_eq!(spec.base_image(), "node:22-slim");
        assert_eq!(spec.install_command(), Some("npm ci"));
        assert!(spec.package_manager_install_command().is_none());

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["id"], "nodejs");
        assert_eq!(json["baseImage"], "node:22-slim");
        assert_eq!(json["detectedCommands"]["build"]["cmd"], "npm run build");
        assert!(json.get("packageManagerInstallCommand").is_none());
    }
}
