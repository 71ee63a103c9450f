//! End-to-end orchestration: discover, install, build, hooks, export

use crate::config::ComposeConfig;
use crate::discovery::discover_required;
use crate::driver::{
    get_driver, CommandRunner, Driver, DriverContext, DriverMode, SystemRunner,
};
use crate::error::ComposeError;
use crate::fs::FileSystem;
use crate::hooks::HookRegistry;
use crate::output::AppBundle;
use crate::stack::runtime::DiscoveryContext;
use crate::stack::{FrameworkCatalog, Phase, RuntimeRegistry, RuntimeSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct Composer {
    registry: RuntimeRegistry,
    catalog: FrameworkCatalog,
    hooks: Arc<HookRegistry>,
    runner: Arc<dyn CommandRunner>,
    config: ComposeConfig,
}

impl Composer {
    /// Default runtimes, built-in hooks and real processes
    pub fn new(config: ComposeConfig, catalog: FrameworkCatalog) -> Self {
        let runner = Arc::new(SystemRunner::new(config.process_timeout()));
        Self {
            registry: RuntimeRegistry::with_defaults(),
            catalog,
            hooks: Arc::new(HookRegistry::with_builtins()),
            runner,
            config,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_registry(mut self, registry: RuntimeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn catalog(&self) -> &FrameworkCatalog {
        &self.catalog
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn discover(
        &self,
        fs: &dyn FileSystem,
        ctx: &DiscoveryContext,
    ) -> Result<RuntimeSpec, ComposeError> {
        discover_required(fs, &self.catalog, &self.registry, ctx)
    }

    pub fn driver(
        &self,
        mode: DriverMode,
        spec: Arc<RuntimeSpec>,
        fs: &dyn FileSystem,
    ) -> Box<dyn Driver> {
        get_driver(
            mode,
            spec,
            DriverContext {
                root: fs.root().to_path_buf(),
                config: self.config.clone(),
                runner: Arc::clone(&self.runner),
                hooks: Arc::clone(&self.hooks),
            },
        )
    }

    /// Discover the codebase on `fs` and drive it through every phase with a fresh driver
    pub async fn compose(
        &self,
        mode: DriverMode,
        fs: &dyn FileSystem,
    ) -> Result<AppBundle, ComposeError> {
        let start = Instant::now();
        info!(root = %fs.root().display(), mode = %mode, "Starting compose");

        let ctx = DiscoveryContext::default();
        let spec = Arc::new(self.discover(fs, &ctx)?);
        let mut driver = self.driver(mode, Arc::clone(&spec), fs);

        let bundle = run_phases(driver.as_mut(), &spec).await?;

        info!(
            server = bundle.has_server(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Compose complete"
        );
        Ok(bundle)
    }
}

/// Bundle a run starts from: the run command seeds the server start command
pub fn initial_bundle(spec: &RuntimeSpec) -> AppBundle {
    match spec.detected_commands().get(Phase::Run) {
        Some(run) if !run.argv().is_empty() => AppBundle::with_start_command(run.argv()),
        _ => AppBundle::new(),
    }
}

/// install, afterInstall hook, build, afterBuild hook, export. The first failure aborts the rest.
pub async fn run_phases(
    driver: &mut dyn Driver,
    spec: &RuntimeSpec,
) -> Result<AppBundle, ComposeError> {
    let hooks = spec.framework_hooks();
    let mut bundle = initial_bundle(spec);

    timed("install", driver.install()).await?;
    if let Some(hook) = &hooks.after_install {
        bundle = timed("afterInstall", driver.exec_hook(&bundle, hook)).await?;
    }

    timed("build", driver.build()).await?;
    if let Some(hook) = &hooks.after_build {
        bundle = timed("afterBuild", driver.exec_hook(&bundle, hook)).await?;
    }

    if bundle.has_server() {
        timed("export", driver.export(&bundle)).await?;
    } else {
        info!("No server in bundle, skipping export");
    }

    Ok(bundle)
}

async fn timed<T>(
    phase: &str,
    fut: impl std::future::Future<Output = Result<T, ComposeError>>,
) -> Result<T, ComposeError> {
    info!(phase, "Starting phase");
    let start = Instant::now();
    let result = fut.await?;
    info!(
        phase,
        duration_ms = start.elapsed().as_millis() as u64,
        "Phase complete"
    );
    Ok(result)
}
