//! Subcommand handlers. Each returns the process exit code.

use super::commands::{ComposeArgs, DiscoverArgs, HookExecArgs, HooksArgs, PipelineArgs};
use super::output::OutputFormatter;
use crate::compose::Composer;
use crate::config::ComposeConfig;
use crate::driver::{DockerDriver, Driver, DriverContext, RecordingRunner};
use crate::error::ComposeError;
use crate::fs::RealFileSystem;
use crate::hooks::{execute_request, HookRegistry};
use crate::stack::runtime::DiscoveryContext;
use crate::stack::{FrameworkCatalog, RuntimeSpec};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn handle_discover(args: &DiscoverArgs) -> i32 {
    let root = match resolve_codebase(args.path.as_deref()) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let config = match validated(ComposeConfig {
        catalog_path: args.catalog.clone().or(ComposeConfig::default().catalog_path),
        ..ComposeConfig::default()
    }) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(code) => return code,
    };

    let fs = RealFileSystem::new(&root);
    let composer = Composer::new(config, catalog);
    let spec = match composer.discover(&fs, &DiscoveryContext::default()) {
        Ok(spec) => spec,
        Err(ComposeError::DiscoveryNotFound { .. }) => {
            eprintln!("No supported runtime found in {}", root.display());
            return 1;
        }
        Err(e) => {
            error!("Discovery failed: {}", e);
            return 1;
        }
    };

    print_or_fail(OutputFormatter::new(args.format.into()).format_spec(&spec))
}

pub async fn handle_compose(args: &ComposeArgs) -> i32 {
    let root = match resolve_codebase(args.path.as_deref()) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let default_config = ComposeConfig::default();
    let config = ComposeConfig {
        image: args.image.clone().or(default_config.image.clone()),
        catalog_path: args.catalog.clone().or(default_config.catalog_path.clone()),
        process_timeout_secs: args.timeout.unwrap_or(default_config.process_timeout_secs),
        ..default_config
    };
    if args.image.is_some() {
        debug!("Image overridden to: {:?}", config.image);
    }

    let config = match validated(config) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(code) => return code,
    };

    let fs = RealFileSystem::new(&root);
    let composer = Composer::new(config, catalog);
    let bundle = match composer.compose(args.mode, &fs).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!("Compose failed: {}", e);
            return 1;
        }
    };

    print_or_fail(OutputFormatter::new(args.format.into()).format_bundle(&bundle))
}

/// Runs install and build against a recording runner and prints the resulting Dockerfile
pub async fn handle_pipeline(args: &PipelineArgs) -> i32 {
    let root = match resolve_codebase(args.path.as_deref()) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let config = match validated(ComposeConfig {
        catalog_path: args.catalog.clone().or(ComposeConfig::default().catalog_path),
        ..ComposeConfig::default()
    }) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(code) => return code,
    };

    let fs = RealFileSystem::new(&root);
    let spec: RuntimeSpec = match Composer::new(config.clone(), catalog)
        .discover(&fs, &DiscoveryContext::default())
    {
        Ok(spec) => spec,
        Err(e) => {
            error!("Discovery failed: {}", e);
            return 1;
        }
    };

    let mut driver = DockerDriver::new(
        Arc::new(spec),
        DriverContext {
            root,
            config,
            runner: Arc::new(RecordingRunner::new()),
            hooks: Arc::new(HookRegistry::with_builtins()),
        },
    );

    if let Err(e) = driver.install().await {
        error!("Failed to render install stage: {}", e);
        return 1;
    }
    if let Err(e) = driver.build().await {
        error!("Failed to render build stage: {}", e);
        return 1;
    }

    println!("{}", driver.pipeline().render());
    0
}

pub async fn handle_hooks(args: &HooksArgs) -> i32 {
    let registry = HookRegistry::with_builtins();
    print_or_fail(OutputFormatter::new(args.format.into()).format_hooks(&registry))
}

/// Entry point inside hook stages; only the hook id and bundle arrive through the request file
pub async fn handle_hook_exec(args: &HookExecArgs) -> i32 {
    let registry = HookRegistry::with_builtins();
    match execute_request(&registry, &args.request, &args.output) {
        Ok(_) => 0,
        Err(e) => {
            error!("Hook execution failed: {}", e);
            1
        }
    }
}

fn validated(config: ComposeConfig) -> Result<ComposeConfig, i32> {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return Err(1);
    }
    debug!("{}", config);
    Ok(config)
}

fn resolve_codebase(path: Option<&Path>) -> Result<PathBuf, i32> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().map_err(|e| {
            error!("Failed to get current directory: {}", e);
            1
        })?,
    };

    debug!("Codebase path: {}", path.display());

    if !path.exists() {
        error!("Codebase path does not exist: {}", path.display());
        return Err(1);
    }

    if !path.is_dir() {
        error!("Codebase path is not a directory: {}", path.display());
        return Err(1);
    }

    path.canonicalize().map_err(|e| {
        error!("Failed to canonicalize codebase path: {}", e);
        1
    })
}

fn load_catalog(config: &ComposeConfig) -> Result<FrameworkCatalog, i32> {
    match config.load_catalog() {
        Ok(catalog) => {
            info!(frameworks = catalog.len(), "Framework catalog loaded");
            Ok(catalog)
        }
        Err(e) => {
            error!("Failed to load framework catalog: {}", e);
            Err(1)
        }
    }
}

fn print_or_fail(rendered: anyhow::Result<String>) -> i32 {
    match rendered {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_codebase_rejects_missing_path() {
        assert_eq!(
            resolve_codebase(Some(Path::new("/nonexistent/appcompose/app"))),
            Err(1)
        );
    }

    #[test]
    fn test_resolve_codebase_rejects_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("package.json");
        fs::write(&file, "{}").unwrap();
        assert_eq!(resolve_codebase(Some(&file)), Err(1));
    }

    #[test]
    fn test_resolve_codebase_canonicalizes() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_codebase(Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_validated_rejects_parent_components() {
        let config = ComposeConfig {
            scratch_dir: PathBuf::from("/tmp/appcompose/../adapters"),
            ..ComposeConfig::default()
        };
        assert_eq!(validated(config).err(), Some(1));

        let config = ComposeConfig {
            output_dir: PathBuf::from("output"),
            ..ComposeConfig::default()
        };
        assert_eq!(validated(config).err(), Some(1));
    }

    #[tokio::test]
    #[serial]
    async fn test_every_command_checks_configuration() {
        let app = TempDir::new().unwrap();
        fs::write(
            app.path().join("package.json"),
            r#"{"name":"app","scripts":{"start":"node index.js"}}"#,
        )
        .unwrap();
        fs::write(app.path().join("package-lock.json"), "{}").unwrap();

        let old = env::var("APPCOMPOSE_SCRATCH_DIR").ok();
        env::set_var("APPCOMPOSE_SCRATCH_DIR", "../adapters");

        let discover = handle_discover(&DiscoverArgs {
            path: Some(app.path().to_path_buf()),
            catalog: None,
            format: crate::cli::commands::OutputFormatArg::Json,
        })
        .await;
        let pipeline = handle_pipeline(&PipelineArgs {
            path: Some(app.path().to_path_buf()),
            catalog: None,
        })
        .await;

        match old {
            Some(v) => env::set_var("APPCOMPOSE_SCRATCH_DIR", v),
            None => env::remove_var("APPCOMPOSE_SCRATCH_DIR"),
        }

        assert_eq!(discover, 1);
        assert_eq!(pipeline, 1);
    }

    #[tokio::test]
    async fn test_hook_exec_writes_bundle() {
        let dir = TempDir::new().unwrap();
        let request = dir.path().join("hook-1.json");
        let output = dir.path().join("out").join("bundle.json");
        crate::hooks::HookRequest::new("identity", crate::output::AppBundle::new())
            .write(&request)
            .unwrap();

        let code = handle_hook_exec(&HookExecArgs {
            request,
            output: output.clone(),
        })
        .await;

        assert_eq!(code, 0);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_hook_exec_unknown_hook_fails() {
        let dir = TempDir::new().unwrap();
        let request = dir.path().join("hook-1.json");
        crate::hooks::HookRequest::new("nope", crate::output::AppBundle::new())
            .write(&request)
            .unwrap();

        let code = handle_hook_exec(&HookExecArgs {
            request,
            output: dir.path().join("bundle.json"),
        })
        .await;

        assert_eq!(code, 1);
    }
}
