//! Container engine driver
//!
//! Every phase appends a stage to the driver's [`Pipeline`] and asks the engine to
//! build up to that stage, feeding the rendered Dockerfile on stdin. Hooks run in
//! their own stage: the host writes a [`HookRequest`] plus the `appcompose` binary
//! into the scratch directory, which lives outside the codebase and reaches the
//! engine as the named build context `adapters`. The stage bind-mounts that context
//! and runs `hook-exec`, and a detached scratch stage copies the resulting bundle
//! back out with `--output`.

use super::pipeline::{BindMount, Pipeline, Stage};
use super::process::{run_checked, Invocation};
use super::{Driver, DriverContext, DriverMode, ADAPTERS_MOUNT, APP_DIR, APP_USER, BUNDLE_PATH};
use crate::error::ComposeError;
use crate::hooks::HookRequest;
use crate::output::AppBundle;
use crate::stack::{Phase, RuntimeSpec};
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const INSTALLER_STAGE: &str = "installer";
const BUILDER_STAGE: &str = "builder";
const EXPORTER_STAGE: &str = "exporter";
const RUNNER_BINARY: &str = "appcompose";
const EXPORTED_BUNDLE: &str = "bundle.json";
const APP_CHOWN: &str = "node:node";
/// Named build context carrying the scratch directory
const ADAPTERS_CONTEXT: &str = "adapters";

/// What a build invocation produces besides the build cache
enum BuildOutput {
    Cache,
    Tag(String),
    Dir(PathBuf),
}

pub struct DockerDriver {
    spec: Arc<RuntimeSpec>,
    ctx: DriverContext,
    pipeline: Pipeline,
    hook_seq: u32,
    /// Scratch directory, once a hook stage mounts it
    adapters: Option<PathBuf>,
}

impl DockerDriver {
    pub fn new(spec: Arc<RuntimeSpec>, ctx: DriverContext) -> Self {
        let pipeline = Pipeline::seeded(spec.base_image(), APP_USER);
        Self {
            spec,
            ctx,
            pipeline,
            hook_seq: 0,
            adapters: None,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn append(&mut self, stage: Stage) -> Result<(), ComposeError> {
        self.pipeline = self.pipeline.with_stage(stage)?;
        Ok(())
    }

    fn build_invocation(&self, target: &str, output: &BuildOutput, dockerfile: String) -> Invocation {
        let mut invocation = Invocation::new(&self.ctx.config.engine)
            .args(["buildx", "build", "--target", target]);

        invocation = match output {
            BuildOutput::Cache => invocation,
            BuildOutput::Tag(image) => invocation.arg("--tag").arg(image.as_str()),
            BuildOutput::Dir(dir) => invocation.arg("--output").arg(dir.display().to_string()),
        };

        if let Some(dir) = &self.adapters {
            invocation = invocation
                .arg("--build-context")
                .arg(format!("{}={}", ADAPTERS_CONTEXT, dir.display()));
        }

        invocation
            .args(["-f", "-"])
            .arg(self.ctx.root.display().to_string())
            .envs(self.spec.environment_variables())
            .stdin(dockerfile)
    }

    async fn build_target(&self, target: &str, output: BuildOutput) -> Result<(), ComposeError> {
        let dockerfile = self.pipeline.render();
        debug!(target, pipeline = %dockerfile, "Building stage");

        let invocation = self.build_invocation(target, &output, dockerfile.clone());
        let start = Instant::now();
        run_checked(
            self.ctx.runner.as_ref(),
            &invocation,
            target,
            Some(dockerfile.as_str()),
        )
        .await?;

        info!(
            stage = target,
            duration_ms = start.elapsed().as_millis() as u64,
            "Stage built"
        );
        Ok(())
    }

    /// Unique per driver and per millisecond
    fn next_token(&mut self) -> String {
        self.hook_seq += 1;
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), self.hook_seq)
    }

    fn hook_runner_source(&self) -> Result<PathBuf, ComposeError> {
        match &self.ctx.config.hook_runner {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().map_err(|e| ComposeError::io(RUNNER_BINARY, e)),
        }
    }

    /// Host directory for hook files; anything under the codebase would land in the image
    fn work_dir(&self, path: &Path) -> Result<PathBuf, ComposeError> {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.ctx.root.join(path)
        };
        if resolved.starts_with(&self.ctx.root) {
            return Err(ComposeError::WorkDirInsideContext {
                path: resolved,
                root: self.ctx.root.clone(),
            });
        }
        Ok(resolved)
    }

    /// Write the request and the runner binary into the scratch directory
    fn stage_hook_files(
        &self,
        scratch: &Path,
        request: &HookRequest,
        request_name: &str,
    ) -> Result<(), ComposeError> {
        request.write(&scratch.join(request_name))?;

        let source = self.hook_runner_source()?;
        let dest = scratch.join(RUNNER_BINARY);
        fs::copy(&source, &dest).map_err(|e| ComposeError::io(&source, e))?;
        Ok(())
    }

    fn read_exported_bundle(stage: &str, dir: &Path) -> Result<AppBundle, ComposeError> {
        let path = dir.join(EXPORTED_BUNDLE);
        let failure = |reason: String| ComposeError::BundleExportFailure {
            stage: stage.to_string(),
            path: path.clone(),
            reason,
        };

        let content = fs::read_to_string(&path).map_err(|e| failure(e.to_string()))?;
        AppBundle::from_json(&content).map_err(|e| failure(e.to_string()))
    }
}

#[async_trait]
impl Driver for DockerDriver {
    fn mode(&self) -> DriverMode {
        DriverMode::Docker
    }

    async fn install(&mut self) -> Result<(), ComposeError> {
        let mut stage = self
            .pipeline
            .stage_from_last(INSTALLER_STAGE)?
            .run(format!("mkdir -p {}", APP_DIR))
            .workdir(APP_DIR);

        for (key, value) in self.spec.environment_variables() {
            stage = stage.env(key, value);
        }
        if !self.spec.manifest_files().is_empty() {
            stage = stage.copy(
                self.spec.manifest_files().to_vec(),
                "./",
                Some(APP_CHOWN),
            );
        }
        if let Some(bootstrap) = self.spec.package_manager_install_command() {
            stage = stage.user("root").run(bootstrap).user(APP_USER);
        }
        if let Some(install) = self.spec.install_command() {
            stage = stage.run(install);
        }

        self.append(stage)?;
        self.build_target(INSTALLER_STAGE, BuildOutput::Cache).await
    }

    async fn build(&mut self) -> Result<(), ComposeError> {
        let mut stage = self
            .pipeline
            .stage_from_last(BUILDER_STAGE)?
            .copy(vec![".".to_string()], ".", Some(APP_CHOWN));

        if let Some(command) = self.spec.detected_commands().get(Phase::Build) {
            for (key, value) in &command.env {
                stage = stage.env(key, value);
            }
            stage = stage.run(command.cmd.as_str());
        }

        self.append(stage)?;
        self.build_target(BUILDER_STAGE, BuildOutput::Cache).await
    }

    async fn export(&mut self, bundle: &AppBundle) -> Result<(), ComposeError> {
        let Some(start) = bundle.start_command() else {
            info!("No server start command, nothing to export");
            return Ok(());
        };
        let image = self
            .ctx
            .config
            .image
            .clone()
            .ok_or(ComposeError::MissingImage)?;
        if self.pipeline.get(BUILDER_STAGE).is_none() {
            return Err(ComposeError::EmptyPipeline(EXPORTER_STAGE.to_string()));
        }

        let workdir = bundle
            .server
            .as_ref()
            .and_then(|server| server.start.dir.clone())
            .unwrap_or_else(|| APP_DIR.to_string());

        let mut stage = Stage::new(EXPORTER_STAGE, self.spec.base_image())
            .user(APP_USER)
            .copy_from(BUILDER_STAGE, APP_DIR, APP_DIR, Some(APP_CHOWN))
            .workdir(workdir);

        for (key, value) in self.spec.environment_variables() {
            stage = stage.env(key, value);
        }
        if let Some(run) = self.spec.detected_commands().get(Phase::Run) {
            for (key, value) in &run.env {
                stage = stage.env(key, value);
            }
        }
        for command in self.spec.export_commands() {
            stage = stage.run(command.as_str());
        }
        stage = stage.cmd(start.to_vec());

        self.append(stage)?;
        self.build_target(EXPORTER_STAGE, BuildOutput::Tag(image.clone()))
            .await?;

        let dockerfile = self.pipeline.render();
        let push = Invocation::new(&self.ctx.config.engine)
            .args(["push", image.as_str()])
            .envs(self.spec.environment_variables());
        run_checked(self.ctx.runner.as_ref(), &push, "push", Some(dockerfile.as_str())).await?;

        info!(image = %image, "Image pushed");
        Ok(())
    }

    async fn exec_hook(
        &mut self,
        bundle: &AppBundle,
        hook_id: &str,
    ) -> Result<AppBundle, ComposeError> {
        // Fail on the host before building anything; the stage runs the same table.
        self.ctx.hooks.get(hook_id)?;

        let scratch = self.work_dir(&self.ctx.config.scratch_dir)?;
        let output_root = self.work_dir(&self.ctx.config.output_dir)?;

        let token = self.next_token();
        let hook_stage = format!("hook-{}", token);
        let export_stage = format!("{}-export", hook_stage);
        let request_name = format!("{}.json", hook_stage);

        self.stage_hook_files(
            &scratch,
            &HookRequest::new(hook_id, bundle.clone()),
            &request_name,
        )?;
        self.adapters = Some(scratch);

        let command = format!(
            "{mount}/{bin} hook-exec {mount}/{request} {bundle}",
            mount = ADAPTERS_MOUNT,
            bin = RUNNER_BINARY,
            request = request_name,
            bundle = BUNDLE_PATH,
        );
        let mount = BindMount {
            from: ADAPTERS_CONTEXT.to_string(),
            target: ADAPTERS_MOUNT.to_string(),
        };
        let stage = self
            .pipeline
            .stage_from_last(hook_stage.as_str())?
            .run_with_mount(command, mount);
        self.append(stage)?;
        self.build_target(&hook_stage, BuildOutput::Cache).await?;

        let export = Stage::detached(export_stage.as_str(), "scratch").copy_from(
            hook_stage.as_str(),
            BUNDLE_PATH,
            format!("/{}", EXPORTED_BUNDLE),
            None,
        );
        self.append(export)?;

        let output_dir = output_root.join(&hook_stage);
        match fs::remove_dir_all(&output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ComposeError::io(&output_dir, e)),
        }
        self.build_target(&export_stage, BuildOutput::Dir(output_dir.clone()))
            .await?;

        let updated = Self::read_exported_bundle(&export_stage, &output_dir)?;
        info!(hook = hook_id, stage = %hook_stage, "Hook applied");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposeConfig;
    use crate::driver::process::{ProcessOutcome, RecordingRunner};
    use crate::hooks::HookRegistry;
    use crate::stack::{Command, LifecycleCommands, RuntimeId};
    use tempfile::TempDir;

    fn spec() -> Arc<RuntimeSpec> {
        let mut commands = LifecycleCommands::default();
        commands.set(Phase::Build, Command::new("yarn run build"));
        commands.set(
            Phase::Run,
            Command::new("yarn run start").with_env("NODE_ENV", "production"),
        );
        Arc::new(
            RuntimeSpec::builder(RuntimeId::NodeJs, "node:20-slim")
                .package_manager("yarn")
                .package_manager_install_command(Some("npm install --global yarn".to_string()))
                .install_command("yarn install")
                .manifest_file("package.json")
                .manifest_file("yarn.lock")
                .detected_commands(commands)
                .build(),
        )
    }

    /// Codebase at `<base>/app`, hook work directories beside it
    fn driver(base: &Path, runner: Arc<RecordingRunner>) -> DockerDriver {
        let root = base.join("app");
        fs::create_dir_all(&root).unwrap();

        let mut config = ComposeConfig::default();
        config.engine = "docker".to_string();
        config.image = Some("registry.local/app:latest".to_string());
        config.scratch_dir = base.join("adapters");
        config.output_dir = base.join("output");
        DockerDriver::new(
            spec(),
            DriverContext {
                root,
                config,
                runner,
                hooks: Arc::new(HookRegistry::with_builtins()),
            },
        )
    }

    #[tokio::test]
    async fn test_install_stage_and_invocation() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());

        driver.install().await.unwrap();

        let rendered = driver.pipeline().render();
        assert!(rendered.starts_with("FROM node:20-slim AS base\nUSER node\n"));
        assert!(rendered.contains("FROM base AS installer"));
        assert!(rendered.contains("COPY --chown=node:node package.json yarn.lock ./"));
        assert!(rendered.contains("USER root\nRUN npm install --global yarn\nUSER node\nRUN yarn install"));

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "docker");
        assert_eq!(
            calls[0].args[..4],
            ["buildx", "build", "--target", "installer"]
        );
        assert_eq!(calls[0].stdin.as_deref(), Some(rendered.as_str()));
    }

    #[tokio::test]
    async fn test_build_derives_from_installer() {
        let temp = TempDir::new().unwrap();
        let mut driver = driver(temp.path(), Arc::new(RecordingRunner::new()));

        driver.install().await.unwrap();
        driver.build().await.unwrap();

        let builder = driver.pipeline().get("builder").unwrap();
        assert_eq!(builder.base(), "installer");
        assert!(builder
            .to_string()
            .contains("COPY --chown=node:node . .\nRUN yarn run build"));
    }

    #[tokio::test]
    async fn test_export_tags_and_pushes() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());

        driver.install().await.unwrap();
        driver.build().await.unwrap();
        let bundle = AppBundle::with_start_command(vec![
            "yarn".to_string(),
            "run".to_string(),
            "start".to_string(),
        ]);
        driver.export(&bundle).await.unwrap();

        let exporter = driver.pipeline().get("exporter").unwrap().to_string();
        assert!(exporter.starts_with("FROM node:20-slim AS exporter"));
        assert!(exporter.contains("COPY --from=builder --chown=node:node /home/node/app /home/node/app"));
        assert!(exporter.contains("ENV NODE_ENV=\"production\""));
        assert!(exporter.contains("CMD [\"yarn\", \"run\", \"start\"]"));

        let calls = runner.invocations();
        let build = &calls[2];
        assert!(build.args.contains(&"--tag".to_string()));
        assert!(build.args.contains(&"registry.local/app:latest".to_string()));
        assert_eq!(calls[3].args, vec!["push", "registry.local/app:latest"]);
    }

    #[tokio::test]
    async fn test_export_without_server_is_noop() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());

        driver.export(&AppBundle::new()).await.unwrap();
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_export_before_build_fails() {
        let temp = TempDir::new().unwrap();
        let mut driver = driver(temp.path(), Arc::new(RecordingRunner::new()));
        let bundle = AppBundle::with_start_command(vec!["node".to_string()]);

        let err = driver.export(&bundle).await.unwrap_err();
        assert!(matches!(err, ComposeError::EmptyPipeline(_)));
    }

    #[tokio::test]
    async fn test_failed_install_reports_stage_and_pipeline() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::with_outcome(ProcessOutcome::Exited(1)));
        let mut driver = driver(temp.path(), runner);

        let err = driver.install().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Stage installer failed"));
        assert!(msg.contains("docker buildx build --target installer"));
        assert!(msg.contains("FROM base AS installer"));
    }

    #[tokio::test]
    async fn test_hook_without_exported_file_fails() {
        let temp = TempDir::new().unwrap();
        let runner_bin = temp.path().join("runner-bin");
        fs::write(&runner_bin, "#!/bin/sh\n").unwrap();

        let mut driver = driver(temp.path(), Arc::new(RecordingRunner::new()));
        driver.ctx.config.hook_runner = Some(runner_bin);

        let err = driver
            .exec_hook(&AppBundle::new(), "identity")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::BundleExportFailure { .. }));

        let stages: Vec<&str> = driver.pipeline().stages().iter().map(|s| s.name()).collect();
        assert!(stages[1].starts_with("hook-"));
        assert!(stages[2].ends_with("-export"));
        // the scratch export stage does not move the cursor
        assert_eq!(driver.pipeline().last_stage(), Some(stages[1]));
    }

    #[tokio::test]
    async fn test_unknown_hook_fails_before_building() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());

        let err = driver.exec_hook(&AppBundle::new(), "nope").await.unwrap_err();
        assert!(matches!(err, ComposeError::UnknownHook(_)));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_hook_files_stay_out_of_build_context() {
        let temp = TempDir::new().unwrap();
        let runner_bin = temp.path().join("runner-bin");
        fs::write(&runner_bin, "#!/bin/sh\n").unwrap();

        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());
        driver.ctx.config.hook_runner = Some(runner_bin);

        driver.install().await.unwrap();
        // nothing exports a bundle here, only the staging matters
        let _ = driver.exec_hook(&AppBundle::new(), "identity").await;
        driver.build().await.unwrap();

        let scratch = temp.path().join("adapters");
        assert!(scratch.join(RUNNER_BINARY).exists());
        assert!(!temp.path().join("app").join(".appcompose").exists());
        assert_eq!(fs::read_dir(temp.path().join("app")).unwrap().count(), 0);

        let rendered = driver.pipeline().render();
        assert!(rendered.contains("RUN --mount=type=bind,from=adapters,target=/framework/adapters "));
        assert!(!rendered.contains("source="));

        let context = format!("adapters={}", scratch.display());
        let calls = runner.invocations();
        assert!(!calls[0].args.contains(&"--build-context".to_string()));
        let builder = calls.last().unwrap();
        assert!(builder.args.contains(&"builder".to_string()));
        assert!(builder.args.contains(&context));
    }

    #[tokio::test]
    async fn test_work_dir_inside_codebase_is_rejected() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(temp.path(), runner.clone());
        driver.ctx.config.scratch_dir = temp.path().join("app").join(".appcompose/adapters");

        let err = driver
            .exec_hook(&AppBundle::new(), "identity")
            .await
            .unwrap_err();

        assert!(matches!(err, ComposeError::WorkDirInsideContext { .. }));
        assert!(runner.invocations().is_empty());
        assert!(!temp.path().join("app").join(".appcompose").exists());
    }

    #[tokio::test]
    async fn test_relative_output_dir_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut driver = driver(temp.path(), Arc::new(RecordingRunner::new()));
        driver.ctx.config.output_dir = PathBuf::from(".appcompose/.output");

        let err = driver
            .exec_hook(&AppBundle::new(), "identity")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::WorkDirInsideContext { .. }));
    }
}
