//! Runs install and build directly on the host

use super::process::{run_checked, Invocation};
use super::{Driver, DriverContext, DriverMode};
use crate::error::ComposeError;
use crate::output::AppBundle;
use crate::stack::{Phase, RuntimeSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct LocalDriver {
    spec: Arc<RuntimeSpec>,
    ctx: DriverContext,
}

impl LocalDriver {
    pub fn new(spec: Arc<RuntimeSpec>, ctx: DriverContext) -> Self {
        Self { spec, ctx }
    }

    async fn run_command(
        &self,
        stage: &str,
        command: Option<&str>,
        env: &BTreeMap<String, String>,
    ) -> Result<(), ComposeError> {
        let Some(invocation) = command.and_then(Invocation::from_command_line) else {
            debug!(stage, "No command, skipping");
            return Ok(());
        };

        let invocation = invocation
            .envs(self.spec.environment_variables())
            .envs(env)
            .current_dir(&self.ctx.root);

        let start = Instant::now();
        run_checked(self.ctx.runner.as_ref(), &invocation, stage, None).await?;
        info!(
            stage,
            duration_ms = start.elapsed().as_millis() as u64,
            "Local stage completed"
        );
        Ok(())
    }
}

#[async_trait]
impl Driver for LocalDriver {
    fn mode(&self) -> DriverMode {
        DriverMode::Local
    }

    async fn install(&mut self) -> Result<(), ComposeError> {
        self.run_command("install", self.spec.install_command(), &BTreeMap::new())
            .await
    }

    async fn build(&mut self) -> Result<(), ComposeError> {
        match self.spec.detected_commands().get(Phase::Build) {
            Some(command) => {
                self.run_command("build", Some(command.cmd.as_str()), &command.env)
                    .await
            }
            None => self.run_command("build", None, &BTreeMap::new()).await,
        }
    }

    async fn export(&mut self, bundle: &AppBundle) -> Result<(), ComposeError> {
        info!(
            start = ?bundle.start_command(),
            "Local export has nothing to publish"
        );
        Ok(())
    }

    async fn exec_hook(
        &mut self,
        bundle: &AppBundle,
        hook_id: &str,
    ) -> Result<AppBundle, ComposeError> {
        self.ctx.hooks.apply(hook_id, bundle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposeConfig;
    use crate::driver::process::{ProcessOutcome, RecordingRunner};
    use crate::hooks::HookRegistry;
    use crate::stack::{Command, LifecycleCommands, RuntimeId};
    use std::path::PathBuf;

    fn spec() -> Arc<RuntimeSpec> {
        let mut commands = LifecycleCommands::default();
        commands.set(
            Phase::Build,
            Command::new("npm run build").with_env("CI", "1"),
        );
        Arc::new(
            RuntimeSpec::builder(RuntimeId::NodeJs, "node:22-slim")
                .install_command("npm ci")
                .env("NODE_OPTIONS", "--max-old-space-size=2048")
                .detected_commands(commands)
                .build(),
        )
    }

    fn driver(runner: Arc<RecordingRunner>, spec: Arc<RuntimeSpec>) -> LocalDriver {
        LocalDriver::new(
            spec,
            DriverContext {
                root: PathBuf::from("/srv/app"),
                config: ComposeConfig::default(),
                runner,
                hooks: Arc::new(HookRegistry::with_builtins()),
            },
        )
    }

    #[tokio::test]
    async fn test_install_and_build_spawn_split_commands() {
        let runner = Arc::new(RecordingRunner::new());
        let mut driver = driver(runner.clone(), spec());

        driver.install().await.unwrap();
        driver.build().await.unwrap();

        let calls = runner.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "npm");
        assert_eq!(calls[0].args, vec!["ci"]);
        assert_eq!(calls[0].current_dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(
            calls[1].env.get("NODE_OPTIONS").map(String::as_str),
            Some("--max-old-space-size=2048")
        );
        assert_eq!(calls[1].env.get("CI").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_missing_build_command_is_skipped() {
        let runner = Arc::new(RecordingRunner::new());
        let spec = Arc::new(RuntimeSpec::builder(RuntimeId::NodeJs, "node:22-slim").build());
        let mut driver = driver(runner.clone(), spec);

        driver.build().await.unwrap();
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let runner = Arc::new(RecordingRunner::with_outcome(ProcessOutcome::Exited(1)));
        let mut driver = driver(runner, spec());

        let err = driver.install().await.unwrap_err();
        assert!(matches!(err, ComposeError::ProcessFailure { ref stage, .. } if stage == "install"));
    }

    #[tokio::test]
    async fn test_hook_applies_in_process() {
        let mut driver = driver(Arc::new(RecordingRunner::new()), spec());
        let bundle = AppBundle::with_start_command(vec!["npm".into(), "start".into()]);

        let out = driver.exec_hook(&bundle, "server-defaults").await.unwrap();
        assert_eq!(out.server.unwrap().concurrency, Some(80));

        let err = driver.exec_hook(&bundle, "missing").await.unwrap_err();
        assert!(matches!(err, ComposeError::UnknownHook(_)));
    }
}
