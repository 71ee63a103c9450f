//! External process seam shared by both drivers

use crate::error::ComposeError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tracing::{debug, warn};

/// One external command: program, arguments, extra environment and optional stdin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub stdin: Option<String>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Split a command line on whitespace into program and arguments
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs<'a>(mut self, env: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(i32),
    /// Terminated by a signal, no exit code
    Signaled,
    /// Killed after exceeding the configured deadline
    TimedOut(Duration),
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Exited(code) => write!(f, "exited with status {}", code),
            ProcessOutcome::Signaled => write!(f, "terminated by signal"),
            ProcessOutcome::TimedOut(limit) => {
                write!(f, "killed after {}s deadline", limit.as_secs())
            }
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. `Err` means the process could not be launched.
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutcome>;
}

/// Spawns real processes with inherited stdout/stderr
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutcome> {
        let mut command = tokio::process::Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;

        if let (Some(input), Some(stdin)) = (&invocation.stdin, child.stdin.take()) {
            match feed_stdin(stdin, input).await {
                Ok(()) => {}
                // The child quit without reading everything; its exit status tells why
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(
                        command = %invocation.command_line(),
                        "Process closed stdin early"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        command = %invocation.command_line(),
                        timeout_secs = limit.as_secs(),
                        "Process exceeded deadline, killing"
                    );
                    child.kill().await?;
                    return Ok(ProcessOutcome::TimedOut(limit));
                }
            },
            None => child.wait().await?,
        };

        Ok(match status.code() {
            Some(code) => ProcessOutcome::Exited(code),
            None => ProcessOutcome::Signaled,
        })
    }
}

/// Write `input` and close the pipe so the child sees EOF
async fn feed_stdin(mut stdin: ChildStdin, input: &str) -> std::io::Result<()> {
    stdin.write_all(input.as_bytes()).await?;
    stdin.shutdown().await
}

/// Records invocations instead of running them; every call reports `outcome`
#[derive(Debug)]
pub struct RecordingRunner {
    outcome: ProcessOutcome,
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::with_outcome(ProcessOutcome::Exited(0))
    }

    pub fn with_outcome(outcome: ProcessOutcome) -> Self {
        Self {
            outcome,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutcome> {
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(invocation.clone());
        }
        Ok(self.outcome)
    }
}

/// Run `invocation`, turning launch failures and unsuccessful exits into
/// [`ComposeError::ProcessFailure`] labelled with `stage`.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
    stage: &str,
    pipeline: Option<&str>,
) -> Result<(), ComposeError> {
    let command = invocation.command_line();
    debug!(stage, command = %command, "Running");
    let start = Instant::now();

    let failure = |status: String| ComposeError::ProcessFailure {
        stage: stage.to_string(),
        command: command.clone(),
        status,
        pipeline: pipeline.map(str::to_string),
    };

    let outcome = runner
        .run(invocation)
        .await
        .map_err(|e| failure(format!("failed to launch: {}", e)))?;

    if !outcome.success() {
        return Err(failure(outcome.to_string()));
    }

    debug!(
        stage,
        duration_ms = start.elapsed().as_millis() as u64,
        "Command succeeded"
    );
    Ok(())
}
