use crate::driver::DriverMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Runtime and framework discovery with multi-stage container builds
#[derive(Parser, Debug)]
#[command(
    name = "appcompose",
    about = "Discover how to build a codebase and drive its build pipeline",
    version,
    author,
    long_about = "appcompose detects the runtime and web framework of a codebase, derives \
                  install, build and run commands, and executes them on the host or as a \
                  multi-stage container build, passing a deployment bundle through framework \
                  hooks before export."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect runtime, framework and lifecycle commands",
        long_about = "Prints the runtime spec discovered for a codebase without running anything.\n\n\
                      Examples:\n  \
                      appcompose discover\n  \
                      appcompose discover ./my-app --format json"
    )]
    Discover(DiscoverArgs),

    #[command(
        about = "Install, build and export a codebase",
        long_about = "Runs discovery, then install, build and export with the selected driver, \
                      applying framework hooks between phases. Prints the final bundle.\n\n\
                      Examples:\n  \
                      appcompose compose --mode local\n  \
                      appcompose compose ./my-app --mode docker --image registry.local/app:1"
    )]
    Compose(ComposeArgs),

    #[command(
        about = "Print the Dockerfile the docker driver would build",
        long_about = "Renders the install and build stages for a codebase without invoking \
                      the container engine.\n\n\
                      Examples:\n  \
                      appcompose pipeline ./my-app"
    )]
    Pipeline(PipelineArgs),

    #[command(about = "List registered hook ids")]
    Hooks(HooksArgs),

    /// Apply a hook request inside a build stage
    #[command(hide = true)]
    HookExec(HookExecArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DiscoverArgs {
    #[arg(value_name = "PATH", help = "Codebase directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Framework catalog (YAML or JSON)")]
    pub catalog: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ComposeArgs {
    #[arg(value_name = "PATH", help = "Codebase directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'm',
        long,
        value_enum,
        default_value = "docker",
        help = "Where to run install and build"
    )]
    pub mode: DriverMode,

    #[arg(long, value_name = "REF", help = "Image reference to tag and push on export")]
    pub image: Option<String>,

    #[arg(long, value_name = "FILE", help = "Framework catalog (YAML or JSON)")]
    pub catalog: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Kill any spawned process running longer than this"
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format for the final bundle"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(value_name = "PATH", help = "Codebase directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Framework catalog (YAML or JSON)")]
    pub catalog: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct HooksArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HookExecArgs {
    #[arg(value_name = "REQUEST", help = "Hook request JSON file")]
    pub request: PathBuf,

    #[arg(value_name = "OUTPUT", help = "Where to write the resulting bundle")]
    pub output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_discover_args() {
        let args = CliArgs::parse_from(["appcompose", "discover"]);
        match args.command {
            Commands::Discover(discover) => {
                assert_eq!(discover.format, OutputFormatArg::Human);
                assert!(discover.path.is_none());
                assert!(discover.catalog.is_none());
            }
            _ => panic!("Expected Discover command"),
        }
    }

    #[test]
    fn test_compose_defaults_to_docker() {
        let args = CliArgs::parse_from(["appcompose", "compose", "/tmp/app"]);
        match args.command {
            Commands::Compose(compose) => {
                assert_eq!(compose.mode, DriverMode::Docker);
                assert_eq!(compose.path, Some(PathBuf::from("/tmp/app")));
                assert_eq!(compose.format, OutputFormatArg::Json);
                assert!(compose.image.is_none());
            }
            _ => panic!("Expected Compose command"),
        }
    }

    #[test]
    fn test_compose_with_options() {
        let args = CliArgs::parse_from([
            "appcompose",
            "compose",
            "--mode",
            "local",
            "--image",
            "registry.local/app:1",
            "--timeout",
            "600",
            "--format",
            "yaml",
        ]);
        match args.command {
            Commands::Compose(compose) => {
                assert_eq!(compose.mode, DriverMode::Local);
                assert_eq!(compose.image.as_deref(), Some("registry.local/app:1"));
                assert_eq!(compose.timeout, Some(600));
                assert_eq!(compose.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Compose command"),
        }
    }

    #[test]
    fn test_hook_exec_positionals() {
        let args = CliArgs::parse_from([
            "appcompose",
            "hook-exec",
            "/framework/adapters/hook-1.json",
            "/home/node/app/.appcompose/bundle.json",
        ]);
        match args.command {
            Commands::HookExec(exec) => {
                assert_eq!(exec.request, PathBuf::from("/framework/adapters/hook-1.json"));
                assert_eq!(
                    exec.output,
                    PathBuf::from("/home/node/app/.appcompose/bundle.json")
                );
            }
            _ => panic!("Expected HookExec command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["appcompose", "-v", "hooks"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["appcompose", "--log-level", "trace", "hooks"]);
        assert_eq!(args.log_level.as_deref(), Some("trace"));

        assert!(CliArgs::try_parse_from(["appcompose", "-v", "-q", "hooks"]).is_err());
    }
}
