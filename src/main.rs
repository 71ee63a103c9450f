use appcompose::cli::commands::{CliArgs, Commands};
use appcompose::cli::handlers::{
    handle_compose, handle_discover, handle_hook_exec, handle_hooks, handle_pipeline,
};
use appcompose::util::logging::{init_logging, parse_level, LoggingConfig};
use appcompose::{NAME, VERSION};

use clap::Parser;
use std::process;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Discover(discover_args) => handle_discover(discover_args).await,
        Commands::Compose(compose_args) => handle_compose(compose_args).await,
        Commands::Pipeline(pipeline_args) => handle_pipeline(pipeline_args).await,
        Commands::Hooks(hooks_args) => handle_hooks(hooks_args).await,
        Commands::HookExec(exec_args) => handle_hook_exec(exec_args).await,
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    config.include_target = config.level >= Level::DEBUG;
    init_logging(config);
}
