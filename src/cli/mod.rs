pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    CliArgs, Commands, ComposeArgs, DiscoverArgs, HookExecArgs, HooksArgs, PipelineArgs,
};
pub use output::{OutputFormat, OutputFormatter};
