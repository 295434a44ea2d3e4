pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, ModulesArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};
