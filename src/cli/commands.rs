use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Per-module coverage-gated test pipeline
#[derive(Parser, Debug)]
#[command(
    name = "covgate",
    about = "Run tests, collect coverage and enforce coverage rules for every module",
    version,
    long_about = "covgate runs each module's test suite, builds a coverage report from the \
                  execution trace with configuration and infrastructure classes excluded, and \
                  fails any module whose service classes fall below the required coverage."
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
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the test, coverage and gate pipeline for every module",
        long_about = "Runs every module's pipeline, in parallel up to --jobs modules at a time.\n\
                      Exits 0 when every module passes, 1 when any module fails and 2 on \
                      configuration errors.\n\n\
                      Examples:\n  \
                      covgate run\n  \
                      covgate run /path/to/project -j 4\n  \
                      covgate run -m services:catalog-service --format json"
    )]
    Run(RunArgs),

    #[command(about = "List the modules discovered in the workspace")]
    Modules(ModulesArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "PATH", help = "Workspace root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'm',
        long = "module",
        value_name = "MODULE",
        help = "Only run the named module (repeatable)"
    )]
    pub modules: Vec<String>,

    #[arg(short = 'j', long, value_name = "N", help = "Maximum modules processed at once")]
    pub jobs: Option<usize>,

    #[arg(short = 'c', long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", help = "Test command timeout")]
    pub timeout: Option<u64>,

    #[arg(
        long,
        value_name = "RATIO",
        help = "Override the minimum of every ratio limit"
    )]
    pub min_ratio: Option<f64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ModulesArgs {
    #[arg(value_name = "PATH", help = "Workspace root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'c', long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

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
pub struct ConfigArgs {
    #[arg(value_name = "PATH", help = "Workspace root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'c', long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
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
