use covgate::cli::commands::{CliArgs, Commands, ConfigArgs, ModulesArgs, RunArgs};
use covgate::cli::output::{OutputFormat, OutputFormatter};
use covgate::config::CovgateConfig;
use covgate::progress::{LoggingHandler, NoOpHandler, ProgressHandler};
use covgate::runner::ProcessTestExecutor;
use covgate::util::logging::{config_from_env, init_logging, parse_level};
use covgate::workspace::Workspace;
use covgate::{Scheduler, NAME, VERSION};

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, Level};

/// Configuration or usage problem, as opposed to a failing module
const EXIT_USAGE: i32 = 2;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, args.quiet).await,
        Commands::Modules(modules_args) => handle_modules(modules_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        Some(parse_level(level_str))
    } else if args.verbose {
        Some(Level::DEBUG)
    } else if args.quiet {
        Some(Level::ERROR)
    } else {
        None
    };

    init_logging(config_from_env(level));
}

fn resolve_root(path: Option<&PathBuf>) -> Result<PathBuf> {
    let root = match path {
        Some(p) => p.clone(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    if !root.is_dir() {
        bail!("Workspace path is not a directory: {}", root.display());
    }
    root.canonicalize()
        .with_context(|| format!("Failed to canonicalize {}", root.display()))
}

fn load_config(root: &Path, explicit: Option<&PathBuf>) -> Result<CovgateConfig> {
    Ok(CovgateConfig::load(root, explicit.map(PathBuf::as_path))?)
}

fn emit(output: &str, destination: Option<&PathBuf>) -> Result<()> {
    match destination {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to: {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let root = match resolve_root(args.path.as_ref()) {
        Ok(root) => root,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_USAGE;
        }
    };

    let mut config = match load_config(&root, args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_USAGE;
        }
    };
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.test.timeout_secs = Some(timeout);
    }
    if let Some(ratio) = args.min_ratio {
        config.override_min_ratio(ratio);
    }
    if let Err(e) = config.validate() {
        error!("{}", e);
        return EXIT_USAGE;
    }

    let workspace = match Workspace::discover(&root, &config) {
        Ok(ws) => ws,
        Err(e) => {
            error!("{}", e);
            return EXIT_USAGE;
        }
    };
    let selected = match workspace.select(&args.modules) {
        Ok(modules) => modules,
        Err(e) => {
            error!("{}", e);
            return EXIT_USAGE;
        }
    };

    let modules = selected
        .into_iter()
        .map(|m| {
            let settings = config.settings_for(&m, &root);
            (m, settings)
        })
        .collect();

    let progress: Arc<dyn ProgressHandler> = if quiet {
        Arc::new(NoOpHandler)
    } else {
        Arc::new(LoggingHandler)
    };
    let scheduler = Scheduler::new(config.jobs, Arc::new(ProcessTestExecutor::new()), progress);
    let summary = scheduler.run(modules).await;

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    let rendered = match formatter.format_summary(&summary) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return EXIT_USAGE;
        }
    };
    if let Err(e) = emit(&rendered, args.output.as_ref()) {
        error!("{:#}", e);
        return EXIT_USAGE;
    }

    summary.exit_code()
}

fn handle_modules(args: &ModulesArgs) -> i32 {
    let result = resolve_root(args.path.as_ref()).and_then(|root| {
        let config = load_config(&root, args.config.as_ref())?;
        let workspace = Workspace::discover(&root, &config)?;
        OutputFormatter::new(OutputFormat::from(args.format)).format_modules(&workspace)
    });

    match result.and_then(|out| emit(&out, None)) {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            EXIT_USAGE
        }
    }
}

fn handle_config(args: &ConfigArgs) -> i32 {
    let result = resolve_root(args.path.as_ref()).and_then(|root| {
        let config = load_config(&root, args.config.as_ref())?;
        config.validate()?;
        OutputFormatter::new(OutputFormat::from(args.format)).format_config(&config)
    });

    match result.and_then(|out| emit(&out, None)) {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            EXIT_USAGE
        }
    }
}
