//! covgate - per-module coverage-gated test pipeline
//!
//! Every module of a multi-module project goes through the same three stages:
//!
//! ```text
//! Test Runner -> Coverage Collector -> Coverage Gate
//! ```
//!
//! The runner executes the module's test suite through its own harness, the
//! collector turns the execution trace into a per-class report with
//! configuration, infrastructure, entry-point and data-seeding classes
//! removed, and the gate fails the module when any service class is below
//! the required line coverage. Modules run in parallel up to a job limit.
//!
//! # Example
//!
//! ```no_run
//! use covgate::{CovgateConfig, ProcessTestExecutor, Scheduler, Workspace};
//! use covgate::progress::LoggingHandler;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let root = Path::new(".");
//! let config = CovgateConfig::load(root, None)?;
//! config.validate()?;
//!
//! let workspace = Workspace::discover(root, &config)?;
//! let modules = workspace
//!     .modules
//!     .iter()
//!     .map(|m| (m.clone(), config.settings_for(m, root)))
//!     .collect();
//!
//! let scheduler = Scheduler::new(
//!     config.jobs,
//!     Arc::new(ProcessTestExecutor::new()),
//!     Arc::new(LoggingHandler),
//! );
//! let summary = scheduler.run(modules).await;
//! std::process::exit(summary.exit_code());
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod coverage;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod util;
pub mod workspace;

pub use config::{ConfigError, CovgateConfig, ModuleSettings};
pub use coverage::{CoverageCollector, CoverageReport};
pub use error::PipelineError;
pub use gate::{evaluate, GateResult, Violation};
pub use pipeline::{ModuleOutcome, ModulePipeline, ModuleState, RunSummary, Scheduler};
pub use runner::{ProcessTestExecutor, TestExecutor, TestOutcome};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use workspace::{Module, Workspace};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
