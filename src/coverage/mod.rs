//! Coverage collection
//!
//! Reads the execution trace written by a module's test run, drops classes
//! matching the exclusion patterns and renders the filtered report.

pub mod collector;
pub mod jacoco;
pub mod lcov;
pub mod model;
pub mod pattern;
pub mod render;
pub mod trace;

pub use collector::CoverageCollector;
pub use model::{
    ClassCoverage, Counter, CounterKind, Counters, CoverageReport, ExecutionTrace,
    PackageCoverage,
};
pub use pattern::{ClassPattern, PatternError, Separator};
pub use render::{write_reports, ReportFormats};
pub use trace::{read_trace, TraceError, TraceFormat};
