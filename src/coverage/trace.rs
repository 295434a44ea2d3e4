//! Loading execution traces written by the test run

use super::model::ExecutionTrace;
use super::{jacoco, lcov};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Execution trace not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read execution trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized execution trace format in {0}")]
    UnknownFormat(PathBuf),

    #[error("Malformed execution trace: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Sniff the content
    #[default]
    Auto,
    Jacoco,
    Lcov,
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceFormat::Auto => "auto",
            TraceFormat::Jacoco => "jacoco",
            TraceFormat::Lcov => "lcov",
        };
        f.write_str(s)
    }
}

impl TraceFormat {
    pub fn detect(content: &str) -> Option<TraceFormat> {
        let head = content.trim_start();
        if head.starts_with('<') {
            return Some(TraceFormat::Jacoco);
        }
        if content
            .lines()
            .any(|l| l.trim_start().starts_with("SF:"))
        {
            return Some(TraceFormat::Lcov);
        }
        None
    }
}

pub fn read_trace(
    path: &Path,
    format: TraceFormat,
    source_roots: &[String],
) -> Result<ExecutionTrace, TraceError> {
    if !path.is_file() {
        return Err(TraceError::Missing(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_trace(&content, format, source_roots).map_err(|e| match e {
        TraceError::UnknownFormat(_) => TraceError::UnknownFormat(path.to_path_buf()),
        other => other,
    })
}

pub fn parse_trace(
    content: &str,
    format: TraceFormat,
    source_roots: &[String],
) -> Result<ExecutionTrace, TraceError> {
    let resolved = match format {
        TraceFormat::Auto => TraceFormat::detect(content)
            .ok_or_else(|| TraceError::UnknownFormat(PathBuf::new()))?,
        explicit => explicit,
    };
    debug!(format = %resolved, bytes = content.len(), "Parsing execution trace");

    match resolved {
        TraceFormat::Lcov => lcov::parse(content, source_roots),
        _ => jacoco::parse(content),
    }
}
