//! Test runner
//!
//! Test discovery and execution belong to the module's own harness. The
//! runner only launches it, waits for it, and reads back what it produced.

pub mod junit;
pub mod process;

pub use process::ProcessTestExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start test command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Test command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to read test results: {0}")]
    Results(String),
}

/// Everything needed to run one module's tests
#[derive(Debug, Clone, PartialEq)]
pub struct TestInvocation {
    pub module: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub results_dir: PathBuf,
    pub trace_path: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl TestStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Errored)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub suite: String,
    pub name: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl TestCaseResult {
    pub fn id(&self) -> String {
        if self.suite.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.suite, self.name)
        }
    }
}

/// A failed test, or the harness itself when it failed without naming one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTest {
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for FailedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.test, detail),
            None => f.write_str(&self.test),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub cases: Vec<TestCaseResult>,
    pub duration: Duration,
    pub trace_path: PathBuf,
    /// Last lines of the harness output, kept for failure reports
    pub output_tail: String,
}

impl TestOutcome {
    pub fn count(&self, status: TestStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && !self.cases.iter().any(|c| c.status.is_failure())
    }

    /// Failed test cases. A non-zero exit with no failed case is reported
    /// as a failure of the harness itself.
    pub fn failures(&self) -> Vec<FailedTest> {
        let mut failures: Vec<FailedTest> = self
            .cases
            .iter()
            .filter(|c| c.status.is_failure())
            .map(|c| FailedTest {
                test: c.id(),
                detail: c.message.clone(),
            })
            .collect();

        if failures.is_empty() && self.exit_code != Some(0) {
            let status = match self.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "was terminated by a signal".to_string(),
            };
            let tail = self.output_tail.trim();
            failures.push(FailedTest {
                test: format!("test command {}", status),
                detail: (!tail.is_empty()).then(|| tail.to_string()),
            });
        }

        failures
    }
}

/// Runs a module's test suite to completion.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn execute(&self, invocation: &TestInvocation) -> Result<TestOutcome, RunnerError>;
}
