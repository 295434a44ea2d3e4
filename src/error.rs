use crate::gate::Violation;
use crate::pipeline::state::TransitionError;
use crate::runner::FailedTest;
use serde::Serialize;
use thiserror::Error;

/// Why a module's pipeline stopped
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("Tests failed in {module}: {}", join(.failures))]
    TestFailure {
        module: String,
        failures: Vec<FailedTest>,
    },

    #[error("Coverage could not be computed for {module}: {message}")]
    CoverageComputation { module: String, message: String },

    #[error("Coverage rules violated in {module}: {}", join(.violations))]
    CoverageViolation {
        module: String,
        violations: Vec<Violation>,
    },

    #[error("Stage {stage} cannot run: {reason}")]
    StageOrder { stage: String, reason: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::TestFailure { .. } => "test_failure",
            PipelineError::CoverageComputation { .. } => "coverage_computation",
            PipelineError::CoverageViolation { .. } => "coverage_violation",
            PipelineError::StageOrder { .. } => "stage_order",
            PipelineError::Transition(_) => "transition",
        }
    }

    /// One line per failed test or violated limit
    pub fn details(&self) -> Vec<String> {
        match self {
            PipelineError::TestFailure { failures, .. } => {
                failures.iter().map(|f| f.to_string()).collect()
            }
            PipelineError::CoverageViolation { violations, .. } => {
                violations.iter().map(|v| v.to_string()).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
