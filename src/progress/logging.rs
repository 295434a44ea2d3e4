//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::pipeline::state::ModuleState;
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { modules, jobs } => {
                info!(modules, jobs, "Starting coverage-gated run");
            }
            ProgressEvent::ModuleStarted { module } => {
                info!(module = %module, "Module started");
            }
            ProgressEvent::StageStarted { module, stage } => {
                debug!(module = %module, stage = %stage, "Starting stage");
            }
            ProgressEvent::StageComplete {
                module,
                stage,
                duration,
            } => {
                info!(
                    module = %module,
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::StageFailed {
                module,
                stage,
                error,
            } => {
                warn!(module = %module, stage = %stage, error = %error, "Stage failed");
            }
            ProgressEvent::ModuleFinished {
                module,
                state,
                duration,
            } => {
                if *state == ModuleState::Passed {
                    info!(
                        module = %module,
                        state = %state,
                        duration_ms = duration.as_millis(),
                        "Module finished"
                    );
                } else {
                    warn!(
                        module = %module,
                        state = %state,
                        duration_ms = duration.as_millis(),
                        "Module finished"
                    );
                }
            }
            ProgressEvent::RunCompleted {
                passed,
                failed,
                total_time,
            } => {
                info!(
                    passed,
                    failed,
                    total_time_ms = total_time.as_millis(),
                    "Run complete"
                );
            }
        }
    }
}
