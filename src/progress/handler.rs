//! Progress handler trait and events

use crate::pipeline::state::ModuleState;
use std::time::Duration;

/// Events emitted while modules move through their pipelines
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    RunStarted { modules: usize, jobs: usize },

    /// A worker picked up a module
    ModuleStarted { module: String },

    StageStarted { module: String, stage: String },

    StageComplete {
        module: String,
        stage: String,
        duration: Duration,
    },

    StageFailed {
        module: String,
        stage: String,
        error: String,
    },

    /// Module reached a terminal state
    ModuleFinished {
        module: String,
        state: ModuleState,
        duration: Duration,
    },

    /// Every module finished
    RunCompleted {
        passed: usize,
        failed: usize,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
