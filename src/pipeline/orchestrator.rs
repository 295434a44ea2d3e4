use super::context::ModuleContext;
use super::stage::Stage;
use super::stages::{CollectStage, GateStage, TestStage};
use super::state::{ModuleState, StateMachine};
use crate::error::PipelineError;
use crate::gate::GateResult;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runner::TestStatus;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Test counts carried into the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestCounts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleOutcome {
    pub module: String,
    pub state: ModuleState,
    pub history: Vec<ModuleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateResult>,
    pub report_files: Vec<PathBuf>,
    pub duration: Duration,
}

impl ModuleOutcome {
    pub fn passed(&self) -> bool {
        self.state == ModuleState::Passed
    }
}

/// Ordered stages for one module. Every dependency of a stage must appear
/// before it, so sequential execution always respects the graph.
pub struct ModulePipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ModulePipeline {
    /// Test, collect, gate.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(TestStage),
                Box::new(CollectStage),
                Box::new(GateStage),
            ],
        }
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Result<Self, PipelineError> {
        let mut seen: HashSet<&'static str> = HashSet::new();
        for stage in &stages {
            for dep in stage.depends_on() {
                if !seen.contains(dep) {
                    return Err(PipelineError::StageOrder {
                        stage: stage.name().to_string(),
                        reason: format!("depends on {}, which does not run before it", dep),
                    });
                }
            }
            if !seen.insert(stage.name()) {
                return Err(PipelineError::StageOrder {
                    stage: stage.name().to_string(),
                    reason: "declared more than once".to_string(),
                });
            }
        }
        Ok(Self { stages })
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order, stopping at the first failure.
    pub async fn run(
        &self,
        mut context: ModuleContext,
        progress: &dyn ProgressHandler,
    ) -> ModuleOutcome {
        let start = Instant::now();
        let module = context.module.name.clone();
        let mut machine = StateMachine::new();
        let mut error = None;

        progress.on_progress(&ProgressEvent::ModuleStarted {
            module: module.clone(),
        });

        for stage in &self.stages {
            if let Err(e) = machine.transition(stage.state()) {
                error = Some(PipelineError::from(e));
                break;
            }

            info!(module = %module, stage = stage.name(), "Stage");
            progress.on_progress(&ProgressEvent::StageStarted {
                module: module.clone(),
                stage: stage.name().to_string(),
            });

            let stage_start = Instant::now();
            match stage.execute(&mut context).await {
                Ok(()) => {
                    progress.on_progress(&ProgressEvent::StageComplete {
                        module: module.clone(),
                        stage: stage.name().to_string(),
                        duration: stage_start.elapsed(),
                    });
                    debug!(module = %module, stage = stage.name(), "Stage complete");
                }
                Err(e) => {
                    progress.on_progress(&ProgressEvent::StageFailed {
                        module: module.clone(),
                        stage: stage.name().to_string(),
                        error: e.to_string(),
                    });
                    error = Some(e);
                    break;
                }
            }
        }

        let terminal = if error.is_some() {
            ModuleState::Failed
        } else {
            ModuleState::Passed
        };
        if let Err(e) = machine.transition(terminal) {
            error.get_or_insert(PipelineError::from(e));
        }

        let outcome = ModuleOutcome {
            module: module.clone(),
            state: machine.state(),
            history: machine.into_history(),
            error,
            tests: context.test_outcome.as_ref().map(|o| TestCounts {
                passed: o.count(TestStatus::Passed),
                failed: o.count(TestStatus::Failed),
                errored: o.count(TestStatus::Errored),
                skipped: o.count(TestStatus::Skipped),
            }),
            gate: context.gate.take(),
            report_files: std::mem::take(&mut context.report_files),
            duration: start.elapsed(),
        };

        progress.on_progress(&ProgressEvent::ModuleFinished {
            module,
            state: outcome.state,
            duration: outcome.duration,
        });

        outcome
    }
}
