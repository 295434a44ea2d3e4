//! Runs module pipelines side by side
//!
//! At most `jobs` modules are in flight at once. Modules share nothing but
//! the executor and the progress handler, and one module failing never
//! cancels another.

use super::context::ModuleContext;
use super::orchestrator::{ModuleOutcome, ModulePipeline};
use super::state::ModuleState;
use crate::config::ModuleSettings;
use crate::error::PipelineError;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runner::TestExecutor;
use crate::workspace::Module;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

pub const EXIT_PASSED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub modules: Vec<ModuleOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.modules.iter().filter(|m| m.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.modules.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_PASSED
        } else {
            EXIT_FAILED
        }
    }

    pub fn outcome(&self, module: &str) -> Option<&ModuleOutcome> {
        self.modules.iter().find(|m| m.module == module)
    }
}

pub struct Scheduler {
    jobs: usize,
    pipeline: Arc<ModulePipeline>,
    executor: Arc<dyn TestExecutor>,
    progress: Arc<dyn ProgressHandler>,
}

impl Scheduler {
    pub fn new(
        jobs: usize,
        executor: Arc<dyn TestExecutor>,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            jobs: jobs.max(1),
            pipeline: Arc::new(ModulePipeline::standard()),
            executor,
            progress,
        }
    }

    pub fn with_pipeline(mut self, pipeline: ModulePipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Runs every module and returns outcomes in input order.
    pub async fn run(&self, modules: Vec<(Module, ModuleSettings)>) -> RunSummary {
        let start = Instant::now();
        let started_at = Utc::now();
        let names: Vec<String> = modules.iter().map(|(m, _)| m.name.clone()).collect();

        self.progress.on_progress(&ProgressEvent::RunStarted {
            modules: modules.len(),
            jobs: self.jobs,
        });

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();

        for (module, settings) in modules {
            let semaphore = semaphore.clone();
            let pipeline = self.pipeline.clone();
            let executor = self.executor.clone();
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let name = module.name.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return aborted(name, "worker pool closed"),
                };
                let context = ModuleContext::new(module, settings, executor);
                pipeline.run(context, progress.as_ref()).await
            });
        }

        let mut finished: Vec<ModuleOutcome> = Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => finished.push(outcome),
                Err(e) => error!(error = %e, "Module task did not complete"),
            }
        }

        let modules: Vec<ModuleOutcome> = names
            .iter()
            .map(|name| {
                finished
                    .iter()
                    .position(|o| &o.module == name)
                    .map(|idx| finished.swap_remove(idx))
                    .unwrap_or_else(|| aborted(name.clone(), "module task panicked"))
            })
            .collect();

        let summary = RunSummary {
            started_at,
            modules,
            duration: start.elapsed(),
        };

        self.progress.on_progress(&ProgressEvent::RunCompleted {
            passed: summary.passed(),
            failed: summary.failed(),
            total_time: summary.duration,
        });

        summary
    }
}

fn aborted(module: String, reason: &str) -> ModuleOutcome {
    ModuleOutcome {
        error: Some(PipelineError::StageOrder {
            stage: "schedule".to_string(),
            reason: reason.to_string(),
        }),
        module,
        state: ModuleState::Failed,
        history: vec![ModuleState::Pending, ModuleState::Failed],
        tests: None,
        gate: None,
        report_files: Vec::new(),
        duration: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CovgateConfig;
    use crate::pipeline::stage::Stage;
    use crate::runner::ProcessTestExecutor;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Step(&'static str, ModuleState, bool);

    #[async_trait]
    impl Stage for Step {
        fn name(&self) -> &'static str {
            self.0
        }
        fn state(&self) -> ModuleState {
            self.1
        }
        async fn execute(&self, context: &mut ModuleContext) -> Result<(), PipelineError> {
            if self.2 && context.module.name == "broken" {
                panic!("stage blew up");
            }
            Ok(())
        }
    }

    fn pipeline(panics: bool) -> ModulePipeline {
        ModulePipeline::with_stages(vec![
            Box::new(Step("a", ModuleState::Testing, false)),
            Box::new(Step("b", ModuleState::Collecting, panics)),
            Box::new(Step("c", ModuleState::Gating, false)),
        ])
        .unwrap()
    }

    fn modules(dir: &TempDir, names: &[&str]) -> Vec<(Module, ModuleSettings)> {
        let config = CovgateConfig::default();
        names
            .iter()
            .map(|name| {
                let module = Module::new(*name, dir.path().join(name), "com.acme");
                let settings = config.settings_for(&module, dir.path());
                (module, settings)
            })
            .collect()
    }

    fn scheduler(jobs: usize) -> Scheduler {
        Scheduler::new(
            jobs,
            Arc::new(ProcessTestExecutor::new()),
            Arc::new(crate::progress::NoOpHandler),
        )
    }

    #[test]
    fn test_jobs_at_least_one() {
        assert_eq!(scheduler(0).jobs(), 1);
        assert_eq!(scheduler(4).jobs(), 4);
    }

    #[tokio::test]
    async fn test_custom_pipeline() {
        let dir = TempDir::new().unwrap();
        let summary = scheduler(2)
            .with_pipeline(pipeline(false))
            .run(modules(&dir, &["libs", "catalog"]))
            .await;

        assert!(summary.is_success());
        assert_eq!(summary.exit_code(), EXIT_PASSED);
        assert_eq!(summary.modules.len(), 2);
    }

    #[tokio::test]
    async fn test_panicking_module_reported_as_failed() {
        let dir = TempDir::new().unwrap();
        let summary = scheduler(2)
            .with_pipeline(pipeline(true))
            .run(modules(&dir, &["libs", "broken", "catalog"]))
            .await;

        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.exit_code(), EXIT_FAILED);

        let broken = summary.outcome("broken").unwrap();
        assert_eq!(broken.state, ModuleState::Failed);
        assert_eq!(summary.modules[1].module, "broken");
        assert!(matches!(
            broken.error,
            Some(PipelineError::StageOrder { ref stage, .. }) if stage == "schedule"
        ));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let summary = scheduler(1).run(Vec::new()).await;
        assert!(summary.is_success());
        assert_eq!(summary.passed(), 0);
    }
}
