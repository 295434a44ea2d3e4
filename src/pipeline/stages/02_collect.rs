use crate::coverage::collector::CoverageCollector;
use crate::coverage::render::write_reports;
use crate::coverage::trace::read_trace;
use crate::error::PipelineError;
use crate::pipeline::context::ModuleContext;
use crate::pipeline::stage::Stage;
use crate::pipeline::state::ModuleState;
use async_trait::async_trait;
use tracing::info;

pub const NAME: &str = "collect";

pub struct CollectStage;

#[async_trait]
impl Stage for CollectStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> ModuleState {
        ModuleState::Collecting
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[super::test::NAME]
    }

    async fn execute(&self, context: &mut ModuleContext) -> Result<(), PipelineError> {
        let module = context.module.name.clone();

        let trace_path = match &context.test_outcome {
            Some(outcome) if outcome.is_success() => outcome.trace_path.clone(),
            Some(_) => {
                return Err(PipelineError::StageOrder {
                    stage: NAME.to_string(),
                    reason: "the test run did not pass".to_string(),
                })
            }
            None => {
                return Err(PipelineError::StageOrder {
                    stage: NAME.to_string(),
                    reason: "the test run has not completed".to_string(),
                })
            }
        };

        let computation_error = |message: String| PipelineError::CoverageComputation {
            module: module.clone(),
            message,
        };

        let trace = read_trace(
            &trace_path,
            context.settings.trace_format,
            &context.settings.source_roots,
        )
        .map_err(|e| computation_error(e.to_string()))?;

        let collector = CoverageCollector::new(&context.settings.exclusions)
            .map_err(|e| computation_error(format!("Invalid exclusion pattern: {}", e)))?;
        let report = collector
            .collect(&module, trace)
            .map_err(|e| computation_error(e.to_string()))?;

        let written = write_reports(&report, &context.module.report_dir, context.settings.reports)
            .map_err(|e| computation_error(format!("{:#}", e)))?;

        info!(
            module = %module,
            classes = report.classes.len(),
            excluded = report.excluded.len(),
            reports = written.len(),
            dir = %context.module.report_dir.display(),
            "Coverage report written"
        );

        context.report = Some(report);
        context.report_files = written;
        Ok(())
    }
}
