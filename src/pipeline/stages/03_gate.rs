use crate::error::PipelineError;
use crate::gate::{evaluate, CoverageRule};
use crate::pipeline::context::ModuleContext;
use crate::pipeline::stage::Stage;
use crate::pipeline::state::ModuleState;
use async_trait::async_trait;
use tracing::{info, warn};

pub const NAME: &str = "gate";

pub struct GateStage;

#[async_trait]
impl Stage for GateStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> ModuleState {
        ModuleState::Gating
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[super::collect::NAME]
    }

    async fn execute(&self, context: &mut ModuleContext) -> Result<(), PipelineError> {
        let module = context.module.name.clone();

        let Some(report) = &context.report else {
            return Err(PipelineError::StageOrder {
                stage: NAME.to_string(),
                reason: "no finalized coverage report".to_string(),
            });
        };

        let rules = context
            .settings
            .rules
            .iter()
            .map(|r| r.compile(&context.module.group))
            .collect::<Result<Vec<CoverageRule>, _>>()
            .map_err(|e| PipelineError::CoverageComputation {
                module: module.clone(),
                message: format!("Invalid rule scope: {}", e),
            })?;

        let result = evaluate(report, &rules);

        if result.is_satisfied() {
            info!(
                module = %module,
                checked = result.checked,
                skipped = result.skipped,
                "Coverage rules satisfied"
            );
            context.gate = Some(result);
            return Ok(());
        }

        for violation in &result.violations {
            warn!(module = %module, "{}", violation);
        }
        let violations = result.violations.clone();
        context.gate = Some(result);

        Err(PipelineError::CoverageViolation { module, violations })
    }
}
