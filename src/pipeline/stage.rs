use super::context::ModuleContext;
use super::state::ModuleState;
use crate::error::PipelineError;
use async_trait::async_trait;

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// State the module is in while this stage runs
    fn state(&self) -> ModuleState;

    /// Stages that must have completed before this one starts
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, context: &mut ModuleContext) -> Result<(), PipelineError>;
}
