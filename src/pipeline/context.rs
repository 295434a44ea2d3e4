use crate::config::ModuleSettings;
use crate::coverage::model::CoverageReport;
use crate::gate::GateResult;
use crate::runner::{TestExecutor, TestOutcome};
use crate::workspace::Module;
use std::path::PathBuf;
use std::sync::Arc;

/// State threaded through one module's stages. Each module owns its context.
pub struct ModuleContext {
    pub module: Module,
    pub settings: ModuleSettings,
    pub executor: Arc<dyn TestExecutor>,

    pub test_outcome: Option<TestOutcome>,
    pub report: Option<CoverageReport>,
    pub report_files: Vec<PathBuf>,
    pub gate: Option<GateResult>,
}

impl ModuleContext {
    pub fn new(module: Module, settings: ModuleSettings, executor: Arc<dyn TestExecutor>) -> Self {
        Self {
            module,
            settings,
            executor,
            test_outcome: None,
            report: None,
            report_files: Vec::new(),
            gate: None,
        }
    }
}
