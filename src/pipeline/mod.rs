pub mod context;
pub mod orchestrator;
pub mod scheduler;
pub mod stage;
pub mod stages;
pub mod state;

pub use context::ModuleContext;
pub use orchestrator::{ModuleOutcome, ModulePipeline, TestCounts};
pub use scheduler::{RunSummary, Scheduler};
pub use stage::Stage;
pub use state::{ModuleState, StateMachine, TransitionError};
