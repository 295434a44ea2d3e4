// Stages of the per-module pipeline, in execution order

#[path = "01_test.rs"]
pub mod test;
#[path = "02_collect.rs"]
pub mod collect;
#[path = "03_gate.rs"]
pub mod gate;

pub use collect::CollectStage;
pub use gate::GateStage;
pub use test::TestStage;
