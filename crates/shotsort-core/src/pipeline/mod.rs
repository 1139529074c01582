//! Per-file pipeline: stages, reports and the batch orchestrator.

mod orchestrator;
pub mod report;
pub mod state;

pub use orchestrator::Orchestrator;
pub use report::{FileReport, FileStatus, RunReport};
pub use state::FileStage;
