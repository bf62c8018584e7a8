//! Meeting pipeline: stage values and the orchestrator that runs the stages in order.

pub mod cancel;
pub mod orchestrator;
pub mod types;

pub use cancel::CancelFlag;
pub use orchestrator::Pipeline;
pub use types::{
    ActionItem, PipelineResult, StageMethod, StageOutput, StageReport, StageReports, StageStatus,
    Summary, Transcript,
};
