//! Pipeline coordination and run summaries

pub mod coordinator;
pub mod summary;

pub use coordinator::Pipeline;
pub use summary::PipelineSummary;
