//! Load phase: idempotent batch construction, chunked submission, and
//! outcome analysis

pub mod batch;
pub mod outcome;
pub mod submit;

pub use batch::{BatchBuilder, BatchRequest, BundleType, UpsertOperation};
pub use outcome::{BatchOutcome, EntryOutcome, EntryStatus};
pub use submit::{ChunkedSubmitter, SubmitReport};
