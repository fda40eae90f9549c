//! Verification phase: search execution, lazy result walking, and
//! reconciliation of server state against the loaded set

pub mod reconciler;
pub mod report;

pub use reconciler::{BundleWalker, EntryRole, Reconciler, ResourceEntry};
pub use report::{VerificationReport, Verifier};
