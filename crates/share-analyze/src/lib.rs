//! Analysis for share.
//!
//! Everything here only reads: the content audit that catches pairs whose
//! timestamps agree but whose bytes do not, whole-tree status grouping, and
//! age formatting for reports.

mod age;
mod audit;
mod status;

pub use age::{format_age, format_since};
pub use audit::{
    AuditFinding, AuditOutcome, AuditReport, Auditor, CHUNK_SIZE, ContentHash, hash_file,
    hash_pair,
};
pub use status::{StatusReport, SyncState};
