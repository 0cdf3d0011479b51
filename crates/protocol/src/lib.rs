mod candidate;
mod config;
mod report;
mod token;
mod truth;

pub use candidate::{CandidateKeyword, DerivedAttribute, RejectReason, RejectedCandidate};
pub use config::EngineConfig;
pub use report::{
    CompositionReport, LockedStatus, LockedSubstringCheck, TokenProvenance, ValidationReport,
    ZoneReport,
};
pub use token::{ConceptToken, GroupId, TokenId, TokenOrigin, TokenType, ZoneId};
pub use truth::{LockedSubstring, TruthAttributes, TruthConflict};

/// Schema version stamped into serialized composition reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;
