use crate::candidate::RejectedCandidate;
use crate::token::{TokenOrigin, TokenType, ZoneId};
use crate::truth::TruthConflict;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of one output zone after allocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ZoneReport {
    pub zone: ZoneId,
    pub budget_chars: usize,
    pub used_chars: usize,
    pub tokens: Vec<String>,
}

/// One surviving token's path through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TokenProvenance {
    pub surface_text: String,
    pub token_type: TokenType,
    pub origin: TokenOrigin,
    pub zone: Option<ZoneId>,
}

/// Outcome of the locked-substring pass for one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LockedStatus {
    /// Present exactly once before enforcement.
    Intact,
    /// Missing from the draft; inserted by the enforcer.
    Inserted,
    /// Appeared more than once; duplicates removed, first kept.
    Deduplicated,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LockedSubstringCheck {
    pub text: String,
    pub status: LockedStatus,
}

/// Byte-level guarantees checked on the final title.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    /// Final length in grapheme clusters.
    pub length: usize,

    /// Per truth-bearing type: does the output carry the truth value?
    pub truth_presence: BTreeMap<TokenType, bool>,

    /// Banned terms found (and removed) during enforcement.
    pub banned_term_hits: Vec<String>,

    pub locked_substrings: Vec<LockedSubstringCheck>,
}

impl ValidationReport {
    /// True when every truth value survived and every locked substring is
    /// accounted for.
    #[must_use]
    pub fn truth_intact(&self) -> bool {
        self.truth_presence.values().all(|present| *present)
    }
}

/// Full result of one composition run. Plain serializable records so an
/// external collaborator can persist per-stage snapshots keyed by run id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompositionReport {
    pub schema_version: u32,
    pub final_title: String,
    pub length: usize,
    pub zones: Vec<ZoneReport>,
    pub provenance: Vec<TokenProvenance>,
    pub conflicts: Vec<TruthConflict>,
    pub rejected: Vec<RejectedCandidate>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub validation: ValidationReport,
}
