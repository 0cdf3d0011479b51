use crate::token::TokenType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An attribute value recognized inside a retrieved keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedAttribute {
    pub token_type: TokenType,
    pub value: String,
}

/// A search phrase retrieved from the keyword index.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CandidateKeyword {
    pub text: String,

    /// Popularity / demand score from the corpus.
    pub raw_score: f32,

    /// Best cosine similarity across the queries that retrieved it.
    pub similarity: f32,

    /// Queries that retrieved this keyword.
    pub hit_queries: BTreeSet<String>,

    /// Attribute value detected in the phrase, if any.
    pub derived: Option<DerivedAttribute>,
}

impl CandidateKeyword {
    pub fn new(text: impl Into<String>, raw_score: f32, similarity: f32) -> Self {
        Self {
            text: text.into(),
            raw_score,
            similarity,
            hit_queries: BTreeSet::new(),
            derived: None,
        }
    }

    /// Builder: record the query that retrieved this keyword.
    #[must_use]
    pub fn hit_query(mut self, query: impl Into<String>) -> Self {
        self.hit_queries.insert(query.into());
        self
    }

    /// Merge a duplicate hit for the same keyword: keep the best scores and
    /// accumulate hit queries.
    pub fn absorb(&mut self, other: &Self) {
        if other.similarity > self.similarity {
            self.similarity = other.similarity;
        }
        if other.raw_score > self.raw_score {
            self.raw_score = other.raw_score;
        }
        self.hit_queries
            .extend(other.hit_queries.iter().cloned());
        if self.derived.is_none() {
            self.derived = other.derived.clone();
        }
    }
}

/// Why a candidate or token was dropped from the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum RejectReason {
    /// Conflicted with a truth attribute value.
    TruthConflict(String),
    /// Nothing left after conflicting words were stripped.
    EmptyAfterSanitize,
    /// Lost the champion/challenger contest in its semantic group.
    GroupDuplicate,
    /// Previously evicted-for-cause on this product (hysteresis).
    Hysteresis,
    /// Removed by the allocator to satisfy the length budget.
    Evicted,
    /// Matched the banned-term deny list.
    BannedTerm(String),
    /// Did not fit any zone budget.
    NoCapacity,
}

/// A dropped candidate, retained for the provenance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RejectedCandidate {
    pub text: String,
    pub reason: RejectReason,
}

impl RejectedCandidate {
    pub fn new(text: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            text: text.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absorb_keeps_best_scores_and_all_queries() {
        let mut a = CandidateKeyword::new("garbage bags", 0.4, 0.81).hit_query("q1");
        let b = CandidateKeyword::new("Garbage Bags", 0.6, 0.75).hit_query("q2");
        a.absorb(&b);
        assert_eq!(a.raw_score, 0.6);
        assert_eq!(a.similarity, 0.81);
        assert_eq!(a.hit_queries.len(), 2);
    }

    #[test]
    fn reject_reason_serializes_tagged() {
        let rejected = RejectedCandidate::new(
            "best garbage bags",
            RejectReason::BannedTerm("best".to_string()),
        );
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["reason"]["kind"], "banned_term");
        assert_eq!(json["reason"]["detail"], "best");
    }
}
