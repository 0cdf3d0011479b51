use crate::token::TokenType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authoritative product attributes, supplied externally and immutable per
/// run. Partial maps are allowed; only truth-bearing types are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TruthAttributes {
    values: BTreeMap<TokenType, String>,
}

impl TruthAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one truth value. Returns false (and stores nothing) for types
    /// that cannot carry truth.
    pub fn set(&mut self, token_type: TokenType, value: impl Into<String>) -> bool {
        if !token_type.is_truth_bearing() {
            return false;
        }
        self.values.insert(token_type, value.into());
        true
    }

    #[must_use]
    pub fn get(&self, token_type: TokenType) -> Option<&str> {
        self.values.get(&token_type).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, token_type: TokenType) -> bool {
        self.values.contains_key(&token_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenType, &str)> {
        self.values.iter().map(|(ty, v)| (*ty, v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Drop any non-truth-bearing keys that arrived via deserialization.
    pub fn sanitize(&mut self) -> Vec<TokenType> {
        let dropped: Vec<TokenType> = self
            .values
            .keys()
            .copied()
            .filter(|ty| !ty.is_truth_bearing())
            .collect();
        self.values.retain(|ty, _| ty.is_truth_bearing());
        dropped
    }
}

impl FromIterator<(TokenType, String)> for TruthAttributes {
    fn from_iter<I: IntoIterator<Item = (TokenType, String)>>(iter: I) -> Self {
        let mut truth = Self::new();
        for (ty, value) in iter {
            truth.set(ty, value);
        }
        truth
    }
}

/// A verbatim span required to appear exactly once, byte-identical, in the
/// final output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LockedSubstring {
    pub token_type: TokenType,
    pub text: String,
}

impl LockedSubstring {
    pub fn new(token_type: TokenType, text: impl Into<String>) -> Self {
        Self {
            token_type,
            text: text.into(),
        }
    }
}

/// A title value that disagreed with truth; always resolved truth-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TruthConflict {
    pub token_type: TokenType,
    pub title_value: String,
    pub truth_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_non_truth_bearing_types() {
        let mut truth = TruthAttributes::new();
        assert!(truth.set(TokenType::Brand, "Shalimar"));
        assert!(truth.set(TokenType::Size, "Medium"));
        assert!(!truth.set(TokenType::Feature, "perforated"));
        assert_eq!(truth.len(), 2);
        assert_eq!(truth.get(TokenType::Brand), Some("Shalimar"));
        assert_eq!(truth.get(TokenType::Feature), None);
    }

    #[test]
    fn serializes_as_flat_map() {
        let truth: TruthAttributes = [
            (TokenType::Brand, "Shalimar".to_string()),
            (TokenType::Color, "Black".to_string()),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&truth).unwrap();
        assert_eq!(json["brand"], "Shalimar");
        assert_eq!(json["color"], "Black");
    }

    #[test]
    fn sanitize_drops_foreign_keys() {
        let json = r#"{"brand":"Shalimar","feature":"perforated"}"#;
        let mut truth: TruthAttributes = serde_json::from_str(json).unwrap();
        let dropped = truth.sanitize();
        assert_eq!(dropped, vec![TokenType::Feature]);
        assert_eq!(truth.len(), 1);
    }
}
