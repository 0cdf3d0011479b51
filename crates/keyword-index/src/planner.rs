use curator_protocol::{ConceptToken, TokenType};
use std::collections::HashSet;

/// Fixed query templates, substituted from whichever tokens are present.
const TEMPLATES: &[&[TokenType]] = &[
    &[TokenType::Brand, TokenType::Product],
    &[TokenType::Brand, TokenType::Color, TokenType::Product],
    &[TokenType::Product, TokenType::Size],
    &[TokenType::Color, TokenType::Product, TokenType::Size],
    &[TokenType::Product, TokenType::UseCase],
    &[TokenType::Brand, TokenType::Material, TokenType::Product],
    &[TokenType::Brand, TokenType::Fragrance, TokenType::Product],
];

/// Deterministic retrieval-query generation from the normalized token set.
pub struct QueryPlanner {
    max_queries: usize,
    suggested_quota: usize,
}

impl QueryPlanner {
    #[must_use]
    pub const fn new(max_queries: usize, suggested_quota: usize) -> Self {
        Self {
            max_queries,
            suggested_quota,
        }
    }

    /// Enumerate template queries. Templates with a missing token type are
    /// skipped; duplicates are removed case-insensitively.
    #[must_use]
    pub fn plan(&self, tokens: &[ConceptToken]) -> Vec<String> {
        let mut queries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for template in TEMPLATES {
            let Some(query) = substitute(template, tokens) else {
                continue;
            };
            if seen.insert(query.to_lowercase()) {
                queries.push(query);
            }
            if queries.len() >= self.max_queries {
                break;
            }
        }

        log::debug!("planned {} retrieval queries", queries.len());
        queries
    }

    /// Merge externally suggested queries under the configured quota. Only
    /// phrases of at least two words are accepted; the overall cap still
    /// applies. Safe with an empty suggestion list, so the caller's
    /// deterministic fallback is simply `&[]`.
    #[must_use]
    pub fn merge_suggestions(&self, mut queries: Vec<String>, suggestions: &[String]) -> Vec<String> {
        let mut seen: HashSet<String> = queries.iter().map(|q| q.to_lowercase()).collect();
        let mut accepted = 0usize;

        for suggestion in suggestions {
            if accepted >= self.suggested_quota || queries.len() >= self.max_queries {
                break;
            }
            let trimmed = suggestion.trim();
            if trimmed.split_whitespace().count() < 2 {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                queries.push(trimmed.to_string());
                accepted += 1;
            }
        }

        if accepted > 0 {
            log::debug!("merged {accepted} suggested queries");
        }
        queries
    }
}

fn substitute(template: &[TokenType], tokens: &[ConceptToken]) -> Option<String> {
    let mut parts = Vec::with_capacity(template.len());
    for token_type in template {
        let token = tokens.iter().find(|t| t.token_type == *token_type)?;
        parts.push(token.canonical_value.clone());
    }
    Some(parts.join(" "))
}
