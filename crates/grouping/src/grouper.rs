use crate::error::{CurationError, Result};
use crate::morphology::normalize_morphology;
use curator_keyword_index::Embedder;
use curator_protocol::{ConceptToken, GroupId, TokenId, TokenType};
use std::sync::Arc;

/// A cluster of near-synonymous tokens of one type; at most one member may
/// survive into the draft.
#[derive(Debug, Clone)]
pub struct SemanticGroup {
    pub id: GroupId,
    pub token_type: TokenType,
    pub members: Vec<TokenId>,
    /// Truth-critical groups are anchored on the normalizer's token and
    /// always keep exactly one member.
    pub truth_critical: bool,
}

impl SemanticGroup {
    /// Stable key for the hysteresis store: type plus the lexicographically
    /// smallest morphological form among members.
    #[must_use]
    pub fn stable_key(&self, tokens: &[ConceptToken]) -> String {
        let smallest = self
            .members
            .iter()
            .filter_map(|id| tokens.iter().find(|t| t.id == *id))
            .map(|t| normalize_morphology(&t.canonical_value))
            .min()
            .unwrap_or_default();
        format!("{}:{}", self.token_type.as_str(), smallest)
    }
}

/// Clusters same-type tokens by embedding similarity after morphological
/// folding. Single-link: a token joins the first group where it clears the
/// threshold against any member.
pub struct SemanticGrouper {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl SemanticGrouper {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
        }
    }

    /// Assign every token a semantic group, writing `semantic_group` back
    /// onto the tokens. Deterministic given token order.
    pub async fn group(&self, tokens: &mut [ConceptToken]) -> Result<Vec<SemanticGroup>> {
        let mut groups: Vec<SemanticGroup> = Vec::new();
        let mut next_group = 1u32;

        // Truth-critical tokens anchor singleton groups; retrieved
        // candidates of those types were sanitized away before grouping.
        for token in tokens.iter_mut() {
            if token.token_type.is_truth_critical() {
                let id = GroupId(next_group);
                next_group += 1;
                token.semantic_group = Some(id);
                groups.push(SemanticGroup {
                    id,
                    token_type: token.token_type,
                    members: vec![token.id],
                    truth_critical: true,
                });
            }
        }

        let open_indices: Vec<usize> = (0..tokens.len())
            .filter(|&i| !tokens[i].token_type.is_truth_critical())
            .collect();

        let morphs: Vec<String> = open_indices
            .iter()
            .map(|&i| normalize_morphology(&tokens[i].canonical_value))
            .collect();
        let morph_refs: Vec<&str> = morphs.iter().map(String::as_str).collect();
        let vectors = self
            .embedder
            .embed_batch(&morph_refs)
            .await
            .map_err(|e| CurationError::EmbeddingError(e.to_string()))?;

        // (group index in `groups`, member positions into open_indices)
        let mut open_groups: Vec<(usize, Vec<usize>)> = Vec::new();

        for (pos, &token_index) in open_indices.iter().enumerate() {
            let token_type = tokens[token_index].token_type;
            let mut joined = None;

            for (group_index, members) in &mut open_groups {
                if groups[*group_index].token_type != token_type {
                    continue;
                }
                let close = members.iter().any(|&other| {
                    morphs[other] == morphs[pos]
                        || cosine(&vectors[other], &vectors[pos]) >= self.threshold
                });
                if close {
                    members.push(pos);
                    joined = Some(*group_index);
                    break;
                }
            }

            match joined {
                Some(group_index) => {
                    let group = &mut groups[group_index];
                    group.members.push(tokens[token_index].id);
                    tokens[token_index].semantic_group = Some(group.id);
                }
                None => {
                    let id = GroupId(next_group);
                    next_group += 1;
                    tokens[token_index].semantic_group = Some(id);
                    groups.push(SemanticGroup {
                        id,
                        token_type,
                        members: vec![tokens[token_index].id],
                        truth_critical: false,
                    });
                    open_groups.push((groups.len() - 1, vec![pos]));
                }
            }
        }

        log::debug!("{} tokens clustered into {} groups", tokens.len(), groups.len());
        Ok(groups)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_keyword_index::HashEmbedder;
    use curator_protocol::TokenOrigin;
    use pretty_assertions::assert_eq;

    fn token(id: u32, text: &str, token_type: TokenType) -> ConceptToken {
        ConceptToken::new(TokenId(id), text, token_type, TokenOrigin::BaseTitle)
    }

    fn grouper(threshold: f32) -> SemanticGrouper {
        SemanticGrouper::new(Arc::new(HashEmbedder::default()), threshold)
    }

    #[tokio::test]
    async fn morphological_equals_always_merge() {
        let mut tokens = vec![
            token(1, "Garbage Bags", TokenType::Product),
            token(2, "garbage bag", TokenType::Product),
        ];
        let groups = grouper(0.99).group(&mut tokens).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(tokens[0].semantic_group, tokens[1].semantic_group);
    }

    #[tokio::test]
    async fn different_types_never_share_a_group() {
        let mut tokens = vec![
            token(1, "lavender", TokenType::Fragrance),
            token(2, "lavender", TokenType::Feature),
        ];
        let groups = grouper(0.5).group(&mut tokens).await.unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[tokio::test]
    async fn truth_critical_tokens_get_singleton_groups() {
        let mut tokens = vec![
            token(1, "Medium", TokenType::Size),
            token(2, "Black", TokenType::Color),
            token(3, "Garbage Bags", TokenType::Product),
        ];
        let groups = grouper(0.84).group(&mut tokens).await.unwrap();

        let critical: Vec<_> = groups.iter().filter(|g| g.truth_critical).collect();
        assert_eq!(critical.len(), 2);
        assert!(critical.iter().all(|g| g.members.len() == 1));
    }

    #[tokio::test]
    async fn overlapping_phrases_cluster_below_morph_equality() {
        let mut tokens = vec![
            token(1, "garbage bags for kitchen", TokenType::UseCase),
            token(2, "garbage bags for kitchen use", TokenType::UseCase),
            token(3, "for office", TokenType::UseCase),
        ];
        let groups = grouper(0.7).group(&mut tokens).await.unwrap();
        assert_eq!(tokens[0].semantic_group, tokens[1].semantic_group);
        assert_ne!(tokens[0].semantic_group, tokens[2].semantic_group);
        assert_eq!(groups.len(), 2);
    }

    #[tokio::test]
    async fn stable_key_is_order_independent() {
        let mut tokens_a = vec![
            token(1, "trash bags", TokenType::Product),
            token(2, "trash bag", TokenType::Product),
        ];
        let mut tokens_b = vec![
            token(1, "trash bag", TokenType::Product),
            token(2, "trash bags", TokenType::Product),
        ];
        let groups_a = grouper(0.9).group(&mut tokens_a).await.unwrap();
        let groups_b = grouper(0.9).group(&mut tokens_b).await.unwrap();
        assert_eq!(
            groups_a[0].stable_key(&tokens_a),
            groups_b[0].stable_key(&tokens_b)
        );
    }
}
