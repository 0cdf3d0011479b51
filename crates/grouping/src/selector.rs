use crate::grouper::SemanticGroup;
use crate::stability::StabilityStore;
use curator_protocol::{
    ConceptToken, RejectReason, RejectedCandidate, TokenId, TokenOrigin, TruthAttributes,
};
use std::cmp::Ordering;

/// Outcome of champion/challenger selection: which tokens survive into
/// allocation and which were dropped, with reasons. Group runners-up stay
/// on the bench; the allocator may pull one back after an eviction.
#[derive(Debug, Clone)]
pub struct Selection {
    pub survivors: Vec<TokenId>,
    pub benched: Vec<TokenId>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Resolves each multi-member semantic group down to one representative.
pub struct ChampionSelector {
    margin: f32,
}

impl ChampionSelector {
    #[must_use]
    pub const fn new(margin: f32) -> Self {
        Self { margin }
    }

    /// Pick one survivor per group. An incumbent champion is only displaced
    /// when a challenger clears the replacement margin, passes truth
    /// constraints, and is not blocked by hysteresis. Replacement mutates
    /// the champion's surface and score in place, preserving tier and lock.
    pub fn select(
        &self,
        tokens: &mut [ConceptToken],
        groups: &[SemanticGroup],
        truth: &TruthAttributes,
        store: &dyn StabilityStore,
        product_id: &str,
    ) -> Selection {
        let mut selection = Selection {
            survivors: Vec::new(),
            benched: Vec::new(),
            rejected: Vec::new(),
        };

        for group in groups {
            self.select_in_group(tokens, group, truth, store, product_id, &mut selection);
        }

        log::debug!(
            "selection kept {} of {} tokens",
            selection.survivors.len(),
            tokens.len()
        );
        selection
    }

    fn select_in_group(
        &self,
        tokens: &mut [ConceptToken],
        group: &SemanticGroup,
        truth: &TruthAttributes,
        store: &dyn StabilityStore,
        product_id: &str,
        selection: &mut Selection,
    ) {
        let key = group.stable_key(tokens);
        let member_indices: Vec<usize> = group
            .members
            .iter()
            .filter_map(|id| tokens.iter().position(|t| t.id == *id))
            .collect();

        if member_indices.is_empty() {
            return;
        }
        if group.truth_critical || member_indices.len() == 1 {
            let index = member_indices[0];
            selection.survivors.push(tokens[index].id);
            store.record_choice(product_id, &key, &tokens[index].canonical_value);
            return;
        }

        let truth_value = truth.get(group.token_type).map(canonical);
        let previous_choice = store.chosen(product_id, &key);

        let incumbent = member_indices
            .iter()
            .copied()
            .find(|&i| previous_choice.as_deref() == Some(tokens[i].canonical_value.as_str()))
            .or_else(|| {
                member_indices
                    .iter()
                    .copied()
                    .find(|&i| tokens[i].origin == TokenOrigin::Truth)
            })
            .or_else(|| {
                member_indices
                    .iter()
                    .copied()
                    .find(|&i| tokens[i].origin == TokenOrigin::BaseTitle)
            });

        // Challengers ranked by score, then id for determinism.
        let mut challengers: Vec<usize> = member_indices
            .iter()
            .copied()
            .filter(|&i| Some(i) != incumbent)
            .collect();
        challengers.sort_by(|&a, &b| {
            tokens[b]
                .value_score
                .partial_cmp(&tokens[a].value_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| tokens[a].id.cmp(&tokens[b].id))
        });

        let mut eligible = Vec::new();
        for index in challengers {
            let token = &tokens[index];
            if let Some(required) = &truth_value {
                if token.canonical_value != *required {
                    selection.rejected.push(RejectedCandidate::new(
                        token.surface_text.clone(),
                        RejectReason::TruthConflict(required.clone()),
                    ));
                    continue;
                }
            }
            if store.is_blocked(product_id, &key, &token.canonical_value) {
                selection.rejected.push(RejectedCandidate::new(
                    token.surface_text.clone(),
                    RejectReason::Hysteresis,
                ));
                continue;
            }
            eligible.push(index);
        }

        let champion = match incumbent {
            Some(champion_index) => {
                if let Some(&best) = eligible.first() {
                    let required = tokens[champion_index].value_score * self.margin;
                    if tokens[best].value_score >= required {
                        let surface = tokens[best].surface_text.clone();
                        let score = tokens[best].value_score;
                        log::info!(
                            "challenger '{}' displaces '{}' ({:.3} >= {:.3})",
                            surface,
                            tokens[champion_index].surface_text,
                            score,
                            required
                        );
                        tokens[champion_index].replace_surface(surface, score);
                        eligible.retain(|&i| i != best);
                    }
                }
                bench_losers(tokens, &eligible, selection);
                Some(champion_index)
            }
            None => {
                let winner = eligible.first().copied();
                bench_losers(tokens, &eligible[1.min(eligible.len())..], selection);
                winner
            }
        };

        if let Some(champion_index) = champion {
            selection.survivors.push(tokens[champion_index].id);
            store.record_choice(product_id, &key, &tokens[champion_index].canonical_value);
        }
    }
}

/// Group losers keep their reject record but stay on the bench for the
/// allocator's local re-check and floor extension.
fn bench_losers(tokens: &[ConceptToken], indices: &[usize], selection: &mut Selection) {
    for &index in indices {
        selection.benched.push(tokens[index].id);
        selection.rejected.push(RejectedCandidate::new(
            tokens[index].surface_text.clone(),
            RejectReason::GroupDuplicate,
        ));
    }
}

fn canonical(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::SemanticGrouper;
    use crate::stability::MemoryStabilityStore;
    use curator_keyword_index::HashEmbedder;
    use curator_protocol::TokenType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn token(id: u32, text: &str, token_type: TokenType, origin: TokenOrigin) -> ConceptToken {
        ConceptToken::new(TokenId(id), text, token_type, origin)
    }

    async fn group_all(tokens: &mut [ConceptToken]) -> Vec<SemanticGroup> {
        SemanticGrouper::new(Arc::new(HashEmbedder::default()), 0.8)
            .group(tokens)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn low_scoring_challenger_never_displaces() {
        let mut tokens = vec![
            token(1, "garbage bags", TokenType::Product, TokenOrigin::BaseTitle)
                .value_score(0.41),
            token(2, "garbage bag", TokenType::Product, TokenOrigin::RetrievedKeyword)
                .value_score(0.02),
        ];
        let groups = group_all(&mut tokens).await;
        let store = MemoryStabilityStore::new();

        let selection = ChampionSelector::new(1.15).select(
            &mut tokens,
            &groups,
            &TruthAttributes::new(),
            &store,
            "p1",
        );

        assert_eq!(selection.survivors, vec![TokenId(1)]);
        assert_eq!(tokens[0].surface_text, "garbage bags");
        assert_eq!(selection.rejected.len(), 1);
        assert_eq!(selection.rejected[0].reason, RejectReason::GroupDuplicate);
    }

    #[tokio::test]
    async fn strong_challenger_replaces_surface_only() {
        let mut tokens = vec![
            token(1, "garbage bags", TokenType::Product, TokenOrigin::BaseTitle)
                .value_score(0.41)
                .tier(0),
            token(2, "garbage bag", TokenType::Product, TokenOrigin::RetrievedKeyword)
                .value_score(0.60),
        ];
        let groups = group_all(&mut tokens).await;
        let store = MemoryStabilityStore::new();

        let selection = ChampionSelector::new(1.15).select(
            &mut tokens,
            &groups,
            &TruthAttributes::new(),
            &store,
            "p1",
        );

        assert_eq!(selection.survivors, vec![TokenId(1)]);
        assert_eq!(tokens[0].surface_text, "garbage bag");
        assert_eq!(tokens[0].value_score, 0.60);
        assert_eq!(tokens[0].tier, 0);
        assert_eq!(tokens[0].origin, TokenOrigin::BaseTitle);
    }

    #[tokio::test]
    async fn truth_constrained_challenger_is_rejected() {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Product, "Garbage Bags");

        let mut tokens = vec![
            token(1, "garbage bags", TokenType::Product, TokenOrigin::BaseTitle)
                .value_score(0.41),
            token(2, "garbage bag", TokenType::Product, TokenOrigin::RetrievedKeyword)
                .value_score(0.99),
        ];
        let groups = group_all(&mut tokens).await;
        let store = MemoryStabilityStore::new();

        let selection =
            ChampionSelector::new(1.15).select(&mut tokens, &groups, &truth, &store, "p1");

        assert_eq!(tokens[0].surface_text, "garbage bags");
        assert!(matches!(
            selection.rejected[0].reason,
            RejectReason::TruthConflict(_)
        ));
    }

    /// Build one group over all tokens directly, bypassing the embedder.
    fn manual_group(tokens: &mut [ConceptToken], token_type: TokenType) -> Vec<SemanticGroup> {
        let id = curator_protocol::GroupId(1);
        for token in tokens.iter_mut() {
            token.semantic_group = Some(id);
        }
        vec![SemanticGroup {
            id,
            token_type,
            members: tokens.iter().map(|t| t.id).collect(),
            truth_critical: false,
        }]
    }

    #[tokio::test]
    async fn hysteresis_blocks_previously_evicted_challenger() {
        let store = MemoryStabilityStore::new();

        let mut tokens = vec![
            token(1, "lavender fragrance", TokenType::Fragrance, TokenOrigin::BaseTitle)
                .value_score(0.5),
            token(2, "lavender scent", TokenType::Fragrance, TokenOrigin::RetrievedKeyword)
                .value_score(0.9),
        ];
        let groups = manual_group(&mut tokens, TokenType::Fragrance);
        let key = groups[0].stable_key(&tokens);
        store.record_eviction("p1", &key, "lavender scent");

        let selection = ChampionSelector::new(1.15).select(
            &mut tokens,
            &groups,
            &TruthAttributes::new(),
            &store,
            "p1",
        );

        assert_eq!(tokens[0].surface_text, "lavender fragrance");
        assert_eq!(selection.rejected[0].reason, RejectReason::Hysteresis);
    }

    #[tokio::test]
    async fn previous_choice_becomes_the_incumbent() {
        let store = MemoryStabilityStore::new();

        let mut tokens = vec![
            token(1, "garbage bags", TokenType::Product, TokenOrigin::RetrievedKeyword)
                .value_score(0.41),
            token(2, "garbage bag", TokenType::Product, TokenOrigin::RetrievedKeyword)
                .value_score(0.45),
        ];
        let groups = group_all(&mut tokens).await;
        let key = groups[0].stable_key(&tokens);
        store.record_choice("p1", &key, "garbage bags");

        let selection = ChampionSelector::new(1.15).select(
            &mut tokens,
            &groups,
            &TruthAttributes::new(),
            &store,
            "p1",
        );

        // 0.45 < 0.41 * 1.15: the remembered representative holds.
        assert_eq!(selection.survivors, vec![TokenId(1)]);
        assert_eq!(tokens[0].surface_text, "garbage bags");
    }

    #[tokio::test]
    async fn incumbentless_group_promotes_top_scorer() {
        let mut tokens = vec![
            token(1, "for kitchen use", TokenType::UseCase, TokenOrigin::RetrievedKeyword)
                .value_score(0.3),
            token(2, "for kitchen usage", TokenType::UseCase, TokenOrigin::RetrievedKeyword)
                .value_score(0.7),
        ];
        let groups = manual_group(&mut tokens, TokenType::UseCase);
        let store = MemoryStabilityStore::new();

        let selection = ChampionSelector::new(1.15).select(
            &mut tokens,
            &groups,
            &TruthAttributes::new(),
            &store,
            "p1",
        );

        assert_eq!(selection.survivors, vec![TokenId(2)]);
    }
}
