use crate::extract::Extraction;
use crate::patterns;
use curator_protocol::{
    ConceptToken, LockedSubstring, TokenId, TokenOrigin, TokenType, TruthAttributes, TruthConflict,
};

/// Value score assigned to tokens carrying an authoritative attribute.
const TRUTH_SCORE: f32 = 0.95;

/// Token set after truth reconciliation: exactly one active token per
/// truth-bearing type, locked substrings registered.
#[derive(Debug, Clone)]
pub struct NormalizedTitle {
    pub tokens: Vec<ConceptToken>,
    pub locked: Vec<LockedSubstring>,
    pub conflicts: Vec<TruthConflict>,
    pub next_id: u32,
}

/// Reconcile extracted tokens with authoritative attributes. Truth always
/// wins; conflicts are recorded, never fatal.
pub fn normalize(
    extraction: Extraction,
    truth: &TruthAttributes,
    raw_title: &str,
) -> NormalizedTitle {
    let mut next_id = extraction.next_id();
    let mut tokens = extraction.tokens;
    let mut conflicts = Vec::new();

    for (token_type, truth_value) in truth.iter() {
        reconcile_type(
            &mut tokens,
            &mut conflicts,
            &mut next_id,
            token_type,
            truth_value,
        );
    }

    // One active token per truth-bearing type, even without a truth value.
    dedupe_truth_bearing(&mut tokens);

    let locked = register_locked_substrings(&mut tokens, raw_title);

    log::debug!(
        "normalized to {} tokens, {} locked substrings, {} conflicts",
        tokens.len(),
        locked.len(),
        conflicts.len()
    );

    NormalizedTitle {
        tokens,
        locked,
        conflicts,
        next_id,
    }
}

fn reconcile_type(
    tokens: &mut Vec<ConceptToken>,
    conflicts: &mut Vec<TruthConflict>,
    next_id: &mut u32,
    token_type: TokenType,
    truth_value: &str,
) {
    let truth_canonical = canonical(truth_value);
    let existing = tokens.iter().position(|t| t.token_type == token_type);

    match existing {
        Some(index) => {
            let token = &mut tokens[index];
            if token.canonical_value != truth_canonical {
                conflicts.push(TruthConflict {
                    token_type,
                    title_value: token.surface_text.clone(),
                    truth_value: truth_value.to_string(),
                });
                log::info!(
                    "truth conflict on {}: title '{}' overridden by '{}'",
                    token_type.as_str(),
                    token.surface_text,
                    truth_value
                );
                let score = token.value_score.max(TRUTH_SCORE);
                token.replace_surface(truth_value, score);
                token.origin = TokenOrigin::Truth;
            } else {
                token.value_score = token.value_score.max(TRUTH_SCORE);
            }
            token.tier = 0;
        }
        None => {
            let token = ConceptToken::new(
                TokenId(*next_id),
                truth_value,
                token_type,
                TokenOrigin::Truth,
            )
            .tier(0)
            .value_score(TRUTH_SCORE);
            *next_id += 1;

            let insert_at = synthesized_position(tokens, token_type);
            tokens.insert(insert_at, token);
        }
    }
}

/// Synthesized truth tokens slot in after the product, so the seeded zone
/// order still reads naturally.
fn synthesized_position(tokens: &[ConceptToken], token_type: TokenType) -> usize {
    if token_type == TokenType::Brand {
        return 0;
    }
    tokens
        .iter()
        .position(|t| t.token_type == TokenType::Product)
        .map_or(tokens.len(), |i| i + 1)
}

fn dedupe_truth_bearing(tokens: &mut Vec<ConceptToken>) {
    let mut seen: Vec<TokenType> = Vec::new();
    tokens.retain(|token| {
        if !token.token_type.is_truth_bearing() {
            return true;
        }
        if seen.contains(&token.token_type) {
            log::debug!(
                "dropping duplicate {} token '{}'",
                token.token_type.as_str(),
                token.surface_text
            );
            false
        } else {
            seen.push(token.token_type);
            true
        }
    });
}

/// COUNT/DIMENSION spans must survive byte-identical. Prefer the exact span
/// from the raw title; fall back to the token's canonical rendering when the
/// title has no such span or truth overrode it.
fn register_locked_substrings(
    tokens: &mut [ConceptToken],
    raw_title: &str,
) -> Vec<LockedSubstring> {
    let mut locked = Vec::new();

    for (token_type, pattern) in [
        (TokenType::Count, &patterns::COUNT),
        (TokenType::Dimension, &patterns::DIMENSION),
    ] {
        let Some(token) = tokens.iter_mut().find(|t| t.token_type == token_type) else {
            continue;
        };

        let span = pattern
            .find(raw_title)
            .map(|m| m.as_str().trim().to_string())
            .filter(|span| canonical(span) == token.canonical_value);

        if let Some(span) = span {
            let score = token.value_score;
            token.replace_surface(span, score);
        }
        token.locked = true;
        token.tier = 0;
        locked.push(LockedSubstring::new(token_type, token.surface_text.clone()));
    }

    locked
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
    use crate::extract::extract;
    use pretty_assertions::assert_eq;

    const TITLE: &str = "Shalimar Premium (Lavender Fragrance) Scented Garbage Bags | Medium 19 X 21 Inches | 120 Bags (30 Bags X 4 Rolls) | Dustbin Bag/Trash Bag | (Black) - Perforated Box for Easy Dispensing";

    fn truth() -> TruthAttributes {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Brand, "Shalimar");
        truth.set(TokenType::Product, "Garbage Bags");
        truth.set(TokenType::Size, "Medium");
        truth.set(TokenType::Color, "Black");
        truth.set(TokenType::Count, "120 Bags (30 Bags x 4 Rolls)");
        truth.set(TokenType::Dimension, "19 x 21 Inches");
        truth
    }

    fn active(normalized: &NormalizedTitle, token_type: TokenType) -> Vec<&ConceptToken> {
        normalized
            .tokens
            .iter()
            .filter(|t| t.token_type == token_type)
            .collect()
    }

    #[test]
    fn one_active_token_per_truth_bearing_type() {
        let normalized = normalize(extract(TITLE), &truth(), TITLE);
        for ty in [
            TokenType::Brand,
            TokenType::Product,
            TokenType::Size,
            TokenType::Color,
            TokenType::Count,
            TokenType::Dimension,
        ] {
            assert_eq!(active(&normalized, ty).len(), 1, "type {}", ty.as_str());
        }
    }

    #[test]
    fn locked_substrings_are_byte_exact_title_spans() {
        let normalized = normalize(extract(TITLE), &truth(), TITLE);
        let texts: Vec<&str> = normalized.locked.iter().map(|l| l.text.as_str()).collect();
        // The raw title writes the multiplication sign as an uppercase X;
        // the locked span must preserve it even though truth spells it `x`.
        assert!(texts.contains(&"120 Bags (30 Bags X 4 Rolls)"));
        assert!(texts.contains(&"19 X 21 Inches"));

        let count = &active(&normalized, TokenType::Count)[0];
        assert!(count.locked);
        assert_eq!(count.tier, 0);
    }

    #[test]
    fn conflicting_value_is_overridden_and_recorded() {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Size, "Large");
        truth.set(TokenType::Color, "White");

        let normalized = normalize(extract(TITLE), &truth, TITLE);

        let size = &active(&normalized, TokenType::Size)[0];
        assert_eq!(size.surface_text, "Large");
        assert_eq!(size.origin, TokenOrigin::Truth);
        assert_eq!(size.tier, 0);

        let color = &active(&normalized, TokenType::Color)[0];
        assert_eq!(color.surface_text, "White");

        assert_eq!(normalized.conflicts.len(), 2);
        assert!(normalized
            .conflicts
            .iter()
            .any(|c| c.token_type == TokenType::Size && c.title_value == "Medium"));
    }

    #[test]
    fn missing_truth_token_is_synthesized_after_product() {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Capacity, "30 L");

        let normalized = normalize(extract("Acme Trash Bags Large"), &truth, "Acme Trash Bags Large");
        let capacity = active(&normalized, TokenType::Capacity);
        assert_eq!(capacity.len(), 1);
        assert_eq!(capacity[0].surface_text, "30 L");
        assert_eq!(capacity[0].origin, TokenOrigin::Truth);

        let product_pos = normalized
            .tokens
            .iter()
            .position(|t| t.token_type == TokenType::Product)
            .unwrap();
        let capacity_pos = normalized
            .tokens
            .iter()
            .position(|t| t.token_type == TokenType::Capacity)
            .unwrap();
        assert_eq!(capacity_pos, product_pos + 1);
    }

    #[test]
    fn dimension_fallback_renders_truth_value() {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Dimension, "19 x 21 Inches");

        let title = "Acme Trash Bags Large";
        let normalized = normalize(extract(title), &truth, title);
        let locked: Vec<&str> = normalized.locked.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(locked, vec!["19 x 21 Inches"]);
    }

    #[test]
    fn matching_value_keeps_base_title_origin() {
        let mut truth = TruthAttributes::new();
        truth.set(TokenType::Size, "Medium");

        let normalized = normalize(extract(TITLE), &truth, TITLE);
        let size = &active(&normalized, TokenType::Size)[0];
        assert_eq!(size.origin, TokenOrigin::BaseTitle);
        assert_eq!(size.tier, 0);
        assert!(normalized.conflicts.is_empty());
    }
}
