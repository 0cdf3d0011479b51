use curator_engine::{EngineError, ZoneAllocator};
use curator_protocol::{ConceptToken, EngineConfig, TokenId, TokenOrigin, TokenType};
use proptest::prelude::*;

fn arb_token(id: u32) -> impl Strategy<Value = ConceptToken> {
    (
        "[a-z]{1,24}( [a-z]{1,12})?",
        0u8..=3,
        0.0f32..1.0,
        any::<bool>(),
    )
        .prop_map(move |(text, tier, score, lock_roll)| {
            // Only tier-0 tokens may be locked, as the normalizer produces.
            let locked = lock_roll && tier == 0;
            ConceptToken::new(TokenId(id), text, TokenType::Feature, TokenOrigin::BaseTitle)
                .tier(tier)
                .locked(locked)
                .value_score(score)
        })
}

fn arb_tokens() -> impl Strategy<Value = Vec<ConceptToken>> {
    prop::collection::vec(any::<u8>(), 1..16).prop_flat_map(|seeds| {
        seeds
            .into_iter()
            .enumerate()
            .map(|(i, _)| arb_token(i as u32 + 1))
            .collect::<Vec<_>>()
    })
}

proptest! {
    /// The allocator either reports infeasibility or produces a draft under
    /// the ceiling with every non-evictable token still placed.
    #[test]
    fn budget_and_lock_invariants(mut tokens in arb_tokens(), max in 20usize..120) {
        let config = EngineConfig {
            max_title_chars: max,
            min_title_chars: 0,
            ..Default::default()
        };
        let survivors: Vec<TokenId> = tokens.iter().map(|t| t.id).collect();
        let allocator = ZoneAllocator::new(&config);

        match allocator.allocate(&mut tokens, &survivors, &[]) {
            Ok(allocation) => {
                prop_assert!(allocation.total_chars <= max,
                    "total {} exceeds max {}", allocation.total_chars, max);

                for token in &tokens {
                    if !token.is_evictable() {
                        prop_assert!(!allocation.evicted.contains(&token.id),
                            "non-evictable token {:?} was evicted", token.id);
                    }
                }
            }
            Err(EngineError::BudgetInfeasible { required_chars, max_chars }) => {
                prop_assert!(required_chars > max_chars);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Allocation is deterministic: the same input always packs the same way.
    #[test]
    fn allocation_is_deterministic(tokens in arb_tokens(), max in 40usize..160) {
        let config = EngineConfig {
            max_title_chars: max,
            min_title_chars: 0,
            ..Default::default()
        };
        let survivors: Vec<TokenId> = tokens.iter().map(|t| t.id).collect();
        let allocator = ZoneAllocator::new(&config);

        let mut first = tokens.clone();
        let mut second = tokens.clone();
        let a = allocator.allocate(&mut first, &survivors, &[]);
        let b = allocator.allocate(&mut second, &survivors, &[]);

        match (a, b) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.zones.ordered_tokens(), b.zones.ordered_tokens());
                prop_assert_eq!(a.evicted, b.evicted);
                prop_assert_eq!(a.total_chars, b.total_chars);
            }
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "feasibility disagreed between runs"),
        }
    }
}
