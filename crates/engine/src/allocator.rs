use crate::error::{EngineError, Result};
use crate::zones::{ZoneSet, SEPARATOR_COST};
use curator_protocol::{ConceptToken, EngineConfig, GroupId, TokenId, TokenType, ZoneId};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Result of zone allocation.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub zones: ZoneSet,
    /// Tokens removed to satisfy the global ceiling.
    pub evicted: Vec<TokenId>,
    /// Tokens that fit no zone budget.
    pub unplaced: Vec<TokenId>,
    /// Benched group members pulled back in after an eviction emptied or
    /// underfilled the draft.
    pub readded: Vec<TokenId>,
    pub total_chars: usize,
}

/// Multi-zone knapsack packer with eviction and floor extension.
pub struct ZoneAllocator {
    max_chars: usize,
    min_chars: usize,
    budgets: (usize, usize, usize),
}

impl ZoneAllocator {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_chars: config.max_title_chars,
            min_chars: config.min_title_chars,
            budgets: config.zone_budgets(),
        }
    }

    /// Pack survivors into zones. `survivors` are the selection winners;
    /// `benched` holds group runners-up that may be pulled back in when an
    /// eviction leaves their group empty or the title runs under the floor.
    pub fn allocate(
        &self,
        tokens: &mut [ConceptToken],
        survivors: &[TokenId],
        benched: &[TokenId],
    ) -> Result<Allocation> {
        self.check_feasibility(tokens, survivors)?;

        let mut zones = ZoneSet::new(self.budgets);
        let survivor_set: HashSet<TokenId> = survivors.iter().copied().collect();

        self.seed_zone_a(tokens, &survivor_set, &mut zones);
        let mut unplaced = self.fill_remaining(tokens, &survivor_set, &mut zones);

        let mut evicted = Vec::new();
        let mut readded = Vec::new();
        self.evict_to_ceiling(tokens, benched, &mut zones, &mut evicted, &mut readded);
        self.extend_to_floor(tokens, benched, &evicted, &mut zones, &mut readded);

        // Anything re-added is no longer unplaced.
        unplaced.retain(|id| !zones.contains(*id));

        for token in tokens.iter_mut() {
            token.zone = placement_of(&zones, token.id);
        }

        let total_chars = total_chars(tokens, &zones);
        log::debug!(
            "allocation: {} placed, {} evicted, {} unplaced, {} chars",
            zones.placed_count(),
            evicted.len(),
            unplaced.len(),
            total_chars
        );

        Ok(Allocation {
            zones,
            evicted,
            unplaced,
            readded,
            total_chars,
        })
    }

    /// Locked and tier-0 tokens must fit the global ceiling on their own;
    /// anything less is a configuration error, not a truncation.
    fn check_feasibility(&self, tokens: &[ConceptToken], survivors: &[TokenId]) -> Result<()> {
        let locked: Vec<&ConceptToken> = survivors
            .iter()
            .filter_map(|id| tokens.iter().find(|t| t.id == *id))
            .filter(|t| !t.is_evictable())
            .collect();
        if locked.is_empty() {
            return Ok(());
        }

        let required_chars: usize = locked.iter().map(|t| t.cost_chars).sum::<usize>()
            + (locked.len() - 1) * SEPARATOR_COST;
        if required_chars > self.max_chars {
            return Err(EngineError::BudgetInfeasible {
                required_chars,
                max_chars: self.max_chars,
            });
        }
        Ok(())
    }

    /// Seed Zone A with tier-0/1 tokens in canonical order; on overflow,
    /// demote the lowest-value non-locked seed to Zone B.
    fn seed_zone_a(
        &self,
        tokens: &[ConceptToken],
        survivors: &HashSet<TokenId>,
        zones: &mut ZoneSet,
    ) {
        let mut seeds: Vec<&ConceptToken> = tokens
            .iter()
            .filter(|t| survivors.contains(&t.id) && t.tier <= 1)
            .collect();
        seeds.sort_by(|a, b| {
            a.token_type
                .seed_rank()
                .cmp(&b.token_type.seed_rank())
                .then_with(|| a.id.cmp(&b.id))
        });

        for seed in &seeds {
            zones.a.place(seed.id, seed.cost_chars);
        }

        while zones.a.used_chars > zones.a.budget_chars {
            let Some(demote) = zones
                .a
                .tokens
                .iter()
                .filter_map(|id| tokens.iter().find(|t| t.id == *id))
                .filter(|t| t.is_evictable())
                .min_by(|a, b| {
                    a.value_score
                        .partial_cmp(&b.value_score)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                })
            else {
                break;
            };
            let (id, cost) = (demote.id, demote.cost_chars);
            zones.a.remove(id, cost);
            zones.b.place(id, cost);
            log::debug!("demoted token {:?} from Zone A to Zone B", id);
        }
    }

    /// Greedy value-density fill of Zones B then C with whatever survived
    /// selection but was not seeded.
    fn fill_remaining(
        &self,
        tokens: &[ConceptToken],
        survivors: &HashSet<TokenId>,
        zones: &mut ZoneSet,
    ) -> Vec<TokenId> {
        let mut remaining: Vec<&ConceptToken> = tokens
            .iter()
            .filter(|t| survivors.contains(&t.id) && !zones.contains(t.id))
            .collect();
        sort_by_density(&mut remaining);

        let mut unplaced = Vec::new();
        for token in remaining {
            if group_represented(tokens, zones, token.semantic_group, token.id) {
                continue;
            }
            if zones.b.fits(token.cost_chars) {
                zones.b.place(token.id, token.cost_chars);
            } else if zones.c.fits(token.cost_chars) {
                zones.c.place(token.id, token.cost_chars);
            } else {
                unplaced.push(token.id);
            }
        }
        unplaced
    }

    /// Evict lowest value-density evictable tokens, zones C then B then A,
    /// until the global ceiling holds. After each eviction the affected
    /// group is re-checked locally: a cheaper benched member may stand in
    /// so the signal is not lost entirely.
    fn evict_to_ceiling(
        &self,
        tokens: &[ConceptToken],
        benched: &[TokenId],
        zones: &mut ZoneSet,
        evicted: &mut Vec<TokenId>,
        readded: &mut Vec<TokenId>,
    ) {
        let mut regrouped: HashSet<GroupId> = HashSet::new();

        while total_chars(tokens, zones) > self.max_chars {
            let Some(victim) = self.pick_victim(tokens, zones) else {
                // Feasibility guaranteed this cannot strand us over budget.
                break;
            };
            let token = find(tokens, victim).expect("victim exists");
            let (group, cost, zone) = (
                token.semantic_group,
                token.cost_chars,
                placement_of(zones, victim).expect("victim placed"),
            );
            zones.zone_mut(zone).remove(victim, cost);
            evicted.push(victim);
            log::debug!("evicted token {:?} from Zone {}", victim, zone.as_str());

            if let Some(group_id) = group {
                self.recheck_group(
                    tokens, benched, zones, group_id, cost, &mut regrouped, readded,
                );
            }
        }
    }

    /// Local redundancy re-check for one group after an eviction: when no
    /// member remains placed, the cheapest strictly-cheaper benched member
    /// of a descriptive type is re-added, at most once per group.
    #[allow(clippy::too_many_arguments)]
    fn recheck_group(
        &self,
        tokens: &[ConceptToken],
        benched: &[TokenId],
        zones: &mut ZoneSet,
        group_id: GroupId,
        freed_cost: usize,
        regrouped: &mut HashSet<GroupId>,
        readded: &mut Vec<TokenId>,
    ) {
        if regrouped.contains(&group_id) {
            return;
        }
        let still_placed = tokens
            .iter()
            .any(|t| t.semantic_group == Some(group_id) && zones.contains(t.id));
        if still_placed {
            return;
        }

        let replacement = benched
            .iter()
            .filter_map(|id| find(tokens, *id))
            .filter(|t| {
                t.semantic_group == Some(group_id)
                    && matches!(
                        t.token_type,
                        TokenType::Fragrance | TokenType::Feature | TokenType::UseCase
                    )
                    && t.cost_chars < freed_cost
            })
            .min_by(|a, b| {
                a.cost_chars
                    .cmp(&b.cost_chars)
                    .then_with(|| a.id.cmp(&b.id))
            });

        if let Some(token) = replacement {
            if zones.c.fits(token.cost_chars) {
                zones.c.place(token.id, token.cost_chars);
                regrouped.insert(group_id);
                readded.push(token.id);
                log::debug!(
                    "re-added benched token {:?} to keep group {:?} represented",
                    token.id,
                    group_id
                );
            }
        }
    }

    /// Below the floor, extend Zone C with unused FEATURE/USE_CASE benched
    /// candidates under the usual exclusivity rule.
    fn extend_to_floor(
        &self,
        tokens: &[ConceptToken],
        benched: &[TokenId],
        evicted: &[TokenId],
        zones: &mut ZoneSet,
        readded: &mut Vec<TokenId>,
    ) {
        if total_chars(tokens, zones) >= self.min_chars {
            return;
        }

        let mut spares: Vec<&ConceptToken> = benched
            .iter()
            .filter_map(|id| find(tokens, *id))
            .filter(|t| {
                matches!(t.token_type, TokenType::Feature | TokenType::UseCase)
                    && !zones.contains(t.id)
                    && !evicted.contains(&t.id)
            })
            .collect();
        sort_by_density(&mut spares);

        for token in spares {
            if total_chars(tokens, zones) >= self.min_chars {
                break;
            }
            if group_represented(tokens, zones, token.semantic_group, token.id) {
                continue;
            }
            let projected = total_chars(tokens, zones)
                + token.cost_chars
                + usize::from(zones.placed_count() > 0) * SEPARATOR_COST;
            if zones.c.fits(token.cost_chars) && projected <= self.max_chars {
                zones.c.place(token.id, token.cost_chars);
                readded.push(token.id);
            }
        }
    }

    /// Lowest value-density evictable token, zones C first, then B, then A.
    fn pick_victim(&self, tokens: &[ConceptToken], zones: &ZoneSet) -> Option<TokenId> {
        for zone_id in [ZoneId::C, ZoneId::B, ZoneId::A] {
            let victim = zones
                .zone(zone_id)
                .tokens
                .iter()
                .filter_map(|id| find(tokens, *id))
                .filter(|t| t.is_evictable())
                .min_by(|a, b| {
                    a.value_density()
                        .partial_cmp(&b.value_density())
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.cost_chars.cmp(&b.cost_chars))
                        .then_with(|| a.id.cmp(&b.id))
                });
            if let Some(token) = victim {
                return Some(token.id);
            }
        }
        None
    }
}

fn find(tokens: &[ConceptToken], id: TokenId) -> Option<&ConceptToken> {
    tokens.iter().find(|t| t.id == id)
}

fn placement_of(zones: &ZoneSet, id: TokenId) -> Option<ZoneId> {
    [ZoneId::A, ZoneId::B, ZoneId::C]
        .into_iter()
        .find(|zone_id| zones.zone(*zone_id).tokens.contains(&id))
}

/// Rendered length: all placed token costs plus single separators.
fn total_chars(tokens: &[ConceptToken], zones: &ZoneSet) -> usize {
    let placed = zones.ordered_tokens();
    if placed.is_empty() {
        return 0;
    }
    let cost: usize = placed
        .iter()
        .filter_map(|id| find(tokens, *id))
        .map(|t| t.cost_chars)
        .sum();
    cost + (placed.len() - 1) * SEPARATOR_COST
}

/// Density-descending packing order with the deterministic tie-breaks:
/// shorter cost first, then earliest discovery order.
fn sort_by_density(tokens: &mut [&ConceptToken]) {
    tokens.sort_by(|a, b| {
        b.value_density()
            .partial_cmp(&a.value_density())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cost_chars.cmp(&b.cost_chars))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn group_represented(
    tokens: &[ConceptToken],
    zones: &ZoneSet,
    group: Option<GroupId>,
    except: TokenId,
) -> bool {
    let Some(group_id) = group else {
        return false;
    };
    tokens
        .iter()
        .any(|t| t.id != except && t.semantic_group == Some(group_id) && zones.contains(t.id))
}
