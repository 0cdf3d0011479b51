use crate::allocator::{Allocation, ZoneAllocator};
use crate::error::{EngineError, Result};
use crate::validator::enforce;
use curator_agents::{
    call_with_fallback, AgentContext, CallPolicy, DisabledAgent, ExternalAgent,
};
use curator_extractor::{extract, normalize, vocab, NormalizedTitle};
use curator_grouping::{
    sanitize_candidate, ChampionSelector, Sanitized, SemanticGroup, SemanticGrouper,
    StabilityStore,
};
use curator_keyword_index::{Embedder, KeywordIndex, QueryPlanner};
use curator_protocol::{
    CandidateKeyword, CompositionReport, ConceptToken, EngineConfig, RejectReason,
    RejectedCandidate, TokenId, TokenOrigin, TokenProvenance, TruthAttributes, ValidationReport,
    ZoneReport, REPORT_SCHEMA_VERSION,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// One composition request: a raw title plus its authoritative attributes.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub product_id: String,
    pub raw_title: String,
    pub truth: TruthAttributes,
}

/// Cooperative cancellation, honored only at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The full curation pipeline: extraction, truth normalization, retrieval,
/// grouping and selection, zone allocation, and validation.
pub struct TitleEngine {
    config: EngineConfig,
    index: Arc<KeywordIndex>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn StabilityStore>,
    agent: Arc<dyn ExternalAgent>,
    agent_policy: CallPolicy,
}

impl TitleEngine {
    pub fn new(
        config: EngineConfig,
        index: Arc<KeywordIndex>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn StabilityStore>,
    ) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;
        Ok(Self {
            config,
            index,
            embedder,
            store,
            agent: Arc::new(DisabledAgent),
            agent_policy: CallPolicy::default(),
        })
    }

    /// Attach an external agent for query suggestions.
    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn ExternalAgent>, policy: CallPolicy) -> Self {
        self.agent = agent;
        self.agent_policy = policy;
        self
    }

    pub async fn compose(&self, request: &ComposeRequest) -> Result<CompositionReport> {
        self.compose_with_cancel(request, &CancelFlag::new()).await
    }

    /// Run the pipeline. Cancellation is checked between stages only; a
    /// stage that started always runs to completion.
    pub async fn compose_with_cancel(
        &self,
        request: &ComposeRequest,
        cancel: &CancelFlag,
    ) -> Result<CompositionReport> {
        stage_gate(cancel, "extraction")?;
        let extraction = extract(&request.raw_title);
        let mut warnings: Vec<String> = extraction
            .warnings
            .iter()
            .map(|w| format!("{}: '{}'", w.message, w.span))
            .collect();

        stage_gate(cancel, "normalization")?;
        let normalized = normalize(extraction, &request.truth, &request.raw_title);

        stage_gate(cancel, "retrieval")?;
        let (candidates, retrieval_warning) = self.retrieve(request, &normalized.tokens).await;
        if let Some(warning) = retrieval_warning {
            warnings.push(warning);
        }

        stage_gate(cancel, "grouping")?;
        let mut next_id = normalized.next_id;
        let mut tokens = normalized.tokens.clone();
        let mut rejected =
            admit_candidates(&candidates, &request.truth, &mut tokens, &mut next_id);

        let grouper = SemanticGrouper::new(
            Arc::clone(&self.embedder),
            self.config.similarity_threshold,
        );
        let groups = grouper.group(&mut tokens).await?;

        let selector = ChampionSelector::new(self.config.replacement_margin);
        let selection = selector.select(
            &mut tokens,
            &groups,
            &request.truth,
            self.store.as_ref(),
            &request.product_id,
        );
        rejected.extend(selection.rejected.iter().cloned());

        stage_gate(cancel, "allocation")?;
        let allocator = ZoneAllocator::new(&self.config);
        let allocation =
            allocator.allocate(&mut tokens, &selection.survivors, &selection.benched)?;
        self.record_evictions(&request.product_id, &tokens, &groups, &allocation);
        for id in &allocation.evicted {
            if let Some(token) = find(&tokens, *id) {
                rejected.push(RejectedCandidate::new(
                    token.surface_text.clone(),
                    RejectReason::Evicted,
                ));
            }
        }
        for id in &allocation.unplaced {
            if let Some(token) = find(&tokens, *id) {
                rejected.push(RejectedCandidate::new(
                    token.surface_text.clone(),
                    RejectReason::NoCapacity,
                ));
            }
        }

        stage_gate(cancel, "validation")?;
        let report = self.validate_and_report(
            &normalized,
            &tokens,
            &allocation,
            rejected,
            warnings,
            &request.truth,
        );
        log::info!(
            "composed title for product '{}': {} chars",
            request.product_id,
            report.length
        );
        Ok(report)
    }

    /// Plan queries, merge best-effort agent suggestions, and hit the index.
    /// Retrieval trouble is never fatal: the pipeline proceeds with whatever
    /// candidates arrived.
    async fn retrieve(
        &self,
        request: &ComposeRequest,
        tokens: &[ConceptToken],
    ) -> (Vec<CandidateKeyword>, Option<String>) {
        let planner = QueryPlanner::new(self.config.max_queries, self.config.suggested_query_quota);
        let planned = planner.plan(tokens);

        let context = AgentContext::new(
            request.product_id.clone(),
            json!({
                "task": "suggest_queries",
                "title": request.raw_title.clone(),
                "planned": planned.clone(),
            }),
        );
        let agent = Arc::clone(&self.agent);
        let suggestions = call_with_fallback(
            self.agent_policy,
            "suggest_queries",
            move || {
                let agent = Arc::clone(&agent);
                let context = context.clone();
                async move {
                    let value = agent.compose(&context).await?;
                    parse_suggestions(&value)
                }
            },
            Vec::new,
        )
        .await;

        let queries = planner.merge_suggestions(planned, &suggestions.into_inner());

        match self
            .index
            .search_many(&queries, self.config.k_per_query, self.config.max_total_candidates)
            .await
        {
            Ok(candidates) => (candidates, None),
            Err(err) => {
                log::warn!("retrieval failed, continuing with no candidates: {err}");
                (Vec::new(), Some(format!("retrieval unavailable: {err}")))
            }
        }
    }

    fn record_evictions(
        &self,
        product_id: &str,
        tokens: &[ConceptToken],
        groups: &[SemanticGroup],
        allocation: &Allocation,
    ) {
        for id in &allocation.evicted {
            let Some(token) = find(tokens, *id) else {
                continue;
            };
            let Some(group) = groups.iter().find(|g| Some(g.id) == token.semantic_group) else {
                continue;
            };
            self.store.record_eviction(
                product_id,
                &group.stable_key(tokens),
                &token.canonical_value,
            );
        }
    }

    fn validate_and_report(
        &self,
        normalized: &NormalizedTitle,
        tokens: &[ConceptToken],
        allocation: &Allocation,
        rejected: Vec<RejectedCandidate>,
        warnings: Vec<String>,
        truth: &TruthAttributes,
    ) -> CompositionReport {
        let ordered = allocation.zones.ordered_tokens();
        let draft = ordered
            .iter()
            .filter_map(|id| find(tokens, *id))
            .map(|t| t.surface_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let enforcement = enforce(&draft, &normalized.locked, &self.config.banned_terms);
        let length = enforcement.title.graphemes(true).count();

        let mut truth_presence = BTreeMap::new();
        let folded_title = enforcement.title.to_lowercase();
        for (token_type, value) in truth.iter() {
            truth_presence.insert(token_type, folded_title.contains(&value.to_lowercase()));
        }

        let zones = [&allocation.zones.a, &allocation.zones.b, &allocation.zones.c]
            .into_iter()
            .map(|zone| ZoneReport {
                zone: zone.id,
                budget_chars: zone.budget_chars,
                used_chars: zone.used_chars,
                tokens: zone
                    .tokens
                    .iter()
                    .filter_map(|id| find(tokens, *id))
                    .map(|t| t.surface_text.clone())
                    .collect(),
            })
            .collect();

        let provenance = ordered
            .iter()
            .filter_map(|id| find(tokens, *id))
            .map(|t| TokenProvenance {
                surface_text: t.surface_text.clone(),
                token_type: t.token_type,
                origin: t.origin,
                zone: t.zone,
            })
            .collect();

        CompositionReport {
            schema_version: REPORT_SCHEMA_VERSION,
            final_title: enforcement.title.clone(),
            length,
            zones,
            provenance,
            conflicts: normalized.conflicts.clone(),
            rejected,
            warnings,
            validation: ValidationReport {
                length,
                truth_presence,
                banned_term_hits: enforcement.banned_hits,
                locked_substrings: enforcement.locked_checks,
            },
        }
    }
}

fn stage_gate(cancel: &CancelFlag, stage: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        log::info!("composition cancelled before {stage}");
        return Err(EngineError::Cancelled { stage });
    }
    Ok(())
}

/// Turn sanitized candidates into concept tokens, rejecting the unusable
/// ones. Returns the reject records; admitted tokens are appended in place.
fn admit_candidates(
    candidates: &[CandidateKeyword],
    truth: &TruthAttributes,
    tokens: &mut Vec<ConceptToken>,
    next_id: &mut u32,
) -> Vec<RejectedCandidate> {
    let mut rejected = Vec::new();

    for candidate in candidates {
        let text = match sanitize_candidate(&candidate.text, truth) {
            Sanitized::Clean(text) => text,
            Sanitized::Rejected(reason) => {
                rejected.push(RejectedCandidate::new(candidate.text.clone(), reason));
                continue;
            }
        };

        let folded = text.to_lowercase();
        let token_type = match vocab::attribute_value(&text) {
            Some((token_type, _)) if token_type.is_truth_critical() => {
                // The normalizer's token already carries this signal.
                rejected.push(RejectedCandidate::new(
                    candidate.text.clone(),
                    RejectReason::GroupDuplicate,
                ));
                continue;
            }
            Some((token_type, _)) => token_type,
            None => match vocab::find_compound(&folded) {
                Some((start, end)) if end - start == folded.len() => {
                    curator_protocol::TokenType::Product
                }
                _ if folded.starts_with("for ") || folded.contains(" for ") => {
                    curator_protocol::TokenType::UseCase
                }
                _ => curator_protocol::TokenType::Feature,
            },
        };

        // A typed candidate that contradicts truth never enters the pool,
        // even if clustering would leave it alone in its group.
        if let Some(value) = truth.get(token_type) {
            let truth_canonical = value.to_lowercase();
            if folded != truth_canonical {
                rejected.push(RejectedCandidate::new(
                    candidate.text.clone(),
                    RejectReason::TruthConflict(truth_canonical),
                ));
                continue;
            }
        }

        if tokens.iter().any(|t| t.canonical_value == folded) {
            rejected.push(RejectedCandidate::new(
                candidate.text.clone(),
                RejectReason::GroupDuplicate,
            ));
            continue;
        }

        let score = candidate.raw_score.max(0.0) * candidate.similarity.clamp(0.0, 1.0);
        let token = ConceptToken::new(
            TokenId(*next_id),
            text,
            token_type,
            TokenOrigin::RetrievedKeyword,
        )
        .tier(2)
        .value_score(score);
        *next_id += 1;
        tokens.push(token);
    }

    rejected
}

fn parse_suggestions(value: &serde_json::Value) -> curator_agents::Result<Vec<String>> {
    let items = value
        .as_array()
        .or_else(|| value.get("queries").and_then(|v| v.as_array()))
        .ok_or_else(|| {
            curator_agents::AgentError::InvalidResponse("expected an array of queries".to_string())
        })?;
    Ok(items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect())
}

fn find(tokens: &[ConceptToken], id: TokenId) -> Option<&ConceptToken> {
    tokens.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_suggestions_accepts_array_and_object_forms() {
        let array = json!(["kitchen garbage bags", "dustbin bags large"]);
        assert_eq!(parse_suggestions(&array).unwrap().len(), 2);

        let object = json!({"queries": ["kitchen garbage bags"]});
        assert_eq!(parse_suggestions(&object).unwrap().len(), 1);

        assert!(parse_suggestions(&json!("not a list")).is_err());
    }

    #[test]
    fn admit_rejects_truth_critical_and_duplicate_candidates() {
        let mut truth = TruthAttributes::new();
        truth.set(curator_protocol::TokenType::Size, "Large");

        let mut tokens = vec![ConceptToken::new(
            TokenId(1),
            "garbage bags",
            curator_protocol::TokenType::Product,
            TokenOrigin::BaseTitle,
        )];
        let mut next_id = 2;

        let candidates = vec![
            CandidateKeyword::new("large", 0.5, 0.9),
            CandidateKeyword::new("garbage bags", 0.5, 0.9),
            CandidateKeyword::new("trash bags", 0.4, 0.8),
        ];
        let rejected = admit_candidates(&candidates, &truth, &mut tokens, &mut next_id);

        assert_eq!(rejected.len(), 2);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].surface_text, "trash bags");
        assert_eq!(tokens[1].origin, TokenOrigin::RetrievedKeyword);
    }

    #[test]
    fn cancel_flag_round_trip() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        assert!(stage_gate(&flag, "extraction").is_ok());

        flag.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(
            stage_gate(&flag, "retrieval"),
            Err(EngineError::Cancelled { stage: "retrieval" })
        ));
    }
}
