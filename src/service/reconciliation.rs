//! Consensus derivation and profile aggregate recomputation (spec.md §4.3.3/§4.3.4).

use diesel::pg::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use crate::common::{CallState, ConsensusState, VariantStatus, VariantType};
use crate::err::{EngineError, EngineResult};
use crate::model::{Source, SourceCall, Variant};
use crate::repo;

/// The reconciled outcome for one variant, pure data so it can be computed and
/// tested without a database (spec.md §8, "testable properties").
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOutcome {
    pub consensus_allele: Option<String>,
    pub consensus_state: Option<ConsensusState>,
    pub status: VariantStatus,
    pub confidence_score: f64,
    pub concordant_count: i32,
    pub discordant_count: i32,
    pub source_count: i32,
}

/// One source call paired with its source's base concordance weight, the only piece
/// of the source record the tie-break rule (step 3) needs.
#[derive(Debug, Clone)]
pub struct WeightedCall<'a> {
    pub call: &'a SourceCall,
    pub source_base_weight: f64,
}

/// Implements spec.md §4.3.3 steps 1–8 over a fixed set of evidence.
pub fn derive_consensus(calls: &[WeightedCall<'_>], is_in_tree: bool) -> ConsensusOutcome {
    let evidence: Vec<&WeightedCall> = calls
        .iter()
        .filter(|c| c.call.call_state != CallState::NoCall)
        .collect();

    if evidence.is_empty() {
        return ConsensusOutcome {
            consensus_allele: None,
            consensus_state: None,
            status: VariantStatus::NoCoverage,
            confidence_score: 0.0,
            concordant_count: 0,
            discordant_count: 0,
            source_count: 0,
        };
    }

    // Step 2: W(a) per allele.
    let mut weight_by_allele: HashMap<&str, f64> = HashMap::new();
    for c in &evidence {
        *weight_by_allele
            .entry(c.call.called_allele.as_str())
            .or_insert(0.0) += c.call.concordance_weight;
    }
    let total_weight: f64 = weight_by_allele.values().sum();

    // Step 3: argmax W, tie-broken by source base weight, then DERIVED-over-ANCESTRAL,
    // then lexicographically smaller allele.
    let max_w = weight_by_allele
        .values()
        .cloned()
        .fold(f64::MIN, f64::max);
    let mut contenders: Vec<&str> = weight_by_allele
        .iter()
        .filter(|(_, w)| (**w - max_w).abs() < 1e-9)
        .map(|(a, _)| *a)
        .collect();
    contenders.sort_unstable();

    let best_source_weight_for = |allele: &str| -> f64 {
        evidence
            .iter()
            .filter(|c| c.call.called_allele == allele)
            .map(|c| c.source_base_weight)
            .fold(f64::MIN, f64::max)
    };
    let has_derived = |allele: &str| -> bool {
        evidence
            .iter()
            .any(|c| c.call.called_allele == allele && c.call.call_state == CallState::Derived)
    };

    let consensus_allele = contenders
        .iter()
        .cloned()
        .max_by(|a, b| {
            best_source_weight_for(a)
                .partial_cmp(&best_source_weight_for(b))
                .unwrap()
                .then_with(|| has_derived(a).cmp(&has_derived(b)))
                .then_with(|| b.cmp(a)) // smaller allele wins, so reverse for max_by
        })
        .unwrap()
        .to_string();

    // Step 4: consensus state — DERIVED wins if any winning call is DERIVED.
    let consensus_state = if has_derived(&consensus_allele) {
        ConsensusState::Derived
    } else {
        ConsensusState::Ancestral
    };

    // Step 5: concordant/discordant.
    let concordant_count = evidence
        .iter()
        .filter(|c| c.call.called_allele == consensus_allele)
        .count() as i32;
    let discordant_count = evidence.len() as i32 - concordant_count;

    // Step 6: confidence score.
    let confidence_score = if total_weight > 0.0 {
        weight_by_allele[consensus_allele.as_str()] / total_weight
    } else {
        0.0
    };

    // Step 7: status.
    let status = if discordant_count > 0 && confidence_score < 0.75 {
        VariantStatus::Conflict
    } else if is_in_tree {
        VariantStatus::Confirmed
    } else {
        VariantStatus::Novel
    };

    // Step 8: source count, by distinct source, over non-NO_CALL calls only.
    let source_count = evidence
        .iter()
        .map(|c| c.call.source_id)
        .collect::<std::collections::HashSet<_>>()
        .len() as i32;

    ConsensusOutcome {
        consensus_allele: Some(consensus_allele),
        consensus_state: Some(consensus_state),
        status,
        confidence_score,
        concordant_count,
        discordant_count,
        source_count,
    }
}

fn load_weighted_calls(
    conn: &mut PgConnection,
    calls: &[SourceCall],
) -> EngineResult<HashMap<Uuid, Source>> {
    let mut sources = HashMap::new();
    for call in calls {
        if sources.contains_key(&call.source_id) {
            continue;
        }
        let source = repo::source::find_by_id(conn, call.source_id)?.ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "source call references missing source {}",
                call.source_id
            ))
        })?;
        sources.insert(call.source_id, source);
    }
    Ok(sources)
}

/// Prior consensus triple captured before a recompute, for callers that need to
/// build their own audit row (e.g. `revert_override`) instead of the automated one
/// this module inserts itself.
pub struct PriorConsensus {
    pub allele: Option<String>,
    pub state: Option<ConsensusState>,
    pub status: VariantStatus,
}

/// Recomputes `variant_id`'s consensus from its live source calls and persists it,
/// without inserting any audit row — the caller decides what, if anything, to
/// audit. Returns the prior consensus triple, the saved variant, and whether the
/// consensus triple actually changed.
fn recompute_variant_consensus(
    conn: &mut PgConnection,
    variant_id: Uuid,
    is_in_tree: Option<bool>,
) -> EngineResult<(PriorConsensus, Variant, bool)> {
    let variant = repo::variant::find_by_id(conn, variant_id)?
        .ok_or_else(|| EngineError::NotFound(format!("variant {variant_id}")))?;
    let is_in_tree = is_in_tree.unwrap_or(variant.is_in_tree);

    let calls = repo::source_call::find_by_variant(conn, variant_id)?;
    let sources = load_weighted_calls(conn, &calls)?;
    let weighted: Vec<WeightedCall> = calls
        .iter()
        .map(|call| WeightedCall {
            call,
            source_base_weight: sources[&call.source_id].base_concordance_weight,
        })
        .collect();

    let outcome = derive_consensus(&weighted, is_in_tree);

    let changed = outcome.consensus_allele != variant.consensus_allele
        || outcome.consensus_state != variant.consensus_state
        || outcome.status != variant.status;

    let prior = PriorConsensus {
        allele: variant.consensus_allele.clone(),
        state: variant.consensus_state,
        status: variant.status,
    };

    let mut updated = variant.clone();
    updated.is_in_tree = is_in_tree;
    updated.consensus_allele = outcome.consensus_allele.clone();
    updated.consensus_state = outcome.consensus_state;
    updated.status = outcome.status;
    updated.confidence_score = outcome.confidence_score;
    updated.concordant_count = outcome.concordant_count;
    updated.discordant_count = outcome.discordant_count;
    updated.source_count = outcome.source_count;

    let saved = repo::variant::update(conn, &updated)?;
    Ok((prior, saved, changed))
}

/// Reconciles a single variant: recomputes its consensus, persists the change, and
/// — if the consensus actually changed — appends a `RECONCILE` audit row (spec.md
/// §4.3.3/§4.3.5). `is_in_tree` overrides the stored flag when supplied
/// (`reconcileVariant(variantId, isInTree?)`, spec.md §6).
pub fn reconcile_variant(
    conn: &mut PgConnection,
    variant_id: Uuid,
    is_in_tree: Option<bool>,
) -> EngineResult<Variant> {
    let (prior, saved, changed) = recompute_variant_consensus(conn, variant_id, is_in_tree)?;

    if changed {
        repo::audit::insert(
            conn,
            variant_id,
            crate::common::AuditAction::Reconcile,
            prior.allele,
            prior.state,
            Some(prior.status),
            saved.consensus_allele.clone(),
            saved.consensus_state,
            Some(saved.status),
            "automated reconciliation".to_string(),
            None,
        )?;
        tracing::debug!(%variant_id, status = %saved.status, "variant reconciled, consensus changed");
    } else {
        tracing::debug!(%variant_id, "variant reconciled, consensus unchanged");
    }

    Ok(saved)
}

/// Recomputes `variant_id`'s consensus without auditing the recompute itself — used
/// by [`crate::service::override_service::revert_override`], which writes its own
/// single `REVERT` audit row instead of letting the recompute add a `RECONCILE` row
/// too (spec.md §3: exactly one audit row per manual action).
pub(crate) fn reconcile_variant_unaudited(
    conn: &mut PgConnection,
    variant_id: Uuid,
    is_in_tree: Option<bool>,
) -> EngineResult<(PriorConsensus, Variant)> {
    let (prior, saved, _changed) = recompute_variant_consensus(conn, variant_id, is_in_tree)?;
    tracing::debug!(%variant_id, status = %saved.status, "variant consensus recomputed for revert");
    Ok((prior, saved))
}

/// Outcome of reconciling every variant of a profile (spec.md §4.3.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReconcileResult {
    pub reconciled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reconciles every variant of `profile_id`, then recomputes the profile's aggregate
/// counters and sets `last_reconciled_at` — all in the caller's transaction (spec.md
/// §4.3.4). Transient per-variant `VersionConflict`s are retried once, then skipped;
/// any other per-variant error aborts the whole batch.
pub fn reconcile_profile(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> EngineResult<(crate::model::Profile, BatchReconcileResult)> {
    let variants = repo::variant::find_by_profile(conn, profile_id)?;
    let mut result = BatchReconcileResult::default();

    for variant in &variants {
        let mut attempt = reconcile_variant(conn, variant.id, None);
        if matches!(attempt, Err(EngineError::VersionConflict(_))) {
            tracing::warn!(variant_id = %variant.id, "version conflict during reconcile, retrying once");
            attempt = reconcile_variant(conn, variant.id, None);
        }
        match attempt {
            Ok(_) => result.reconciled += 1,
            Err(EngineError::VersionConflict(_)) => {
                result.skipped += 1;
                tracing::warn!(variant_id = %variant.id, "version conflict persisted, skipping variant");
            }
            Err(e) => {
                result.failed += 1;
                return Err(e);
            }
        }
    }

    let profile = recompute_profile_aggregates(conn, profile_id)?;
    Ok((profile, result))
}

/// Recomputes `total_variants`, the status partition counts, STR marker counts, and
/// `source_count`, matching spec.md §3's invariants, and stamps `last_reconciled_at`.
pub fn recompute_profile_aggregates(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> EngineResult<crate::model::Profile> {
    let profile = repo::profile::find_by_id(conn, profile_id)?
        .ok_or_else(|| EngineError::NotFound(format!("profile {profile_id}")))?;
    let variants = repo::variant::find_by_profile(conn, profile_id)?;
    let sources = repo::source::find_by_profile(conn, profile_id)?;

    let mut updated = profile.clone();
    updated.total_variants = variants.len() as i32;
    updated.confirmed_count = variants
        .iter()
        .filter(|v| v.status == VariantStatus::Confirmed)
        .count() as i32;
    updated.novel_count = variants
        .iter()
        .filter(|v| v.status == VariantStatus::Novel)
        .count() as i32;
    updated.conflict_count = variants
        .iter()
        .filter(|v| v.status == VariantStatus::Conflict)
        .count() as i32;
    updated.no_coverage_count = variants
        .iter()
        .filter(|v| v.status == VariantStatus::NoCoverage)
        .count() as i32;
    updated.str_marker_count = variants
        .iter()
        .filter(|v| v.variant_type == VariantType::Str)
        .count() as i32;
    updated.str_confirmed_count = variants
        .iter()
        .filter(|v| v.variant_type == VariantType::Str && v.status == VariantStatus::Confirmed)
        .count() as i32;
    updated.source_count = sources.len() as i32;
    updated.primary_source_type = sources
        .iter()
        .max_by(|a, b| {
            a.base_concordance_weight
                .partial_cmp(&b.base_concordance_weight)
                .unwrap()
        })
        .map(|s| s.source_type);
    updated.last_reconciled_at = Some(chrono::Utc::now());

    repo::profile::update(conn, &updated)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::CallableState;
    use chrono::Utc;
    use uuid::Uuid;

    fn call(
        source_id: Uuid,
        allele: &str,
        state: CallState,
        weight: f64,
    ) -> SourceCall {
        SourceCall {
            id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            source_id,
            called_allele: allele.to_string(),
            call_state: state,
            called_repeat_count: None,
            read_depth: None,
            mapping_quality: None,
            variant_allele_frequency: None,
            callable_state: Some(CallableState::Callable),
            concordance_weight: weight,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_a_concordant_duplex_wgs() {
        let short = Uuid::new_v4();
        let long = Uuid::new_v4();
        let c1 = call(short, "A", CallState::Derived, 0.85);
        let c2 = call(long, "A", CallState::Derived, 0.90);
        let weighted = vec![
            WeightedCall { call: &c1, source_base_weight: 0.85 },
            WeightedCall { call: &c2, source_base_weight: 0.90 },
        ];
        let outcome = derive_consensus(&weighted, true);
        assert_eq!(outcome.consensus_allele.as_deref(), Some("A"));
        assert_eq!(outcome.consensus_state, Some(ConsensusState::Derived));
        assert_eq!(outcome.status, VariantStatus::Confirmed);
        assert_eq!(outcome.concordant_count, 2);
        assert_eq!(outcome.discordant_count, 0);
        assert!(float_cmp::approx_eq!(f64, outcome.confidence_score, 1.0, epsilon = 1e-9));
        assert_eq!(outcome.source_count, 2);
    }

    #[test]
    fn scenario_b_two_wgs_outweigh_one_ce() {
        let short = Uuid::new_v4();
        let long = Uuid::new_v4();
        let ce = Uuid::new_v4();
        let c1 = call(short, "A", CallState::Derived, 0.85);
        let c2 = call(long, "A", CallState::Derived, 0.90);
        let c3 = call(ce, "G", CallState::Derived, 0.40);
        let weighted = vec![
            WeightedCall { call: &c1, source_base_weight: 0.85 },
            WeightedCall { call: &c2, source_base_weight: 0.90 },
            WeightedCall { call: &c3, source_base_weight: 0.40 },
        ];
        let outcome = derive_consensus(&weighted, true);
        assert_eq!(outcome.consensus_allele.as_deref(), Some("A"));
        assert_eq!(outcome.concordant_count, 2);
        assert_eq!(outcome.discordant_count, 1);
        assert!(float_cmp::approx_eq!(
            f64,
            outcome.confidence_score,
            1.75 / 2.15,
            epsilon = 1e-6
        ));
        assert_eq!(outcome.status, VariantStatus::Confirmed);
    }

    #[test]
    fn scenario_c_ce_outweighs_wgs_for_str() {
        let ce = Uuid::new_v4();
        let short = Uuid::new_v4();
        let c1 = call(ce, "(GATA)13", CallState::Derived, 1.00);
        let c2 = call(short, "(GATA)14", CallState::Derived, 0.70);
        let weighted = vec![
            WeightedCall { call: &c1, source_base_weight: 1.00 },
            WeightedCall { call: &c2, source_base_weight: 0.70 },
        ];
        let outcome = derive_consensus(&weighted, false);
        assert_eq!(outcome.consensus_allele.as_deref(), Some("(GATA)13"));
    }

    #[test]
    fn scenario_d_conflict_below_threshold() {
        let short = Uuid::new_v4();
        let chip = Uuid::new_v4();
        let c1 = call(short, "A", CallState::Derived, 0.85);
        let c2 = call(chip, "G", CallState::Ancestral, 0.55);
        let weighted = vec![
            WeightedCall { call: &c1, source_base_weight: 0.85 },
            WeightedCall { call: &c2, source_base_weight: 0.55 },
        ];
        let outcome = derive_consensus(&weighted, false);
        assert_eq!(outcome.consensus_allele.as_deref(), Some("A"));
        assert!(float_cmp::approx_eq!(
            f64,
            outcome.confidence_score,
            0.85 / 1.40,
            epsilon = 1e-6
        ));
        assert_eq!(outcome.status, VariantStatus::Conflict);
    }

    #[test]
    fn all_no_call_yields_no_coverage() {
        let s1 = Uuid::new_v4();
        let c1 = call(s1, "N", CallState::NoCall, 0.0);
        let weighted = vec![WeightedCall { call: &c1, source_base_weight: 0.85 }];
        let outcome = derive_consensus(&weighted, false);
        assert_eq!(outcome.status, VariantStatus::NoCoverage);
        assert_eq!(outcome.consensus_allele, None);
        assert_eq!(outcome.source_count, 0);
    }

    #[test]
    fn single_source_call_round_trips_to_its_own_allele() {
        // Invariant 8: a single-source-call variant's consensus equals that call.
        let s1 = Uuid::new_v4();
        let c1 = call(s1, "T", CallState::Derived, 0.85);
        let weighted = vec![WeightedCall { call: &c1, source_base_weight: 0.85 }];
        let outcome = derive_consensus(&weighted, false);
        assert_eq!(outcome.consensus_allele.as_deref(), Some("T"));
        assert!(float_cmp::approx_eq!(f64, outcome.confidence_score, 1.0, epsilon = 1e-9));
    }
}
