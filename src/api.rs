//! Public façade: the spec.md §6 operation surface, one function per bullet, each
//! wrapping a [`crate::db::transactor::Transactor`] scoped transaction around the
//! repository/service layer beneath it. This is the crate's only public entry point
//! besides the plain data types in [`crate::model`] and [`crate::common`].

use uuid::Uuid;

use crate::common::{CallState, CallableState, ConsensusState, SourceType, VariantStatus, VariantType};
use crate::db::transactor::Transactor;
use crate::err::{EngineError, EngineResult};
use crate::model::{Alignment, Audit, Profile, Region, Source, SourceCall, Variant};
use crate::repo;
use crate::service::import::{import_variant_calls, ImportCall, ImportResult};
use crate::service::override_service;
use crate::service::query;
use crate::service::reconciliation::{self, BatchReconcileResult};
use crate::service::region_index::{self, CallableInterval, CallableSummary, IntervalIndex};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

pub fn get_or_create_profile(t: &Transactor, biosample_id: Uuid) -> EngineResult<Profile> {
    t.read_write(|conn| query::get_or_create_profile(conn, biosample_id))
}

pub fn get_profile(t: &Transactor, id: Uuid) -> EngineResult<Profile> {
    t.read_only(|conn| query::get_profile(conn, id))
}

pub fn get_profile_by_biosample(t: &Transactor, biosample_id: Uuid) -> EngineResult<Profile> {
    t.read_only(|conn| query::get_profile_by_biosample(conn, biosample_id))
}

pub fn reconcile_profile(
    t: &Transactor,
    id: Uuid,
) -> EngineResult<(Profile, BatchReconcileResult)> {
    t.read_write(|conn| reconciliation::reconcile_profile(conn, id))
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub fn add_source(
    t: &Transactor,
    profile_id: Uuid,
    source_type: SourceType,
    vendor: Option<String>,
    test_name: Option<String>,
    reference_build: Option<String>,
) -> EngineResult<Source> {
    t.read_write(|conn| {
        let snp_base = crate::common::weights::base_weight(source_type, VariantType::Snp)
            .ok_or_else(|| {
                EngineError::InvariantViolation(format!(
                    "{source_type:?} has no SNP-context base weight"
                ))
            })?;
        let method_tier = crate::common::weights::method_tier(snp_base);
        let source = repo::source::insert(
            conn,
            profile_id,
            source_type,
            vendor,
            test_name,
            reference_build,
            method_tier,
            snp_base,
        )?;
        reconciliation::recompute_profile_aggregates(conn, profile_id)?;
        Ok(source)
    })
}

pub fn remove_source(t: &Transactor, id: Uuid) -> EngineResult<bool> {
    t.read_write(|conn| {
        let source = repo::source::find_by_id(conn, id)?;
        let removed = repo::source::delete(conn, id)?;
        if let Some(source) = source {
            reconciliation::recompute_profile_aggregates(conn, source.profile_id)?;
        }
        Ok(removed)
    })
}

pub fn get_sources_for_profile(t: &Transactor, profile_id: Uuid) -> EngineResult<Vec<Source>> {
    t.read_only(|conn| repo::source::find_by_profile(conn, profile_id))
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Optional fields of `addVariantCall(profileId, sourceId, position, ref, alt,
/// called, state, …optional)` (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct AddVariantCallOptions {
    pub end_position: Option<i64>,
    pub variant_name: Option<String>,
    pub marker_name: Option<String>,
    pub called_repeat_count: Option<i32>,
    pub read_depth: Option<i32>,
    pub mapping_quality: Option<i32>,
    pub variant_allele_frequency: Option<f64>,
    pub callable_state: Option<CallableState>,
}

#[allow(clippy::too_many_arguments)]
pub fn add_variant_call(
    t: &Transactor,
    profile_id: Uuid,
    source_id: Uuid,
    position: i64,
    ref_allele: String,
    alt_allele: String,
    called_allele: String,
    call_state: CallState,
    variant_type: VariantType,
    options: AddVariantCallOptions,
) -> EngineResult<SourceCall> {
    t.read_write(|conn| {
        let source = repo::source::find_by_id(conn, source_id)?
            .ok_or_else(|| EngineError::NotFound(format!("source {source_id}")))?;
        let base = crate::common::weights::base_weight(source.source_type, variant_type)
            .ok_or_else(|| {
                EngineError::validation(
                    "variant_type",
                    format!("{:?} does not report {:?} variants", source.source_type, variant_type),
                )
            })?;
        let weight = crate::common::weights::effective_weight(
            base,
            options.callable_state,
            options.read_depth,
            options.mapping_quality,
        );

        let variant = repo::variant::find_or_create(
            conn,
            profile_id,
            position,
            options.end_position,
            &ref_allele,
            &alt_allele,
            variant_type,
            options.variant_name,
            options.marker_name,
        )?;

        let (call, _replaced) = repo::source_call::upsert(
            conn,
            repo::source_call::NewSourceCall {
                variant_id: variant.id,
                source_id,
                called_allele,
                call_state,
                called_repeat_count: options.called_repeat_count,
                read_depth: options.read_depth,
                mapping_quality: options.mapping_quality,
                variant_allele_frequency: options.variant_allele_frequency,
                callable_state: options.callable_state,
                concordance_weight: weight,
            },
        )?;
        Ok(call)
    })
}

pub fn import_variant_calls_api(
    t: &Transactor,
    profile_id: Uuid,
    source_id: Uuid,
    calls: Vec<ImportCall>,
) -> EngineResult<ImportResult> {
    t.read_write(|conn| import_variant_calls(conn, profile_id, source_id, calls))
}

pub fn get_variants(t: &Transactor, profile_id: Uuid) -> EngineResult<Vec<Variant>> {
    t.read_only(|conn| query::get_variants(conn, profile_id))
}

pub fn get_variant_calls(t: &Transactor, variant_id: Uuid) -> EngineResult<Vec<SourceCall>> {
    t.read_only(|conn| query::get_variant_calls(conn, variant_id))
}

pub fn reconcile_variant(
    t: &Transactor,
    variant_id: Uuid,
    is_in_tree: Option<bool>,
) -> EngineResult<Variant> {
    t.read_write(|conn| reconciliation::reconcile_variant(conn, variant_id, is_in_tree))
}

#[allow(clippy::too_many_arguments)]
pub fn override_variant(
    t: &Transactor,
    variant_id: Uuid,
    new_allele: String,
    new_state: ConsensusState,
    new_status: VariantStatus,
    reason: String,
    user_id: Option<String>,
) -> EngineResult<Variant> {
    t.read_write(|conn| {
        override_service::override_variant(
            conn,
            variant_id,
            new_allele,
            new_state,
            new_status,
            reason,
            user_id,
        )
    })
}

pub fn revert_override(
    t: &Transactor,
    variant_id: Uuid,
    reason: String,
    is_in_tree: Option<bool>,
) -> EngineResult<Variant> {
    t.read_write(|conn| override_service::revert_override(conn, variant_id, reason, is_in_tree))
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn add_alignment_to_source_call(
    t: &Transactor,
    source_call_id: Uuid,
    reference_build: String,
    position: i64,
    ref_allele: Option<String>,
    alt_allele: Option<String>,
    called_allele: Option<String>,
    read_depth: Option<i32>,
    mapping_quality: Option<i32>,
) -> EngineResult<Alignment> {
    t.read_write(|conn| {
        repo::alignment::upsert(
            conn,
            repo::alignment::NewAlignment {
                source_call_id,
                reference_build,
                position,
                ref_allele,
                alt_allele,
                called_allele,
                read_depth,
                mapping_quality,
            },
        )
    })
}

pub fn get_alignments(t: &Transactor, source_call_id: Uuid) -> EngineResult<Vec<Alignment>> {
    t.read_only(|conn| query::get_alignments(conn, source_call_id))
}

pub fn get_alignment_for_build(
    t: &Transactor,
    source_call_id: Uuid,
    reference_build: &str,
) -> EngineResult<Alignment> {
    t.read_only(|conn| query::get_alignment_for_build(conn, source_call_id, reference_build))
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

pub fn import_callable_intervals(
    t: &Transactor,
    profile_id: Uuid,
    source_id: Uuid,
    intervals: Vec<CallableInterval>,
) -> EngineResult<Vec<Region>> {
    t.read_write(|conn| {
        let regions = region_index::import_callable_intervals(conn, profile_id, source_id, intervals)?;
        region_index::update_profile_callable_pct(conn, profile_id, None)?;
        Ok(regions)
    })
}

pub fn query_callable_state(
    t: &Transactor,
    profile_id: Uuid,
    position: i64,
) -> EngineResult<CallableState> {
    t.read_only(|conn| region_index::query_callable_state(conn, profile_id, position, None))
}

pub fn query_callable_states(
    t: &Transactor,
    profile_id: Uuid,
    positions: &[i64],
) -> EngineResult<Vec<(i64, CallableState)>> {
    t.read_only(|conn| region_index::query_callable_states(conn, profile_id, positions, None))
}

pub fn get_callable_summary(t: &Transactor, source_id: Uuid) -> EngineResult<CallableSummary> {
    t.read_only(|conn| region_index::get_callable_summary(conn, source_id))
}

/// Not part of the spec.md §6 bullet list verbatim, but exposed so a collaborator can
/// build and cache the interval index itself per spec.md §5's caching note, rather
/// than forcing every point/batch query through a fresh rebuild.
pub fn build_interval_index(t: &Transactor, profile_id: Uuid) -> EngineResult<IntervalIndex> {
    t.read_only(|conn| region_index::build_index_for_profile(conn, profile_id))
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

pub fn get_audit_history(t: &Transactor, variant_id: Uuid) -> EngineResult<Vec<Audit>> {
    t.read_only(|conn| repo::audit::find_by_variant(conn, variant_id))
}
