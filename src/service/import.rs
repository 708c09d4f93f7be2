//! Batch variant-call import (spec.md §4.6).

use diesel::pg::PgConnection;
use uuid::Uuid;

use crate::common::{CallState, CallableState, VariantType};
use crate::common::weights::effective_weight;
use crate::err::{EngineError, EngineResult};
use crate::repo;
use crate::repo::alignment::NewAlignment;
use crate::repo::source_call::NewSourceCall;

/// One input record of `importVariantCalls(profileId, sourceId, calls)` (spec.md
/// §4.6). `derived` maps to [`CallState`] (`true` => `DERIVED`, `false` =>
/// `ANCESTRAL`, `None` => `NO_CALL`).
#[derive(Debug, Clone)]
pub struct ImportCall {
    pub position: i64,
    pub end_position: Option<i64>,
    pub ref_allele: String,
    pub alt_allele: String,
    pub called_allele: String,
    pub derived: Option<bool>,
    pub variant_type: VariantType,
    pub variant_name: Option<String>,
    pub marker_name: Option<String>,
    pub called_repeat_count: Option<i32>,
    pub read_depth: Option<i32>,
    pub quality_score: Option<f64>,
    pub mapping_quality: Option<i32>,
    pub reference_build: Option<String>,
}

/// Per-record failure, paired with the offending input's coordinate so a caller can
/// report it without an internal id (spec.md §7 propagation policy).
#[derive(Debug, derive_new::new)]
pub struct ImportError {
    pub position: i64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub reason: EngineError,
}

/// Counts for one `importVariantCalls` run (spec.md §4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub imported: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub errored: usize,
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub counts: ImportCounts,
    pub errors: Vec<ImportError>,
}

fn call_state_of(derived: Option<bool>) -> CallState {
    match derived {
        Some(true) => CallState::Derived,
        Some(false) => CallState::Ancestral,
        None => CallState::NoCall,
    }
}

/// What happened to one input record's source call.
enum ImportOutcome {
    Created,
    Replaced,
    /// An existing call for `(variant, source)` already matches the input record
    /// field-for-field; nothing was written (spec.md §4.6 "skipped (duplicates)").
    Skipped,
}

/// True if `existing` already reports exactly what `new` would write, so the
/// upsert would be a no-op write of identical data.
fn is_duplicate_call(existing: &crate::model::SourceCall, new: &NewSourceCall) -> bool {
    existing.called_allele == new.called_allele
        && existing.call_state == new.call_state
        && existing.called_repeat_count == new.called_repeat_count
        && existing.read_depth == new.read_depth
        && existing.mapping_quality == new.mapping_quality
        && existing.variant_allele_frequency == new.variant_allele_frequency
        && existing.callable_state == new.callable_state
}

/// Imports `calls` for `(profile_id, source_id)`: for each input, finds-or-creates
/// the variant keyed by `(position, ref, alt)`, creates or replaces the
/// `(variant, source)` source call, and creates or replaces the alignment for the
/// call's reference build (defaulting to the source's own build). The whole batch
/// runs in the caller's transaction; the first error whose kind is not a per-record
/// validation problem aborts the batch by propagating immediately, matching the
/// "any unrecoverable error rolls back the whole import" rule. A record with an
/// empty called allele is a recoverable, per-record `ValidationFailure`: it is
/// counted as `errored` and the batch continues.
pub fn import_variant_calls(
    conn: &mut PgConnection,
    profile_id: Uuid,
    source_id: Uuid,
    calls: Vec<ImportCall>,
) -> EngineResult<ImportResult> {
    let source = repo::source::find_by_id(conn, source_id)?
        .ok_or_else(|| EngineError::NotFound(format!("source {source_id}")))?;

    let mut result = ImportResult::default();

    for input in calls {
        match import_one(conn, profile_id, &source, &input) {
            Ok(ImportOutcome::Created) => result.counts.imported += 1,
            Ok(ImportOutcome::Replaced) => result.counts.replaced += 1,
            Ok(ImportOutcome::Skipped) => result.counts.skipped += 1,
            Err(EngineError::ValidationFailure { field, message }) => {
                result.counts.errored += 1;
                result.errors.push(ImportError::new(
                    input.position,
                    input.ref_allele.clone(),
                    input.alt_allele.clone(),
                    EngineError::ValidationFailure { field, message },
                ));
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        %profile_id, %source_id,
        imported = result.counts.imported,
        replaced = result.counts.replaced,
        skipped = result.counts.skipped,
        errored = result.counts.errored,
        "batch variant call import complete"
    );
    Ok(result)
}

/// Validates one input record before anything touches the database (spec.md §7:
/// empty/malformed input is a `ValidationFailure`, not a panic).
pub fn validate_import_call(input: &ImportCall) -> EngineResult<()> {
    if input.called_allele.trim().is_empty() {
        return Err(EngineError::validation("called_allele", "called allele must not be empty"));
    }
    if input.ref_allele.is_empty() || input.alt_allele.is_empty() {
        return Err(EngineError::validation("ref_allele/alt_allele", "alleles must not be empty"));
    }
    Ok(())
}

fn import_one(
    conn: &mut PgConnection,
    profile_id: Uuid,
    source: &crate::model::Source,
    input: &ImportCall,
) -> EngineResult<ImportOutcome> {
    validate_import_call(input)?;

    let base = crate::common::weights::base_weight(source.source_type, input.variant_type)
        .ok_or_else(|| {
            EngineError::validation(
                "variant_type",
                format!(
                    "{:?} does not report {:?} variants",
                    source.source_type, input.variant_type
                ),
            )
        })?;

    let callable_state: Option<CallableState> = None;
    let weight = effective_weight(base, callable_state, input.read_depth, input.mapping_quality);

    let variant = repo::variant::find_or_create(
        conn,
        profile_id,
        input.position,
        input.end_position,
        &input.ref_allele,
        &input.alt_allele,
        input.variant_type,
        input.variant_name.clone(),
        input.marker_name.clone(),
    )?;

    let new_call = NewSourceCall {
        variant_id: variant.id,
        source_id: source.id,
        called_allele: input.called_allele.clone(),
        call_state: call_state_of(input.derived),
        called_repeat_count: input.called_repeat_count,
        read_depth: input.read_depth,
        mapping_quality: input.mapping_quality,
        variant_allele_frequency: input.quality_score,
        callable_state,
        concordance_weight: weight,
    };

    let existing = repo::source_call::find_by_variant_and_source(conn, variant.id, source.id)?;
    if let Some(existing) = &existing {
        if is_duplicate_call(existing, &new_call) {
            return Ok(ImportOutcome::Skipped);
        }
    }
    let outcome = if existing.is_some() {
        ImportOutcome::Replaced
    } else {
        ImportOutcome::Created
    };

    repo::source_call::upsert(conn, new_call)?;

    let build = input
        .reference_build
        .clone()
        .or_else(|| source.reference_build.clone())
        .ok_or_else(|| {
            EngineError::validation("reference_build", "no reference build supplied or on source")
        })?;

    let source_call = repo::source_call::find_by_variant_and_source(conn, variant.id, source.id)?
        .ok_or_else(|| {
            EngineError::DatabaseError("source call vanished immediately after upsert".into())
        })?;

    repo::alignment::upsert(
        conn,
        NewAlignment {
            source_call_id: source_call.id,
            reference_build: build,
            position: input.position,
            ref_allele: Some(input.ref_allele.clone()),
            alt_allele: Some(input.alt_allele.clone()),
            called_allele: Some(input.called_allele.clone()),
            read_depth: input.read_depth,
            mapping_quality: input.mapping_quality,
        },
    )?;

    Ok(outcome)
}

#[cfg(test)]
mod test {
    use super::*;

    fn call(called_allele: &str, ref_allele: &str, alt_allele: &str) -> ImportCall {
        ImportCall {
            position: 100,
            end_position: None,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
            called_allele: called_allele.to_string(),
            derived: Some(true),
            variant_type: VariantType::Snp,
            variant_name: None,
            marker_name: None,
            called_repeat_count: None,
            read_depth: None,
            quality_score: None,
            mapping_quality: None,
            reference_build: None,
        }
    }

    #[test]
    fn rejects_blank_called_allele() {
        assert!(matches!(
            validate_import_call(&call("   ", "A", "G")),
            Err(EngineError::ValidationFailure { .. })
        ));
    }

    #[test]
    fn rejects_empty_ref_or_alt() {
        assert!(validate_import_call(&call("G", "", "G")).is_err());
        assert!(validate_import_call(&call("G", "A", "")).is_err());
    }

    #[test]
    fn accepts_well_formed_record() {
        assert!(validate_import_call(&call("G", "A", "G")).is_ok());
    }

    fn existing_call(called_allele: &str) -> crate::model::SourceCall {
        crate::model::SourceCall {
            id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            called_allele: called_allele.to_string(),
            call_state: CallState::Derived,
            called_repeat_count: None,
            read_depth: Some(20),
            mapping_quality: Some(50),
            variant_allele_frequency: None,
            callable_state: None,
            concordance_weight: 0.9,
            version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn new_call(called_allele: &str) -> NewSourceCall {
        NewSourceCall {
            variant_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            called_allele: called_allele.to_string(),
            call_state: CallState::Derived,
            called_repeat_count: None,
            read_depth: Some(20),
            mapping_quality: Some(50),
            variant_allele_frequency: None,
            callable_state: None,
            concordance_weight: 0.9,
        }
    }

    #[test]
    fn identical_record_is_a_duplicate() {
        assert!(is_duplicate_call(&existing_call("A"), &new_call("A")));
    }

    #[test]
    fn changed_allele_is_not_a_duplicate() {
        assert!(!is_duplicate_call(&existing_call("A"), &new_call("G")));
    }

    #[test]
    fn changed_metrics_are_not_a_duplicate() {
        let existing = existing_call("A");
        let mut changed = new_call("A");
        changed.read_depth = Some(5);
        assert!(!is_duplicate_call(&existing, &changed));
    }
}
