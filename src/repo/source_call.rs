//! Repository for [`crate::model::SourceCall`] — the evidence record for one
//! `(variant, source)` pair (spec.md §3).

use diesel::prelude::*;
use uuid::Uuid;

use crate::common::{CallState, CallableState};
use crate::db::models::SourceCallRow;
use crate::db::schema::y_variant_source_calls::dsl as c;
use crate::err::EngineResult;
use crate::model::SourceCall;
use crate::repo::{new_id, now};

pub struct NewSourceCall {
    pub variant_id: Uuid,
    pub source_id: Uuid,
    pub called_allele: String,
    pub call_state: CallState,
    pub called_repeat_count: Option<i32>,
    pub read_depth: Option<i32>,
    pub mapping_quality: Option<i32>,
    pub variant_allele_frequency: Option<f64>,
    pub callable_state: Option<CallableState>,
    pub concordance_weight: f64,
}

/// Creates or replaces the source call for `(variant_id, source_id)`, which is
/// unique (spec.md §3 invariant). Used both by `addVariantCall` and by
/// `importVariantCalls`'s replace-on-duplicate semantics (spec.md §4.6).
pub fn upsert(conn: &mut PgConnection, new: NewSourceCall) -> EngineResult<(SourceCall, bool)> {
    let existing = find_by_variant_and_source(conn, new.variant_id, new.source_id)?;
    let ts = now();

    if let Some(existing) = existing {
        let row = SourceCallRow {
            id: existing.id,
            variant_id: new.variant_id,
            source_id: new.source_id,
            called_allele: new.called_allele,
            call_state: new.call_state.to_string(),
            called_repeat_count: new.called_repeat_count,
            read_depth: new.read_depth,
            mapping_quality: new.mapping_quality,
            variant_allele_frequency: new.variant_allele_frequency,
            callable_state: new.callable_state.map(|s| s.to_string()),
            concordance_weight: new.concordance_weight,
            version: existing.version + 1,
            created_at: existing.created_at,
            updated_at: ts,
        };
        let updated: SourceCallRow = diesel::update(c::y_variant_source_calls.filter(c::id.eq(existing.id)))
            .set(&row)
            .get_result(conn)?;
        Ok((updated.into_model()?, true))
    } else {
        let row = SourceCallRow {
            id: new_id(),
            variant_id: new.variant_id,
            source_id: new.source_id,
            called_allele: new.called_allele,
            call_state: new.call_state.to_string(),
            called_repeat_count: new.called_repeat_count,
            read_depth: new.read_depth,
            mapping_quality: new.mapping_quality,
            variant_allele_frequency: new.variant_allele_frequency,
            callable_state: new.callable_state.map(|s| s.to_string()),
            concordance_weight: new.concordance_weight,
            version: 1,
            created_at: ts,
            updated_at: ts,
        };
        let inserted: SourceCallRow = diesel::insert_into(c::y_variant_source_calls)
            .values(&row)
            .get_result(conn)?;
        Ok((inserted.into_model()?, false))
    }
}

pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> EngineResult<Option<SourceCall>> {
    let row: Option<SourceCallRow> = c::y_variant_source_calls
        .filter(c::id.eq(id))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_variant_and_source(
    conn: &mut PgConnection,
    variant_id: Uuid,
    source_id: Uuid,
) -> EngineResult<Option<SourceCall>> {
    let row: Option<SourceCallRow> = c::y_variant_source_calls
        .filter(c::variant_id.eq(variant_id).and(c::source_id.eq(source_id)))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_variant(conn: &mut PgConnection, variant_id: Uuid) -> EngineResult<Vec<SourceCall>> {
    let rows: Vec<SourceCallRow> = c::y_variant_source_calls
        .filter(c::variant_id.eq(variant_id))
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

/// Sum of `concordance_weight` over all calls for `variant_id` whose `called_allele`
/// equals `allele` (spec.md §4.2, used by reconciliation's `W(a)`).
pub fn sum_weights_for_allele(
    conn: &mut PgConnection,
    variant_id: Uuid,
    allele: &str,
) -> EngineResult<f64> {
    let rows: Vec<SourceCallRow> = c::y_variant_source_calls
        .filter(c::variant_id.eq(variant_id).and(c::called_allele.eq(allele)))
        .load(conn)?;
    Ok(rows.iter().map(|r| r.concordance_weight).sum())
}

/// Deletes the call and, via cascade, its alignments (spec.md §3).
pub fn delete(conn: &mut PgConnection, id: Uuid) -> EngineResult<bool> {
    let affected = diesel::delete(c::y_variant_source_calls.filter(c::id.eq(id))).execute(conn)?;
    Ok(affected > 0)
}
