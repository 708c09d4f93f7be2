//! Repository for [`crate::model::Alignment`] — one source call's coordinates in one
//! reference build (spec.md §3/§4.4).

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::AlignmentRow;
use crate::db::schema::y_source_call_alignments::dsl as a;
use crate::err::EngineResult;
use crate::model::Alignment;
use crate::repo::{new_id, now};

pub struct NewAlignment {
    pub source_call_id: Uuid,
    pub reference_build: String,
    pub position: i64,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub called_allele: Option<String>,
    pub read_depth: Option<i32>,
    pub mapping_quality: Option<i32>,
}

/// Idempotent on `(source_call_id, reference_build)`: creates or replaces (spec.md §4.2).
pub fn upsert(conn: &mut PgConnection, new: NewAlignment) -> EngineResult<Alignment> {
    let existing = find_by_source_call_and_build(conn, new.source_call_id, &new.reference_build)?;
    let ts = now();

    if let Some(existing) = existing {
        let row = AlignmentRow {
            id: existing.id,
            source_call_id: new.source_call_id,
            reference_build: new.reference_build,
            position: new.position,
            ref_allele: new.ref_allele,
            alt_allele: new.alt_allele,
            called_allele: new.called_allele,
            read_depth: new.read_depth,
            mapping_quality: new.mapping_quality,
            version: existing.version + 1,
            created_at: existing.created_at,
            updated_at: ts,
        };
        let updated: AlignmentRow =
            diesel::update(a::y_source_call_alignments.filter(a::id.eq(existing.id)))
                .set(&row)
                .get_result(conn)?;
        Ok(updated.into_model())
    } else {
        let row = AlignmentRow {
            id: new_id(),
            source_call_id: new.source_call_id,
            reference_build: new.reference_build,
            position: new.position,
            ref_allele: new.ref_allele,
            alt_allele: new.alt_allele,
            called_allele: new.called_allele,
            read_depth: new.read_depth,
            mapping_quality: new.mapping_quality,
            version: 1,
            created_at: ts,
            updated_at: ts,
        };
        let inserted: AlignmentRow = diesel::insert_into(a::y_source_call_alignments)
            .values(&row)
            .get_result(conn)?;
        Ok(inserted.into_model())
    }
}

pub fn find_by_source_call_and_build(
    conn: &mut PgConnection,
    source_call_id: Uuid,
    reference_build: &str,
) -> EngineResult<Option<Alignment>> {
    let row: Option<AlignmentRow> = a::y_source_call_alignments
        .filter(
            a::source_call_id
                .eq(source_call_id)
                .and(a::reference_build.eq(reference_build)),
        )
        .first(conn)
        .optional()?;
    Ok(row.map(|r| r.into_model()))
}

pub fn find_by_source_call(
    conn: &mut PgConnection,
    source_call_id: Uuid,
) -> EngineResult<Vec<Alignment>> {
    let rows: Vec<AlignmentRow> = a::y_source_call_alignments
        .filter(a::source_call_id.eq(source_call_id))
        .load(conn)?;
    Ok(rows.into_iter().map(|r| r.into_model()).collect())
}

/// Alignments overlapping the half-open interval `[start, end)` in `build` on
/// `contig` — `contig` is informational only here since alignments do not store a
/// contig column (they are always in the context of one `YProfileVariant`'s
/// position); collaborators join against the parent variant for contig filtering.
pub fn find_by_position_range(
    conn: &mut PgConnection,
    reference_build: &str,
    start: i64,
    end: i64,
) -> EngineResult<Vec<Alignment>> {
    let rows: Vec<AlignmentRow> = a::y_source_call_alignments
        .filter(
            a::reference_build
                .eq(reference_build)
                .and(a::position.ge(start))
                .and(a::position.lt(end)),
        )
        .order(a::position.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(|r| r.into_model()).collect())
}
