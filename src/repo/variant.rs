//! Repository for [`crate::model::Variant`].

use diesel::prelude::*;
use uuid::Uuid;

use crate::common::{ConsensusState, VariantStatus, VariantType};
use crate::db::models::VariantRow;
use crate::db::schema::y_profile_variants::dsl as v;
use crate::db::transactor::classify_update_miss;
use crate::err::{EngineError, EngineResult};
use crate::model::Variant;
use crate::repo::{new_id, now};

/// Finds the variant identified by `(profile_id, position, ref_allele, alt_allele)`
/// if it exists, creating it otherwise (spec.md §3/§4.6: variants are created lazily
/// on first matching source call).
#[allow(clippy::too_many_arguments)]
pub fn find_or_create(
    conn: &mut PgConnection,
    profile_id: Uuid,
    position: i64,
    end_position: Option<i64>,
    ref_allele: &str,
    alt_allele: &str,
    variant_type: VariantType,
    variant_name: Option<String>,
    marker_name: Option<String>,
) -> EngineResult<Variant> {
    if let Some(existing) = find_by_natural_key(conn, profile_id, position, ref_allele, alt_allele)? {
        return Ok(existing);
    }

    let ts = now();
    let row = VariantRow {
        id: new_id(),
        profile_id,
        position,
        end_position,
        ref_allele: ref_allele.to_string(),
        alt_allele: alt_allele.to_string(),
        variant_type: variant_type.to_string(),
        variant_name,
        marker_name,
        is_in_tree: false,
        consensus_allele: None,
        consensus_state: None,
        status: VariantStatus::NoCoverage.to_string(),
        confidence_score: 0.0,
        concordant_count: 0,
        discordant_count: 0,
        source_count: 0,
        version: 1,
        created_at: ts,
        updated_at: ts,
    };

    // Two concurrent inserts for the same natural key race on the unique index;
    // the loser re-reads rather than erroring, since the row now genuinely exists.
    match diesel::insert_into(v::y_profile_variants)
        .values(&row)
        .get_result::<VariantRow>(conn)
    {
        Ok(inserted) => inserted.into_model(),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => find_by_natural_key(conn, profile_id, position, ref_allele, alt_allele)?
            .ok_or_else(|| {
                EngineError::DatabaseError("variant disappeared after unique violation".into())
            }),
        Err(e) => Err(EngineError::from(e)),
    }
}

pub fn find_by_natural_key(
    conn: &mut PgConnection,
    profile_id: Uuid,
    position: i64,
    ref_allele: &str,
    alt_allele: &str,
) -> EngineResult<Option<Variant>> {
    let row: Option<VariantRow> = v::y_profile_variants
        .filter(
            v::profile_id
                .eq(profile_id)
                .and(v::position.eq(position))
                .and(v::ref_allele.eq(ref_allele))
                .and(v::alt_allele.eq(alt_allele)),
        )
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> EngineResult<Option<Variant>> {
    let row: Option<VariantRow> = v::y_profile_variants
        .filter(v::id.eq(id))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_profile(conn: &mut PgConnection, profile_id: Uuid) -> EngineResult<Vec<Variant>> {
    let rows: Vec<VariantRow> = v::y_profile_variants
        .filter(v::profile_id.eq(profile_id))
        .order(v::position.asc())
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub fn find_by_status(
    conn: &mut PgConnection,
    profile_id: Uuid,
    status: VariantStatus,
) -> EngineResult<Vec<Variant>> {
    let rows: Vec<VariantRow> = v::y_profile_variants
        .filter(v::profile_id.eq(profile_id).and(v::status.eq(status.to_string())))
        .order(v::position.asc())
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

/// Enumerates variants whose `variant_name` (the canonical haplogroup/branch label
/// for in-tree variants) starts with `prefix`, implemented as a lexicographic prefix
/// match (spec.md §4.2).
pub fn find_by_branch_prefix(
    conn: &mut PgConnection,
    profile_id: Uuid,
    prefix: &str,
) -> EngineResult<Vec<Variant>> {
    let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
    let rows: Vec<VariantRow> = v::y_profile_variants
        .filter(
            v::profile_id
                .eq(profile_id)
                .and(v::variant_name.like(pattern)),
        )
        .order(v::variant_name.asc())
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub fn update(conn: &mut PgConnection, variant: &Variant) -> EngineResult<Variant> {
    let mut row = VariantRow::from(variant);
    row.version += 1;
    row.updated_at = now();

    let affected = diesel::update(
        v::y_profile_variants.filter(v::id.eq(variant.id).and(v::version.eq(variant.version))),
    )
    .set(&row)
    .execute(conn)?;

    if affected == 0 {
        return Err(classify_update_miss(
            conn,
            |conn| {
                v::y_profile_variants
                    .filter(v::id.eq(variant.id))
                    .count()
                    .get_result::<i64>(conn)
                    .map(|n| n > 0)
            },
            format!("variant at {}{}>{}", variant.position, variant.ref_allele, variant.alt_allele),
        ));
    }

    find_by_id(conn, variant.id)?
        .ok_or_else(|| EngineError::DatabaseError("variant vanished immediately after update".into()))
}

/// Deletes the variant and, via cascade, its source calls and audits (spec.md §3).
pub fn delete(conn: &mut PgConnection, id: Uuid) -> EngineResult<bool> {
    let affected = diesel::delete(v::y_profile_variants.filter(v::id.eq(id))).execute(conn)?;
    Ok(affected > 0)
}

/// Applies the outcome of a consensus recomputation (step §4.3.3) to `variant`,
/// returning the updated in-memory value without touching `is_in_tree` (callers
/// control that flag explicitly via [`crate::service::reconciliation::reconcile_variant`]).
pub fn with_consensus(
    mut variant: Variant,
    consensus_allele: Option<String>,
    consensus_state: Option<ConsensusState>,
    status: VariantStatus,
    confidence_score: f64,
    concordant_count: i32,
    discordant_count: i32,
    source_count: i32,
) -> Variant {
    variant.consensus_allele = consensus_allele;
    variant.consensus_state = consensus_state;
    variant.status = status;
    variant.confidence_score = confidence_score;
    variant.concordant_count = concordant_count;
    variant.discordant_count = discordant_count;
    variant.source_count = source_count;
    variant
}
