//! Repository for [`crate::model::Source`].

use diesel::prelude::*;
use uuid::Uuid;

use crate::common::SourceType;
use crate::db::models::SourceRow;
use crate::db::schema::y_profile_sources::dsl as s;
use crate::db::transactor::classify_update_miss;
use crate::err::{EngineError, EngineResult};
use crate::model::Source;
use crate::repo::{new_id, now};

#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &mut PgConnection,
    profile_id: Uuid,
    source_type: SourceType,
    vendor: Option<String>,
    test_name: Option<String>,
    reference_build: Option<String>,
    method_tier: i32,
    base_concordance_weight: f64,
) -> EngineResult<Source> {
    let ts = now();
    let row = SourceRow {
        id: new_id(),
        profile_id,
        source_type: source_type.to_string(),
        vendor,
        test_name,
        reference_build,
        method_tier,
        base_concordance_weight,
        version: 1,
        created_at: ts,
        updated_at: ts,
    };
    let inserted: SourceRow = diesel::insert_into(s::y_profile_sources)
        .values(&row)
        .get_result(conn)?;
    inserted.into_model()
}

pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> EngineResult<Option<Source>> {
    let row: Option<SourceRow> = s::y_profile_sources
        .filter(s::id.eq(id))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_profile(conn: &mut PgConnection, profile_id: Uuid) -> EngineResult<Vec<Source>> {
    let rows: Vec<SourceRow> = s::y_profile_sources
        .filter(s::profile_id.eq(profile_id))
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

pub fn update(conn: &mut PgConnection, source: &Source) -> EngineResult<Source> {
    let mut row = SourceRow::from(source);
    row.version += 1;
    row.updated_at = now();

    let affected = diesel::update(
        s::y_profile_sources.filter(s::id.eq(source.id).and(s::version.eq(source.version))),
    )
    .set(&row)
    .execute(conn)?;

    if affected == 0 {
        return Err(classify_update_miss(
            conn,
            |conn| {
                s::y_profile_sources
                    .filter(s::id.eq(source.id))
                    .count()
                    .get_result::<i64>(conn)
                    .map(|n| n > 0)
            },
            format!("source {}", source.id),
        ));
    }

    find_by_id(conn, source.id)?
        .ok_or_else(|| EngineError::DatabaseError("source vanished immediately after update".into()))
}

/// Deletes the source and, via cascade, its source calls and regions (spec.md §3).
pub fn delete(conn: &mut PgConnection, id: Uuid) -> EngineResult<bool> {
    let affected = diesel::delete(s::y_profile_sources.filter(s::id.eq(id))).execute(conn)?;
    Ok(affected > 0)
}
