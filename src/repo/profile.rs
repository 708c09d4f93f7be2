//! Repository for [`crate::model::Profile`].

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::ProfileRow;
use crate::db::schema::y_profiles::dsl as p;
use crate::db::transactor::classify_update_miss;
use crate::err::{EngineError, EngineResult};
use crate::model::Profile;
use crate::repo::{new_id, now};

/// Creates a new profile for `biosample_id`. Fails with `DuplicateKey` if one exists
/// already (spec.md §3 invariant: exactly one profile per biosample).
pub fn insert(conn: &mut PgConnection, biosample_id: Uuid) -> EngineResult<Profile> {
    let ts = now();
    let row = ProfileRow {
        id: new_id(),
        biosample_id,
        consensus_haplogroup: None,
        total_variants: 0,
        confirmed_count: 0,
        novel_count: 0,
        conflict_count: 0,
        no_coverage_count: 0,
        str_marker_count: 0,
        str_confirmed_count: 0,
        source_count: 0,
        primary_source_type: None,
        callable_region_pct: None,
        mean_coverage: None,
        last_reconciled_at: None,
        sync_status: "NOT_SYNCED".to_string(),
        at_uri: None,
        version: 1,
        created_at: ts,
        updated_at: ts,
    };
    let inserted: ProfileRow = diesel::insert_into(p::y_profiles)
        .values(&row)
        .get_result(conn)?;
    inserted.into_model()
}

pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> EngineResult<Option<Profile>> {
    let row: Option<ProfileRow> = p::y_profiles
        .filter(p::id.eq(id))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_by_biosample(
    conn: &mut PgConnection,
    biosample_id: Uuid,
) -> EngineResult<Option<Profile>> {
    let row: Option<ProfileRow> = p::y_profiles
        .filter(p::biosample_id.eq(biosample_id))
        .first(conn)
        .optional()?;
    row.map(|r| r.into_model()).transpose()
}

pub fn find_all(conn: &mut PgConnection) -> EngineResult<Vec<Profile>> {
    let rows: Vec<ProfileRow> = p::y_profiles.load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}

/// Persists `profile`, checking its stored `version` first (optimistic concurrency,
/// spec.md §4.1). On success the returned profile carries the incremented version.
pub fn update(conn: &mut PgConnection, profile: &Profile) -> EngineResult<Profile> {
    let mut row = ProfileRow::from(profile);
    row.version += 1;
    row.updated_at = now();

    let affected = diesel::update(
        p::y_profiles.filter(p::id.eq(profile.id).and(p::version.eq(profile.version))),
    )
    .set(&row)
    .execute(conn)?;

    if affected == 0 {
        return Err(classify_update_miss(
            conn,
            |conn| {
                p::y_profiles
                    .filter(p::id.eq(profile.id))
                    .count()
                    .get_result::<i64>(conn)
                    .map(|n| n > 0)
            },
            format!("profile {}", profile.biosample_id),
        ));
    }

    find_by_id(conn, profile.id)?.ok_or_else(|| {
        EngineError::DatabaseError("profile vanished immediately after update".into())
    })
}

/// Deletes the profile and, via `ON DELETE CASCADE`, all its sources, variants, and
/// regions (spec.md §3 cascade rules).
pub fn delete(conn: &mut PgConnection, id: Uuid) -> EngineResult<bool> {
    let affected = diesel::delete(p::y_profiles.filter(p::id.eq(id))).execute(conn)?;
    Ok(affected > 0)
}
