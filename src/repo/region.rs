//! Repository for [`crate::model::Region`] — one callable interval per source
//! (spec.md §3/§4.5).

use diesel::prelude::*;
use uuid::Uuid;

use crate::common::CallableState;
use crate::db::models::RegionRow;
use crate::db::schema::y_profile_regions::dsl as r;
use crate::err::EngineResult;
use crate::model::Region;
use crate::repo::{new_id, now};

pub struct NewRegion {
    pub profile_id: Uuid,
    pub source_id: Uuid,
    pub contig: String,
    pub start_position: i64,
    pub end_position: i64,
    pub callable_state: CallableState,
    pub mean_coverage: Option<f64>,
    pub mean_mapping_quality: Option<f64>,
}

pub fn insert(conn: &mut PgConnection, new: NewRegion) -> EngineResult<Region> {
    let ts = now();
    let row = RegionRow {
        id: new_id(),
        profile_id: new.profile_id,
        source_id: new.source_id,
        contig: new.contig,
        start_position: new.start_position,
        end_position: new.end_position,
        callable_state: new.callable_state.to_string(),
        mean_coverage: new.mean_coverage,
        mean_mapping_quality: new.mean_mapping_quality,
        version: 1,
        created_at: ts,
        updated_at: ts,
    };
    let inserted: RegionRow = diesel::insert_into(r::y_profile_regions)
        .values(&row)
        .get_result(conn)?;
    inserted.into_model()
}

pub fn find_by_profile(conn: &mut PgConnection, profile_id: Uuid) -> EngineResult<Vec<Region>> {
    let rows: Vec<RegionRow> = r::y_profile_regions
        .filter(r::profile_id.eq(profile_id))
        .order((r::contig.asc(), r::start_position.asc()))
        .load(conn)?;
    rows.into_iter().map(|row| row.into_model()).collect()
}

pub fn find_by_source(conn: &mut PgConnection, source_id: Uuid) -> EngineResult<Vec<Region>> {
    let rows: Vec<RegionRow> = r::y_profile_regions
        .filter(r::source_id.eq(source_id))
        .order((r::contig.asc(), r::start_position.asc()))
        .load(conn)?;
    rows.into_iter().map(|row| row.into_model()).collect()
}

/// Regions on `contig` overlapping `[start, end)` for any source of `profile_id`
/// (spec.md §4.2: "by-position-range (for regions and alignments)").
pub fn find_by_position_range(
    conn: &mut PgConnection,
    profile_id: Uuid,
    contig: &str,
    start: i64,
    end: i64,
) -> EngineResult<Vec<Region>> {
    let rows: Vec<RegionRow> = r::y_profile_regions
        .filter(
            r::profile_id
                .eq(profile_id)
                .and(r::contig.eq(contig))
                .and(r::start_position.lt(end))
                .and(r::end_position.ge(start)),
        )
        .order(r::start_position.asc())
        .load(conn)?;
    rows.into_iter().map(|row| row.into_model()).collect()
}

pub fn delete(conn: &mut PgConnection, id: Uuid) -> EngineResult<bool> {
    let affected = diesel::delete(r::y_profile_regions.filter(r::id.eq(id))).execute(conn)?;
    Ok(affected > 0)
}
