//! Read-side composition for the spec.md §6 operation surface.
//!
//! Most reads are a single repository call and [`crate::api`] dispatches to
//! `crate::repo::*` directly; this module holds the handful of reads that compose
//! more than one repository or need a not-found check the repository itself
//! (by design) leaves to its caller.

use diesel::pg::PgConnection;
use uuid::Uuid;

use crate::err::{EngineError, EngineResult};
use crate::model::{Alignment, Profile, SourceCall, Variant};
use crate::repo;

pub fn get_profile(conn: &mut PgConnection, profile_id: Uuid) -> EngineResult<Profile> {
    repo::profile::find_by_id(conn, profile_id)?
        .ok_or_else(|| EngineError::NotFound(format!("profile {profile_id}")))
}

pub fn get_profile_by_biosample(conn: &mut PgConnection, biosample_id: Uuid) -> EngineResult<Profile> {
    repo::profile::find_by_biosample(conn, biosample_id)?
        .ok_or_else(|| EngineError::NotFound(format!("profile for biosample {biosample_id}")))
}

/// `getOrCreateProfile(biosampleId)` (spec.md §6): returns the existing profile for
/// `biosample_id`, creating one if none exists yet.
pub fn get_or_create_profile(conn: &mut PgConnection, biosample_id: Uuid) -> EngineResult<Profile> {
    if let Some(existing) = repo::profile::find_by_biosample(conn, biosample_id)? {
        return Ok(existing);
    }
    repo::profile::insert(conn, biosample_id)
}

pub fn get_variants(conn: &mut PgConnection, profile_id: Uuid) -> EngineResult<Vec<Variant>> {
    repo::variant::find_by_profile(conn, profile_id)
}

/// `getVariantCalls(variantId)` (spec.md §6): every source call recorded against a
/// variant, across all sources.
pub fn get_variant_calls(conn: &mut PgConnection, variant_id: Uuid) -> EngineResult<Vec<SourceCall>> {
    repo::source_call::find_by_variant(conn, variant_id)
}

pub fn get_alignments(conn: &mut PgConnection, source_call_id: Uuid) -> EngineResult<Vec<Alignment>> {
    repo::alignment::find_by_source_call(conn, source_call_id)
}

pub fn get_alignment_for_build(
    conn: &mut PgConnection,
    source_call_id: Uuid,
    reference_build: &str,
) -> EngineResult<Alignment> {
    repo::alignment::find_by_source_call_and_build(conn, source_call_id, reference_build)?
        .ok_or_else(|| {
            EngineError::NotFound(format!("alignment for {source_call_id} in {reference_build}"))
        })
}
