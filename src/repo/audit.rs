//! Repository for [`crate::model::Audit`] — the per-curator-action history of a
//! variant's consensus (spec.md §3/§4.3.5).

use diesel::prelude::*;
use uuid::Uuid;

use crate::common::{AuditAction, ConsensusState, VariantStatus};
use crate::db::models::AuditRow;
use crate::db::schema::y_variant_audits::dsl as au;
use crate::err::EngineResult;
use crate::model::Audit;
use crate::repo::{new_id, now};

#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &mut PgConnection,
    variant_id: Uuid,
    action: AuditAction,
    prior_consensus_allele: Option<String>,
    prior_consensus_state: Option<ConsensusState>,
    prior_status: Option<VariantStatus>,
    new_consensus_allele: Option<String>,
    new_consensus_state: Option<ConsensusState>,
    new_status: Option<VariantStatus>,
    reason: String,
    user_id: Option<String>,
) -> EngineResult<Audit> {
    let row = AuditRow {
        id: new_id(),
        variant_id,
        timestamp: now(),
        action: action.to_string(),
        prior_consensus_allele,
        prior_consensus_state: prior_consensus_state.map(|s| s.to_string()),
        prior_status: prior_status.map(|s| s.to_string()),
        new_consensus_allele,
        new_consensus_state: new_consensus_state.map(|s| s.to_string()),
        new_status: new_status.map(|s| s.to_string()),
        reason,
        user_id,
    };
    let inserted: AuditRow = diesel::insert_into(au::y_variant_audits)
        .values(&row)
        .get_result(conn)?;
    inserted.into_model()
}

/// History for `variant_id`, newest first (spec.md §6/§8 scenario E).
pub fn find_by_variant(conn: &mut PgConnection, variant_id: Uuid) -> EngineResult<Vec<Audit>> {
    let rows: Vec<AuditRow> = au::y_variant_audits
        .filter(au::variant_id.eq(variant_id))
        .order(au::timestamp.desc())
        .load(conn)?;
    rows.into_iter().map(|r| r.into_model()).collect()
}
