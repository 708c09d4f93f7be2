//! Plain domain structs, independent of the storage layer.
//!
//! These are what repositories and the reconciliation service operate on; the
//! diesel-mapped row structs in [`crate::db::models`] are an implementation detail of
//! how these get to and from Postgres, mirroring the teacher's separation between
//! `seqvars/query/schema/data.rs` (plain data) and its storage-facing code.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::{
    AuditAction, CallState, CallableState, ConsensusState, SourceType, VariantStatus, VariantType,
};

/// Sync state of a profile against the external personal-data-store mirror.
///
/// The mirror itself is an external collaborator (spec.md §1); the engine only
/// carries enough state to know whether a sync is owed, in flight, or done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    NotSynced,
    Pending,
    Synced,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::NotSynced
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub biosample_id: Uuid,
    pub consensus_haplogroup: Option<String>,
    pub total_variants: i32,
    pub confirmed_count: i32,
    pub novel_count: i32,
    pub conflict_count: i32,
    pub no_coverage_count: i32,
    pub str_marker_count: i32,
    pub str_confirmed_count: i32,
    pub source_count: i32,
    pub primary_source_type: Option<SourceType>,
    pub callable_region_pct: Option<f64>,
    pub mean_coverage: Option<f64>,
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub at_uri: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Source {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub source_type: SourceType,
    pub vendor: Option<String>,
    pub test_name: Option<String>,
    pub reference_build: Option<String>,
    pub method_tier: i32,
    pub base_concordance_weight: f64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub position: i64,
    pub end_position: Option<i64>,
    pub ref_allele: String,
    pub alt_allele: String,
    pub variant_type: VariantType,
    pub variant_name: Option<String>,
    pub marker_name: Option<String>,
    pub is_in_tree: bool,
    pub consensus_allele: Option<String>,
    pub consensus_state: Option<ConsensusState>,
    pub status: VariantStatus,
    pub confidence_score: f64,
    pub concordant_count: i32,
    pub discordant_count: i32,
    pub source_count: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SourceCall {
    pub id: Uuid,
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
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Alignment {
    pub id: Uuid,
    pub source_call_id: Uuid,
    pub reference_build: String,
    pub position: i64,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub called_allele: Option<String>,
    pub read_depth: Option<i32>,
    pub mapping_quality: Option<i32>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub source_id: Uuid,
    pub contig: String,
    pub start_position: i64,
    pub end_position: i64,
    pub callable_state: CallableState,
    pub mean_coverage: Option<f64>,
    pub mean_mapping_quality: Option<f64>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Audit {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub prior_consensus_allele: Option<String>,
    pub prior_consensus_state: Option<ConsensusState>,
    pub prior_status: Option<VariantStatus>,
    pub new_consensus_allele: Option<String>,
    pub new_consensus_state: Option<ConsensusState>,
    pub new_status: Option<VariantStatus>,
    pub reason: String,
    pub user_id: Option<String>,
}
