//! Diesel-mapped row structs and their conversions to/from [`crate::model`].
//!
//! Enum columns are stored as `TEXT` and round-tripped through `strum`'s
//! `Display`/`FromStr`, the same approach the teacher uses for `GenomeRelease` and
//! friends in `src/db/conf.rs` (there via `serde`, here via a plain text column).

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::schema::*;
use crate::err::{EngineError, EngineResult};
use crate::model;

fn parse_enum<T: FromStr>(field: &str, raw: &str) -> EngineResult<T> {
    raw.parse::<T>()
        .map_err(|_| EngineError::InvariantViolation(format!("unreadable {field} value: {raw}")))
}

fn parse_opt_enum<T: FromStr>(field: &str, raw: Option<&str>) -> EngineResult<Option<T>> {
    raw.map(|r| parse_enum(field, r)).transpose()
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_profiles)]
pub struct ProfileRow {
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
    pub primary_source_type: Option<String>,
    pub callable_region_pct: Option<f64>,
    pub mean_coverage: Option<f64>,
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub sync_status: String,
    pub at_uri: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn into_model(self) -> EngineResult<model::Profile> {
        Ok(model::Profile {
            id: self.id,
            biosample_id: self.biosample_id,
            consensus_haplogroup: self.consensus_haplogroup,
            total_variants: self.total_variants,
            confirmed_count: self.confirmed_count,
            novel_count: self.novel_count,
            conflict_count: self.conflict_count,
            no_coverage_count: self.no_coverage_count,
            str_marker_count: self.str_marker_count,
            str_confirmed_count: self.str_confirmed_count,
            source_count: self.source_count,
            primary_source_type: parse_opt_enum("primary_source_type", self.primary_source_type.as_deref())?,
            callable_region_pct: self.callable_region_pct,
            mean_coverage: self.mean_coverage,
            last_reconciled_at: self.last_reconciled_at,
            sync_status: parse_enum("sync_status", &self.sync_status)?,
            at_uri: self.at_uri,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&model::Profile> for ProfileRow {
    fn from(p: &model::Profile) -> Self {
        ProfileRow {
            id: p.id,
            biosample_id: p.biosample_id,
            consensus_haplogroup: p.consensus_haplogroup.clone(),
            total_variants: p.total_variants,
            confirmed_count: p.confirmed_count,
            novel_count: p.novel_count,
            conflict_count: p.conflict_count,
            no_coverage_count: p.no_coverage_count,
            str_marker_count: p.str_marker_count,
            str_confirmed_count: p.str_confirmed_count,
            source_count: p.source_count,
            primary_source_type: p.primary_source_type.map(|s| s.to_string()),
            callable_region_pct: p.callable_region_pct,
            mean_coverage: p.mean_coverage,
            last_reconciled_at: p.last_reconciled_at,
            sync_status: p.sync_status.to_string(),
            at_uri: p.at_uri.clone(),
            version: p.version,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_profile_sources)]
pub struct SourceRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub source_type: String,
    pub vendor: Option<String>,
    pub test_name: Option<String>,
    pub reference_build: Option<String>,
    pub method_tier: i32,
    pub base_concordance_weight: f64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceRow {
    pub fn into_model(self) -> EngineResult<model::Source> {
        Ok(model::Source {
            id: self.id,
            profile_id: self.profile_id,
            source_type: parse_enum("source_type", &self.source_type)?,
            vendor: self.vendor,
            test_name: self.test_name,
            reference_build: self.reference_build,
            method_tier: self.method_tier,
            base_concordance_weight: self.base_concordance_weight,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&model::Source> for SourceRow {
    fn from(s: &model::Source) -> Self {
        SourceRow {
            id: s.id,
            profile_id: s.profile_id,
            source_type: s.source_type.to_string(),
            vendor: s.vendor.clone(),
            test_name: s.test_name.clone(),
            reference_build: s.reference_build.clone(),
            method_tier: s.method_tier,
            base_concordance_weight: s.base_concordance_weight,
            version: s.version,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_profile_variants)]
pub struct VariantRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub position: i64,
    pub end_position: Option<i64>,
    pub ref_allele: String,
    pub alt_allele: String,
    pub variant_type: String,
    pub variant_name: Option<String>,
    pub marker_name: Option<String>,
    pub is_in_tree: bool,
    pub consensus_allele: Option<String>,
    pub consensus_state: Option<String>,
    pub status: String,
    pub confidence_score: f64,
    pub concordant_count: i32,
    pub discordant_count: i32,
    pub source_count: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    pub fn into_model(self) -> EngineResult<model::Variant> {
        Ok(model::Variant {
            id: self.id,
            profile_id: self.profile_id,
            position: self.position,
            end_position: self.end_position,
            ref_allele: self.ref_allele,
            alt_allele: self.alt_allele,
            variant_type: parse_enum("variant_type", &self.variant_type)?,
            variant_name: self.variant_name,
            marker_name: self.marker_name,
            is_in_tree: self.is_in_tree,
            consensus_allele: self.consensus_allele,
            consensus_state: parse_opt_enum("consensus_state", self.consensus_state.as_deref())?,
            status: parse_enum("status", &self.status)?,
            confidence_score: self.confidence_score,
            concordant_count: self.concordant_count,
            discordant_count: self.discordant_count,
            source_count: self.source_count,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&model::Variant> for VariantRow {
    fn from(v: &model::Variant) -> Self {
        VariantRow {
            id: v.id,
            profile_id: v.profile_id,
            position: v.position,
            end_position: v.end_position,
            ref_allele: v.ref_allele.clone(),
            alt_allele: v.alt_allele.clone(),
            variant_type: v.variant_type.to_string(),
            variant_name: v.variant_name.clone(),
            marker_name: v.marker_name.clone(),
            is_in_tree: v.is_in_tree,
            consensus_allele: v.consensus_allele.clone(),
            consensus_state: v.consensus_state.map(|s| s.to_string()),
            status: v.status.to_string(),
            confidence_score: v.confidence_score,
            concordant_count: v.concordant_count,
            discordant_count: v.discordant_count,
            source_count: v.source_count,
            version: v.version,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_variant_source_calls)]
pub struct SourceCallRow {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub source_id: Uuid,
    pub called_allele: String,
    pub call_state: String,
    pub called_repeat_count: Option<i32>,
    pub read_depth: Option<i32>,
    pub mapping_quality: Option<i32>,
    pub variant_allele_frequency: Option<f64>,
    pub callable_state: Option<String>,
    pub concordance_weight: f64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceCallRow {
    pub fn into_model(self) -> EngineResult<model::SourceCall> {
        Ok(model::SourceCall {
            id: self.id,
            variant_id: self.variant_id,
            source_id: self.source_id,
            called_allele: self.called_allele,
            call_state: parse_enum("call_state", &self.call_state)?,
            called_repeat_count: self.called_repeat_count,
            read_depth: self.read_depth,
            mapping_quality: self.mapping_quality,
            variant_allele_frequency: self.variant_allele_frequency,
            callable_state: parse_opt_enum("callable_state", self.callable_state.as_deref())?,
            concordance_weight: self.concordance_weight,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&model::SourceCall> for SourceCallRow {
    fn from(c: &model::SourceCall) -> Self {
        SourceCallRow {
            id: c.id,
            variant_id: c.variant_id,
            source_id: c.source_id,
            called_allele: c.called_allele.clone(),
            call_state: c.call_state.to_string(),
            called_repeat_count: c.called_repeat_count,
            read_depth: c.read_depth,
            mapping_quality: c.mapping_quality,
            variant_allele_frequency: c.variant_allele_frequency,
            callable_state: c.callable_state.map(|s| s.to_string()),
            concordance_weight: c.concordance_weight,
            version: c.version,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_source_call_alignments)]
pub struct AlignmentRow {
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

impl AlignmentRow {
    pub fn into_model(self) -> model::Alignment {
        model::Alignment {
            id: self.id,
            source_call_id: self.source_call_id,
            reference_build: self.reference_build,
            position: self.position,
            ref_allele: self.ref_allele,
            alt_allele: self.alt_allele,
            called_allele: self.called_allele,
            read_depth: self.read_depth,
            mapping_quality: self.mapping_quality,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<&model::Alignment> for AlignmentRow {
    fn from(a: &model::Alignment) -> Self {
        AlignmentRow {
            id: a.id,
            source_call_id: a.source_call_id,
            reference_build: a.reference_build.clone(),
            position: a.position,
            ref_allele: a.ref_allele.clone(),
            alt_allele: a.alt_allele.clone(),
            called_allele: a.called_allele.clone(),
            read_depth: a.read_depth,
            mapping_quality: a.mapping_quality,
            version: a.version,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = y_profile_regions)]
pub struct RegionRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub source_id: Uuid,
    pub contig: String,
    pub start_position: i64,
    pub end_position: i64,
    pub callable_state: String,
    pub mean_coverage: Option<f64>,
    pub mean_mapping_quality: Option<f64>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegionRow {
    pub fn into_model(self) -> EngineResult<model::Region> {
        Ok(model::Region {
            id: self.id,
            profile_id: self.profile_id,
            source_id: self.source_id,
            contig: self.contig,
            start_position: self.start_position,
            end_position: self.end_position,
            callable_state: parse_enum("callable_state", &self.callable_state)?,
            mean_coverage: self.mean_coverage,
            mean_mapping_quality: self.mean_mapping_quality,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&model::Region> for RegionRow {
    fn from(r: &model::Region) -> Self {
        RegionRow {
            id: r.id,
            profile_id: r.profile_id,
            source_id: r.source_id,
            contig: r.contig.clone(),
            start_position: r.start_position,
            end_position: r.end_position,
            callable_state: r.callable_state.to_string(),
            mean_coverage: r.mean_coverage,
            mean_mapping_quality: r.mean_mapping_quality,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = y_variant_audits)]
pub struct AuditRow {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub prior_consensus_allele: Option<String>,
    pub prior_consensus_state: Option<String>,
    pub prior_status: Option<String>,
    pub new_consensus_allele: Option<String>,
    pub new_consensus_state: Option<String>,
    pub new_status: Option<String>,
    pub reason: String,
    pub user_id: Option<String>,
}

impl AuditRow {
    pub fn into_model(self) -> EngineResult<model::Audit> {
        Ok(model::Audit {
            id: self.id,
            variant_id: self.variant_id,
            timestamp: self.timestamp,
            action: parse_enum("action", &self.action)?,
            prior_consensus_allele: self.prior_consensus_allele,
            prior_consensus_state: parse_opt_enum(
                "prior_consensus_state",
                self.prior_consensus_state.as_deref(),
            )?,
            prior_status: parse_opt_enum("prior_status", self.prior_status.as_deref())?,
            new_consensus_allele: self.new_consensus_allele,
            new_consensus_state: parse_opt_enum(
                "new_consensus_state",
                self.new_consensus_state.as_deref(),
            )?,
            new_status: parse_opt_enum("new_status", self.new_status.as_deref())?,
            reason: self.reason,
            user_id: self.user_id,
        })
    }
}

impl From<&model::Audit> for AuditRow {
    fn from(a: &model::Audit) -> Self {
        AuditRow {
            id: a.id,
            variant_id: a.variant_id,
            timestamp: a.timestamp,
            action: a.action.to_string(),
            prior_consensus_allele: a.prior_consensus_allele.clone(),
            prior_consensus_state: a.prior_consensus_state.map(|s| s.to_string()),
            prior_status: a.prior_status.map(|s| s.to_string()),
            new_consensus_allele: a.new_consensus_allele.clone(),
            new_consensus_state: a.new_consensus_state.map(|s| s.to_string()),
            new_status: a.new_status.map(|s| s.to_string()),
            reason: a.reason.clone(),
            user_id: a.user_id.clone(),
        }
    }
}
