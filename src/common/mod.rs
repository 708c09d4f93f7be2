//! Shared enums and weight tables used across repositories, the reconciliation
//! service, and the query surface.

pub mod weights;

use serde::{Deserialize, Serialize};

/// The kind of test that produced a [`crate::model::SourceCall`], per spec.md §3.
#[derive(
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    WgsShortRead,
    WgsLongRead,
    TargetedNgs,
    CapillaryElectrophoresis,
    Chip,
}

/// The call state reported by a source for a single variant.
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    Derived,
    Ancestral,
    NoCall,
}

/// The reconciled consensus state of a variant. Structurally identical to
/// [`CallState`] minus `NoCall`'s ambiguity as a *consensus* outcome, but kept as a
/// distinct type because the two enums evolve for different reasons (one is what a
/// single source reported, the other is what the engine concluded).
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusState {
    Derived,
    Ancestral,
    NoCall,
}

impl From<CallState> for ConsensusState {
    fn from(c: CallState) -> Self {
        match c {
            CallState::Derived => ConsensusState::Derived,
            CallState::Ancestral => ConsensusState::Ancestral,
            CallState::NoCall => ConsensusState::NoCall,
        }
    }
}

/// The reconciled status of a variant.
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantStatus {
    Confirmed,
    Novel,
    Conflict,
    NoCoverage,
    Manual,
}

/// The kind of genomic alteration a variant represents.
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq, enum_map::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantType {
    Snp,
    Indel,
    Str,
    Mnv,
    Cnv,
}

/// Coverage/mapping-quality annotation of a genomic interval, per spec.md §3/§4.5.
///
/// Ordered so that `CallableState::CALLABLE < ... ` is *not* implied by derive order;
/// precedence for interval merging lives in [`crate::service::region_index`], not here.
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CallableState {
    Callable,
    LowCoverage,
    NoCoverage,
    PoorMappingQuality,
    RefN,
}

/// A reconciliation or override action recorded in the audit log, per spec.md §3.
#[derive(Serialize, Deserialize, strum::EnumString, strum::Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Override,
    Revert,
    Reconcile,
}

/// A named assembly of a reference genome, e.g. `GRCh38`, `GRCh37`, `hs1`.
///
/// Unlike [`crate::common::SourceType`] and friends this is not a closed enum: new
/// reference builds appear over time (CHM13/hs1, future T2T assemblies) without any
/// change to engine semantics, so it is carried as an opaque interned string.
pub type ReferenceBuild = String;
