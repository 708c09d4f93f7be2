//! Entity repositories (spec.md §4.2).
//!
//! Every function here takes `&mut PgConnection` as its first argument and assumes a
//! transaction is already active — repositories never call `Transactor` themselves.
//! Mirrors the teacher's convention of one file per cohesive concern under a shared
//! `mod.rs` (e.g. `src/seqvars/query/output/*.rs`).

pub mod alignment;
pub mod audit;
pub mod profile;
pub mod region;
pub mod source;
pub mod source_call;
pub mod variant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn new_id() -> Uuid {
    Uuid::new_v4()
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
