//! A Y-chromosome variant profile engine: persistence and weighted-consensus
//! reconciliation for variant calls gathered from heterogeneous sources (WGS,
//! targeted NGS, capillary electrophoresis, genotyping chips) against a single
//! biological sample's Y chromosome.
//!
//! This crate is a library with no CLI, wire protocol, or environment-variable
//! handling of its own — those are collaborator concerns. Construct an
//! [`EngineConfig`], open a [`Transactor`] against it, and call the [`api`]
//! functions within the transaction scopes it provides.

pub mod api;
pub mod common;
pub mod config;
pub mod db;
pub mod err;
pub mod model;
pub mod repo;
pub mod service;

pub use config::EngineConfig;
pub use db::transactor::Transactor;
pub use err::{EngineError, EngineResult};
