//! Persistence core: schema, row models, and the transactor.

pub mod models;
pub mod schema;
pub mod transactor;

pub use transactor::Transactor;
