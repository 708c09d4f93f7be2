//! Typed failure kinds for the engine.
//!
//! Every public operation in [`crate::api`] returns [`EngineResult<T>`] rather than
//! panicking or propagating an opaque error. Messages identify the failing entity by
//! biosample accession or variant coordinate, never by internal numeric id.

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;

/// Discriminated failure kinds, per spec.md §7.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Identity refers to no row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Violates a uniqueness constraint.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Optimistic update failed: the stored version did not match the caller's.
    #[error("version conflict on {0}")]
    VersionConflict(String),

    /// A post-write invariant check failed; the transaction was rolled back.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Precondition on input not satisfied.
    #[error("validation failed on field `{field}`: {message}")]
    ValidationFailure { field: String, message: String },

    /// Underlying driver error.
    #[error("database error: {0}")]
    DatabaseError(String),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ValidationFailure {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<diesel::result::Error> for EngineError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => EngineError::NotFound("row not found".into()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => EngineError::DuplicateKey(info.message().to_string()),
            other => EngineError::DatabaseError(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for EngineError {
    fn from(e: r2d2::Error) -> Self {
        EngineError::DatabaseError(format!("connection pool error: {e}"))
    }
}
