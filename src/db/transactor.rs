//! The persistence core's scoped transaction acquisition (spec.md §4.1).
//!
//! `Transactor::read_only` / `Transactor::read_write` each pull one pooled
//! connection, run the caller's block inside a single Postgres transaction, commit on
//! `Ok`, roll back on `Err`, and always return the connection to the pool. Repository
//! and service functions never open a transaction themselves — they take `&mut
//! PgConnection` as their first argument and assume one is already active, exactly as
//! spec.md §4.2 requires ("Repositories do not open transactions; they require one to
//! be active").

use diesel::connection::Connection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::EngineConfig;
use crate::err::{EngineError, EngineResult};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Owns the connection pool and hands out scoped transactions.
pub struct Transactor {
    pool: PgPool,
}

impl Transactor {
    /// Opens the pool against `config.database_url` and applies any pending
    /// migrations, checking the schema version at open per spec.md §6.
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .build(manager)
            .map_err(|e| EngineError::DatabaseError(format!("failed to build pool: {e}")))?;

        {
            let mut conn = pool.get()?;
            if let Some(timeout_ms) = config.statement_timeout_ms {
                diesel::sql_query(format!("SET statement_timeout = {timeout_ms}"))
                    .execute(&mut conn)
                    .map_err(EngineError::from)?;
            }
            conn.run_pending_migrations(MIGRATIONS)
                .map_err(|e| EngineError::DatabaseError(format!("migration failed: {e}")))?;
        }

        tracing::info!("transactor opened, migrations up to date");
        Ok(Self { pool })
    }

    /// Builds a transactor directly from an already-open pool, for collaborators that
    /// manage their own pool lifecycle (e.g. sharing it with other subsystems).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `block` inside a read-only transaction with snapshot semantics. Readers
    /// never block writers (spec.md §5).
    pub fn read_only<T>(
        &self,
        block: impl FnOnce(&mut PgConnection) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            diesel::sql_query("SET TRANSACTION READ ONLY").execute(conn)?;
            block(conn)
        })
    }

    /// Runs `block` inside a read-write transaction. Commits on `Ok`, rolls back on
    /// `Err`. Row-level locks taken inside `block` are held for the duration of the
    /// transaction (single-writer-per-profile, spec.md §5).
    pub fn read_write<T>(
        &self,
        block: impl FnOnce(&mut PgConnection) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut conn = self.pool.get()?;
        conn.transaction(block)
    }
}

/// Distinguishes "no such row" from "stored version differs" for an optimistic
/// update, per spec.md §4.2 (`update` fails with `NotFound` if identity absent,
/// `VersionConflict` if stored version differs).
pub fn classify_update_miss<Conn>(
    conn: &mut Conn,
    exists: impl FnOnce(&mut Conn) -> diesel::QueryResult<bool>,
    context: impl Into<String>,
) -> EngineError {
    let context = context.into();
    match exists(conn) {
        Ok(true) => EngineError::VersionConflict(context),
        Ok(false) => EngineError::NotFound(context),
        Err(e) => EngineError::from(e),
    }
}
