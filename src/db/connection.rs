//! Connection setup and embedded migrations.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{DbError, DbErrorKind};

/// Schema of the authoritative game database.
pub const SERVER_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/server");

/// Schema of the local replay database.
pub const REPLAY_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/replay");

/// Opens a connection with foreign key enforcement switched on.
///
/// SQLite leaves foreign keys off per connection, and cascading deletes
/// depend on them.
#[instrument]
pub(crate) fn connect(db_path: &str) -> Result<SqliteConnection, DbError> {
    debug!(path = %db_path, "Establishing connection");
    let mut conn = SqliteConnection::establish(db_path)
        .map_err(|e| {
            DbError::with_kind(
                DbErrorKind::Connection,
                format!("Failed to connect to '{}': {}", db_path, e),
            )
        })?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
    Ok(conn)
}

/// Applies any pending migrations from `migrations` to the database at `db_path`.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or a migration fails.
#[instrument(skip(migrations))]
pub fn run_migrations(db_path: &str, migrations: EmbeddedMigrations) -> Result<(), DbError> {
    let mut conn = connect(db_path)?;
    let applied = conn
        .run_pending_migrations(migrations)
        .map_err(|e| {
            DbError::with_kind(
                DbErrorKind::Query,
                format!("Migrations failed on '{}': {}", db_path, e),
            )
        })?;
    info!(path = %db_path, applied = applied.len(), "Migrations applied");
    Ok(())
}
