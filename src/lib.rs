pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod schema;
pub mod security;
pub mod tasks;
#[cfg(test)]
pub mod test_helpers;
pub mod types;

// Type definitions
use actix_web::web;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type RqDbPool = web::Data<DbPool>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/migrations");

/// Writers wait this long for SQLite's write lock before failing.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Session settings every connection needs: a busy timeout so concurrent
/// writers queue instead of failing, WAL journaling, and enforced foreign keys.
pub fn configure_connection(conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute(&format!(
        "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;",
        BUSY_TIMEOUT_MS
    ))
}

/// Applies [`configure_connection`] to each pooled connection as it is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionOptions;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        configure_connection(conn).map_err(r2d2::Error::QueryError)
    }
}

pub fn initialize_db_pool(db_path: &str) -> Result<DbPool, r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    r2d2::Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
}

/// Applies any migrations not yet recorded in the database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        tracing::info!(%version, "Applied migration");
    }
    Ok(())
}
