//! Throwaway in-memory SQLite databases for tests.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

pub const MEMORY_URL: &str = "sqlite::memory:";

/// Open an empty in-memory database.
///
/// The pool is pinned to one connection: every new SQLite memory connection
/// would otherwise see its own empty database.
pub async fn memory_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(MEMORY_URL);
    opt.min_connections(1)
        .max_connections(1)
        .sqlx_logging(false);
    Database::connect(opt).await
}

/// Open an in-memory database with every migration applied.
pub async fn migrated_memory_db() -> Result<DatabaseConnection, DbErr> {
    let db = memory_db().await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}
