//! Helpers for suites that run against a real PostgreSQL server.
//!
//! They read `DATABASE_URL` and return `None` unless it points at Postgres,
//! so the suites skip cleanly on machines without a database. Nothing here
//! drops or truncates tables; callers clean up the rows they insert.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

pub const POSTGRES_URL_VAR: &str = "DATABASE_URL";

/// `DATABASE_URL`, when it is a `postgres://` or `postgresql://` URL.
pub fn postgres_url() -> Option<String> {
    std::env::var(POSTGRES_URL_VAR)
        .ok()
        .filter(|url| url.starts_with("postgres://") || url.starts_with("postgresql://"))
}

pub async fn postgres_db(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(5).sqlx_logging(false);
    Database::connect(opt).await
}

/// Connect and apply pending migrations, or `None` when no Postgres is configured.
pub async fn migrated_postgres_db() -> Result<Option<DatabaseConnection>, DbErr> {
    let Some(url) = postgres_url() else {
        eprintln!("{POSTGRES_URL_VAR} is not a postgres url; skipping");
        return Ok(None);
    };
    let db = postgres_db(&url).await?;
    Migrator::up(&db, None).await?;
    Ok(Some(db))
}
