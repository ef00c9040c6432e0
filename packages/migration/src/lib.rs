pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveValue::Set, EntityTrait, QueryTrait, Schema, Statement};
pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::seaql_migrations;
use std::time::Instant;

mod m20250823_000001_create_users; // keep filename + module name in sync

/// Bookkeeping table maintained by the migrator.
pub const MIGRATIONS_TABLE: &str = "seaql_migrations";

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250823_000001_create_users::Migration)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl MigrationCommand {
    /// Whether the command can change the applied migration set.
    pub fn is_mutating(self) -> bool {
        !matches!(self, MigrationCommand::Status)
    }
}

/// Applied vs. defined migrations for one database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationState {
    /// Versions this build ships, in apply order.
    pub defined: Vec<String>,
    /// Versions recorded in the bookkeeping table, in version order.
    pub applied: Vec<String>,
}

impl MigrationState {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn latest_applied(&self) -> Option<&str> {
        self.applied.last().map(String::as_str)
    }

    /// Defined versions not yet applied.
    pub fn pending(&self) -> Vec<&str> {
        self.defined
            .iter()
            .filter(|v| !self.applied.contains(v))
            .map(String::as_str)
            .collect()
    }

    /// Applied versions this build does not define (written by a newer build).
    pub fn unknown(&self) -> Vec<&str> {
        self.applied
            .iter()
            .filter(|v| !self.defined.contains(v))
            .map(String::as_str)
            .collect()
    }

    pub fn is_current(&self) -> bool {
        self.applied == self.defined
    }
}

/// Read the migration state without touching the schema.
///
/// A database that was never migrated has no bookkeeping table; it reports
/// nothing applied and the table is not created.
pub async fn migration_state(db: &DatabaseConnection) -> Result<MigrationState, DbErr> {
    let defined = defined_migration_names();

    if !SchemaManager::new(db).has_table(MIGRATIONS_TABLE).await? {
        return Ok(MigrationState {
            defined,
            applied: Vec::new(),
        });
    }

    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!("SELECT version FROM {MIGRATIONS_TABLE} ORDER BY version"),
    );
    let applied = db
        .query_all(stmt)
        .await?
        .iter()
        .map(|row| row.try_get::<String>("", "version"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MigrationState { defined, applied })
}

/// Run a migration command against an already-open connection and return
/// the state it left behind.
///
/// `Status` only reads; it never creates the bookkeeping table.
pub async fn migrate(
    db: &DatabaseConnection,
    command: MigrationCommand,
) -> Result<MigrationState, DbErr> {
    let backend = db.get_database_backend();
    let before = migration_state(db).await?;

    if !command.is_mutating() {
        for version in &before.defined {
            tracing::info!(
                version = %version,
                applied = before.applied.contains(version),
                "migration status"
            );
        }
        for version in before.unknown() {
            tracing::warn!(version, "applied migration is not defined by this build");
        }
        return Ok(before);
    }

    tracing::info!(
        cmd = ?command,
        backend = ?backend,
        defined = before.defined.len(),
        applied = before.applied_count(),
        "migration command starting"
    );

    let start = Instant::now();
    let result = match command {
        MigrationCommand::Up => Migrator::up(db, None).await,
        MigrationCommand::Down => Migrator::down(db, None).await,
        MigrationCommand::Fresh => Migrator::fresh(db).await,
        MigrationCommand::Reset => Migrator::reset(db).await,
        MigrationCommand::Refresh => Migrator::refresh(db).await,
        MigrationCommand::Status => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!(cmd = ?command, backend = ?backend, error = %e, "migration command failed");
        return Err(e);
    }

    let after = migration_state(db).await?;
    tracing::info!(
        cmd = ?command,
        applied_before = before.applied_count(),
        applied_after = after.applied_count(),
        latest = after.latest_applied().unwrap_or("-"),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "migration command finished"
    );
    Ok(after)
}

/// Names of every migration known to this build, in apply order.
pub fn defined_migration_names() -> Vec<String> {
    Migrator::migrations()
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

/// Number of migrations recorded as applied. 0 for a never-migrated database.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    Ok(migration_state(db).await?.applied_count())
}

/// Version string of the latest applied migration, if any.
pub async fn get_latest_migration_version(
    db: &DatabaseConnection,
) -> Result<Option<String>, DbErr> {
    Ok(migration_state(db).await?.latest_applied().map(str::to_string))
}

/// SQL that records every defined migration as applied, for databases whose
/// schema was created from an offline plan.
///
/// Creates the bookkeeping table the same way the migrator does, then inserts
/// one row per version stamped with `applied_at` (Unix seconds).
pub fn bookkeeping_sql(backend: DatabaseBackend, applied_at: i64) -> String {
    let create = Schema::new(backend)
        .create_table_from_entity(seaql_migrations::Entity)
        .if_not_exists()
        .to_owned();

    let mut statements = vec![format!("{};", backend.build(&create).sql)];
    for version in defined_migration_names() {
        let row = seaql_migrations::ActiveModel {
            version: Set(version),
            applied_at: Set(applied_at),
        };
        let insert = seaql_migrations::Entity::insert(row).build(backend);
        statements.push(format!("{insert};"));
    }
    statements.join("\n")
}
