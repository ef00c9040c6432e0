//! Live schema vs. shared metadata.
//!
//! A database is only considered in sync when every migration this build
//! knows about is applied and every registered table matches its
//! [`TableDef`] column for column.

use std::collections::BTreeSet;
use std::fmt;

use migration::migration_state;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, Value};
use shared_models::{metadata, Metadata, TableDef};
use tracing::{info, warn};

use crate::error::DbInfraError;
use crate::infra::db::diagnostics::migration_counters::{self, MigrationEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftItem {
    PendingMigrations { applied: usize, defined: usize },
    UnknownMigration { version: String },
    MissingTable { table: String },
    MissingColumn { table: String, column: String },
    UnexpectedColumn { table: String, column: String },
    Nullability { table: String, column: String, declared: bool, live: bool },
    Uniqueness { table: String, column: String, declared: bool, live: bool },
    Length { table: String, column: String, declared: Option<u32>, live: Option<u32> },
}

impl fmt::Display for DriftItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftItem::PendingMigrations { applied, defined } => {
                write!(f, "{applied} of {defined} migrations applied")
            }
            DriftItem::UnknownMigration { version } => {
                write!(f, "migration {version} is applied but not defined by this build")
            }
            DriftItem::MissingTable { table } => write!(f, "table {table} is missing"),
            DriftItem::MissingColumn { table, column } => {
                write!(f, "column {table}.{column} is missing")
            }
            DriftItem::UnexpectedColumn { table, column } => {
                write!(f, "column {table}.{column} is not declared by the shared models")
            }
            DriftItem::Nullability { table, column, declared, live } => write!(
                f,
                "column {table}.{column} nullable={live}, models declare nullable={declared}"
            ),
            DriftItem::Uniqueness { table, column, declared, live } => write!(
                f,
                "column {table}.{column} unique={live}, models declare unique={declared}"
            ),
            DriftItem::Length { table, column, declared, live } => write!(
                f,
                "column {table}.{column} max length {live:?}, models declare {declared:?}"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDrift {
    pub items: Vec<DriftItem>,
}

impl SchemaDrift {
    pub fn is_clean(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
struct LiveColumn {
    name: String,
    nullable: bool,
    max_len: Option<u32>,
}

/// Compare the connected database with the process-wide shared metadata.
pub async fn check_schema(conn: &DatabaseConnection) -> Result<SchemaDrift, DbInfraError> {
    check_schema_against(conn, metadata()).await
}

pub async fn check_schema_against(
    conn: &DatabaseConnection,
    expected: &Metadata,
) -> Result<SchemaDrift, DbInfraError> {
    let mut items = Vec::new();

    let state = migration_state(conn)
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to read migration state: {e}")))?;
    if !state.pending().is_empty() {
        items.push(DriftItem::PendingMigrations {
            applied: state.applied_count(),
            defined: state.defined.len(),
        });
    }
    for version in state.unknown() {
        items.push(DriftItem::UnknownMigration {
            version: version.to_string(),
        });
    }

    let backend = conn.get_database_backend();
    for table in &expected.tables {
        let live_columns = live_columns(conn, backend, &table.name).await?;
        if live_columns.is_empty() {
            items.push(DriftItem::MissingTable {
                table: table.name.clone(),
            });
            continue;
        }
        let live_unique = live_unique_columns(conn, backend, &table.name).await?;
        compare_table(table, &live_columns, &live_unique, backend, &mut items);
    }

    Ok(SchemaDrift { items })
}

/// Check the schema and fail with [`DbInfraError::Drift`] unless it is clean.
pub async fn verify_schema(conn: &DatabaseConnection) -> Result<(), DbInfraError> {
    let drift = check_schema(conn).await?;
    if drift.is_clean() {
        info!(
            fingerprint = %metadata().fingerprint(),
            tables = metadata().tables.len(),
            "schema matches shared models"
        );
        return Ok(());
    }

    migration_counters::record(MigrationEvent::DriftDetected);
    for item in &drift.items {
        warn!(drift = %item, "schema drift");
    }
    Err(DbInfraError::Drift {
        count: drift.items.len(),
    })
}

fn compare_table(
    table: &TableDef,
    live_columns: &[LiveColumn],
    live_unique: &BTreeSet<String>,
    backend: DatabaseBackend,
    items: &mut Vec<DriftItem>,
) {
    for declared in &table.columns {
        let Some(live) = live_columns.iter().find(|c| c.name == declared.name) else {
            items.push(DriftItem::MissingColumn {
                table: table.name.clone(),
                column: declared.name.clone(),
            });
            continue;
        };

        // SQLite reports the INTEGER PRIMARY KEY rowid alias as nullable
        // unless NOT NULL was spelled out; the primary key itself forbids NULL.
        let live_nullable = live.nullable && !declared.primary_key;
        if live_nullable != declared.nullable {
            items.push(DriftItem::Nullability {
                table: table.name.clone(),
                column: declared.name.clone(),
                declared: declared.nullable,
                live: live_nullable,
            });
        }

        let is_live_unique = live_unique.contains(&declared.name);
        if !declared.primary_key && is_live_unique != declared.unique {
            items.push(DriftItem::Uniqueness {
                table: table.name.clone(),
                column: declared.name.clone(),
                declared: declared.unique,
                live: is_live_unique,
            });
        }

        // SQLite does not enforce or report varchar lengths.
        if backend == DatabaseBackend::Postgres && live.max_len != declared.max_len {
            items.push(DriftItem::Length {
                table: table.name.clone(),
                column: declared.name.clone(),
                declared: declared.max_len,
                live: live.max_len,
            });
        }
    }

    for live in live_columns {
        if table.column(&live.name).is_none() {
            items.push(DriftItem::UnexpectedColumn {
                table: table.name.clone(),
                column: live.name.clone(),
            });
        }
    }
}

async fn live_columns(
    conn: &DatabaseConnection,
    backend: DatabaseBackend,
    table: &str,
) -> Result<Vec<LiveColumn>, DbInfraError> {
    let sql = match backend {
        DatabaseBackend::Postgres => {
            r#"SELECT column_name::text AS column_name,
                      (is_nullable = 'YES') AS nullable,
                      character_maximum_length::int4 AS max_len
               FROM information_schema.columns
               WHERE table_schema = current_schema() AND table_name::text = $1
               ORDER BY ordinal_position"#
        }
        DatabaseBackend::Sqlite => {
            r#"SELECT name AS column_name,
                      CASE WHEN "notnull" = 0 THEN 1 ELSE 0 END AS nullable
               FROM pragma_table_info(?)
               ORDER BY cid"#
        }
        other => return Err(unsupported(other)),
    };

    let rows = conn
        .query_all(Statement::from_sql_and_values(
            backend,
            sql,
            [Value::from(table.to_string())],
        ))
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to read columns of {table}: {e}")))?;

    rows.iter()
        .map(|row| -> Result<LiveColumn, sea_orm::DbErr> {
            let name: String = row.try_get("", "column_name")?;
            let (nullable, max_len) = match backend {
                DatabaseBackend::Postgres => {
                    let nullable: bool = row.try_get("", "nullable")?;
                    let max_len: Option<i32> = row.try_get("", "max_len")?;
                    (nullable, max_len.and_then(|n| u32::try_from(n).ok()))
                }
                _ => {
                    let nullable: i64 = row.try_get("", "nullable")?;
                    (nullable != 0, None)
                }
            };
            Ok(LiveColumn {
                name,
                nullable,
                max_len,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbInfraError::migration(format!("failed to decode columns of {table}: {e}")))
}

/// Columns covered by a single-column unique index or constraint.
async fn live_unique_columns(
    conn: &DatabaseConnection,
    backend: DatabaseBackend,
    table: &str,
) -> Result<BTreeSet<String>, DbInfraError> {
    let sql = match backend {
        DatabaseBackend::Postgres => {
            r#"SELECT a.attname::text AS column_name
               FROM pg_index i
               JOIN pg_class c ON c.oid = i.indrelid
               JOIN pg_namespace n ON n.oid = c.relnamespace
               JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
               WHERE c.relname::text = $1
                 AND n.nspname = current_schema()
                 AND i.indisunique
                 AND NOT i.indisprimary
                 AND i.indnatts = 1"#
        }
        DatabaseBackend::Sqlite => {
            r#"SELECT ii.name AS column_name
               FROM pragma_index_list(?) AS il
               JOIN pragma_index_info(il.name) AS ii
               WHERE il."unique" = 1
                 AND il.origin != 'pk'
                 AND (SELECT COUNT(*) FROM pragma_index_info(il.name)) = 1"#
        }
        other => return Err(unsupported(other)),
    };

    let rows = conn
        .query_all(Statement::from_sql_and_values(
            backend,
            sql,
            [Value::from(table.to_string())],
        ))
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to read indexes of {table}: {e}")))?;

    rows.iter()
        .map(|row| row.try_get::<String>("", "column_name"))
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|e| DbInfraError::migration(format!("failed to decode indexes of {table}: {e}")))
}

fn unsupported(backend: DatabaseBackend) -> DbInfraError {
    DbInfraError::config(format!(
        "schema checks are not supported for {backend:?}"
    ))
}
