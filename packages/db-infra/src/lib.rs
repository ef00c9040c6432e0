//! Database configuration, migration orchestration and schema drift checks.
//! Used by the migration CLI and by any project that consumes the shared models.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db;
pub use config::file::{MigrationConfig, ResolvedConfig, UrlSource};
pub use error::DbInfraError;
pub use infra::db::core::{build_admin_pool, orchestrate_migration, orchestrate_migration_internal};
pub use infra::db::drift::{check_schema, verify_schema, DriftItem, SchemaDrift};
