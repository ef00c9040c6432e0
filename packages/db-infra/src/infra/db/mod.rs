pub mod core;
pub mod diagnostics;
pub mod drift;
pub mod locking;

pub use core::{build_admin_pool, orchestrate_migration, orchestrate_migration_internal, sanitize_db_url};
pub use diagnostics::migration_counters;
pub use drift::{check_schema, verify_schema, DriftItem, SchemaDrift};
pub use locking::{BootstrapLock, Guard, InMemoryLock, PgAdvisoryLock};
