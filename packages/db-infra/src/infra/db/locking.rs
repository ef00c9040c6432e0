use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, Value};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::DbInfraError;

pub fn pg_lock_id(key: &str) -> i64 {
    xxh3_64(key.as_bytes()) as i64
}

/// A held migration lock.
///
/// Postgres guards keep the admin-pool handle and the advisory lock key; the
/// no-op guard keeps neither.
pub struct Guard {
    admin_pool: Option<DatabaseConnection>,
    lock_key: i64,
    released: bool,
}

impl Guard {
    fn postgres(admin_pool: DatabaseConnection, lock_key: i64) -> Self {
        Self {
            admin_pool: Some(admin_pool),
            lock_key,
            released: false,
        }
    }

    fn in_memory() -> Self {
        Self {
            admin_pool: None,
            lock_key: 0,
            released: false,
        }
    }

    pub fn lock_key(&self) -> i64 {
        self.lock_key
    }

    /// Release the lock. Unlock failures are logged, not returned: the
    /// session-level advisory lock also goes away when the connection closes.
    pub async fn release(mut self) -> Result<(), DbInfraError> {
        if self.released {
            return Ok(());
        }

        let Some(admin_pool) = self.admin_pool.take() else {
            self.released = true;
            return Ok(());
        };

        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_advisory_unlock($1) AS unlocked",
            [Value::from(self.lock_key)],
        );

        match admin_pool.query_one(stmt).await {
            Ok(Some(row)) => {
                let unlocked: bool = row
                    .try_get("", "unlocked")
                    .map_err(|e| DbInfraError::lock(format!("failed to read unlock result: {e}")))?;
                if !unlocked {
                    warn!(
                        code = "PG_UNLOCK_FALSE",
                        lock_key = self.lock_key,
                        "Advisory lock unlock returned false"
                    );
                } else {
                    debug!(lock_key = self.lock_key, "Advisory lock released");
                }
            }
            Ok(None) => {
                warn!(
                    lock_key = self.lock_key,
                    "No result from advisory lock unlock query"
                );
            }
            Err(e) => {
                warn!(error = %e, lock_key = self.lock_key, "Failed to unlock advisory lock");
            }
        }

        self.released = true;
        Ok(())
    }
}

/// Migration lock acquisition.
#[async_trait]
pub trait BootstrapLock: Send {
    /// Try to acquire the lock without blocking.
    /// Returns `Some(Guard)` if acquired, `None` if another session holds it.
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError>;
}

/// PostgreSQL session advisory lock taken on the admin pool
pub struct PgAdvisoryLock {
    admin_pool: DatabaseConnection,
    lock_key: i64,
}

impl PgAdvisoryLock {
    /// INVARIANT: the admin pool is configured with min=max=1 so every
    /// checkout reuses the session that holds the advisory lock.
    pub fn new(admin_pool: DatabaseConnection, key: &str) -> Self {
        Self {
            admin_pool,
            lock_key: pg_lock_id(key),
        }
    }
}

#[async_trait]
impl BootstrapLock for PgAdvisoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        let lock_stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_try_advisory_lock($1) AS locked",
            [Value::from(self.lock_key)],
        );

        let row = self
            .admin_pool
            .query_one(lock_stmt)
            .await
            .map_err(|e| DbInfraError::lock(format!("failed to acquire advisory lock: {e}")))?
            .ok_or_else(|| DbInfraError::lock("pg_try_advisory_lock returned no row"))?;

        let locked: bool = row
            .try_get("", "locked")
            .map_err(|e| DbInfraError::lock(format!("failed to read lock result: {e}")))?;

        if !locked {
            return Ok(None);
        }

        Ok(Some(Guard::postgres(self.admin_pool.clone(), self.lock_key)))
    }
}

/// No-op lock for SQLite, which is only used single-process (tests, local runs).
pub struct InMemoryLock;

#[async_trait]
impl BootstrapLock for InMemoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        Ok(Some(Guard::in_memory()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_id_is_deterministic_per_key() {
        assert_eq!(pg_lock_id("a"), pg_lock_id("a"));
        assert_ne!(pg_lock_id("a"), pg_lock_id("b"));
    }

    #[tokio::test]
    async fn in_memory_lock_always_acquires() {
        let mut lock = InMemoryLock;
        let first = lock.try_acquire().await.unwrap().expect("guard");
        let second = lock.try_acquire().await.unwrap().expect("guard");

        first.release().await.unwrap();
        second.release().await.unwrap();
    }
}
