//! Errors raised by the shared repository helpers.
//!
//! Database errors are translated once here so every consumer sees the same
//! conflict kinds for the same constraint violations.

use sea_orm::DbErr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    UniqueEmail,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    User,
    Other(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict {kind:?}: {detail}")]
    Conflict { kind: ConflictKind, detail: String },
    #[error("not found {kind:?}: {detail}")]
    NotFound { kind: NotFoundKind, detail: String },
    #[error("database error: {0}")]
    Db(#[source] DbErr),
}

impl ModelError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            detail: detail.into(),
        }
    }

    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            detail: detail.into(),
        }
    }

    pub fn conflict_kind(&self) -> Option<&ConflictKind> {
        match self {
            Self::Conflict { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self {
        map_db_err(e)
    }
}

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Extract `table.column` from SQLite "UNIQUE constraint failed: table.column".
fn extract_sqlite_table_column(error_msg: &str) -> Option<&str> {
    let marker = "UNIQUE constraint failed: ";
    let start = error_msg.find(marker)? + marker.len();
    error_msg[start..].split_whitespace().next()
}

fn is_email_constraint(error_msg: &str) -> bool {
    error_msg.contains("users_email_key")
        || extract_sqlite_table_column(error_msg) == Some("users.email")
}

/// Translate a `DbErr` into a `ModelError`.
pub fn map_db_err(e: DbErr) -> ModelError {
    if let DbErr::RecordNotFound(detail) = &e {
        return ModelError::not_found(NotFoundKind::Other("Record".into()), detail.clone());
    }

    let error_msg = e.to_string();
    let is_unique = matches!(
        e.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) || mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
        || error_msg.contains("UNIQUE constraint failed");

    if is_unique {
        warn!(raw_error = %error_msg, "Unique constraint violation");
        if is_email_constraint(&error_msg) {
            return ModelError::conflict(ConflictKind::UniqueEmail, "Email already registered");
        }
        return ModelError::conflict(
            ConflictKind::Other("Unique".into()),
            "Unique constraint violation",
        );
    }

    ModelError::Db(e)
}
