//! Shared helpers for the workspace's test suites.
//!
//! Unique test data, idempotent logging setup, throwaway SQLite databases with
//! the shared schema applied, and opt-in PostgreSQL connections.

pub mod logging;
pub mod postgres;
pub mod sqlite;

use ulid::Ulid;

/// Generate a unique string with the given prefix
///
/// # Examples
/// ```
/// use test_support::unique_str;
///
/// let id1 = unique_str("user");
/// let id2 = unique_str("user");
/// assert_ne!(id1, id2);
/// assert!(id1.starts_with("user-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// Generate a unique email address in the format `{prefix}-{ulid}@example.test`
///
/// # Examples
/// ```
/// use test_support::unique_email;
///
/// let email1 = unique_email("test");
/// let email2 = unique_email("test");
/// assert_ne!(email1, email2);
/// assert!(email1.ends_with("@example.test"));
/// ```
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.test", prefix, Ulid::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_str_produces_different_results() {
        assert_ne!(unique_str("user"), unique_str("user"));
    }

    #[test]
    fn test_unique_email_has_correct_format() {
        let email = unique_email("user");
        let parts: Vec<&str> = email.split('@').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "example.test");
        assert!(parts[0].starts_with("user-"));
    }

    #[test]
    fn test_unique_email_fits_column_bound() {
        // 255 is the users.email varchar length
        assert!(unique_email("someone").len() < 255);
    }
}
