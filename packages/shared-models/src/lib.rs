//! Declarative models shared by every project that reads or writes the users
//! database.
//!
//! Consumers import the entities and [`metadata()`] from here instead of
//! declaring their own tables, so there is exactly one definition of each
//! table's shape.

pub mod entities;
pub mod error;
pub mod metadata;
pub mod repos;

pub use entities::{User, Users};
pub use error::{ConflictKind, ModelError};
pub use metadata::{metadata, ColumnSpec, Metadata, TableDef};
