//! The shared table registry.
//!
//! [`metadata()`] is the single source of truth for table shape. Migration
//! drift checks and offline SQL rendering both read from it, and every
//! consumer of this crate sees the same object.

use once_cell::sync::Lazy;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{StringLen, TableCreateStatement};
use sea_orm::{DbBackend, Iterable, Schema};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::entities::users;

static METADATA: Lazy<Metadata> = Lazy::new(Metadata::collect);

/// Process-wide metadata, built on first use.
pub fn metadata() -> &'static Metadata {
    &METADATA
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub tables: Vec<TableDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Declared length for bounded text columns.
    pub max_len: Option<u32>,
}

impl Metadata {
    /// Build the metadata from the registered entities.
    ///
    /// Registration order must match [`create_table_statements`].
    pub fn collect() -> Self {
        Self {
            tables: vec![table_def(users::Entity)],
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Stable hash of the canonical table rendering, as 16 hex digits.
    ///
    /// Two builds with the same entities produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", xxh3_64(self.canonical().as_bytes()))
    }

    fn canonical(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            out.push_str(&table.name);
            out.push('(');
            for col in &table.columns {
                out.push_str(&format!(
                    "{}:{}:{}:{}:{};",
                    col.name, col.column_type, col.nullable, col.unique, col.primary_key
                ));
            }
            out.push_str(")\n");
        }
        out
    }
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn table_def<E: EntityTrait>(entity: E) -> TableDef {
    let primary_keys: Vec<String> = E::PrimaryKey::iter()
        .map(|pk| pk.into_column().as_str().to_string())
        .collect();

    let columns = E::Column::iter()
        .map(|col| {
            let def = col.def();
            let name = col.as_str().to_string();
            let max_len = match def.get_column_type() {
                ColumnType::String(StringLen::N(n)) => Some(*n),
                _ => None,
            };
            ColumnSpec {
                primary_key: primary_keys.contains(&name),
                column_type: format!("{:?}", def.get_column_type()),
                nullable: def.is_null(),
                unique: def.is_unique(),
                max_len,
                name,
            }
        })
        .collect();

    TableDef {
        name: entity.table_name().to_string(),
        columns,
    }
}

/// `CREATE TABLE` statements for every registered entity, in registry order.
pub fn create_table_statements(backend: DbBackend) -> Vec<TableCreateStatement> {
    let schema = Schema::new(backend);
    vec![schema
        .create_table_from_entity(users::Entity)
        .if_not_exists()
        .to_owned()]
}

/// Literal DDL for the whole registry, one statement per line.
pub fn render_ddl(backend: DbBackend) -> String {
    create_table_statements(backend)
        .iter()
        .map(|stmt| format!("{};", backend.build(stmt).sql))
        .collect::<Vec<_>>()
        .join("\n")
}
