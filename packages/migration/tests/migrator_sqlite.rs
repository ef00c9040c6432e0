use migration::sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, Statement};
use migration::{
    bookkeeping_sql, count_applied_migrations, defined_migration_names,
    get_latest_migration_version, migrate, migration_state, ConnectionTrait, DatabaseBackend,
    MigrationCommand, MIGRATIONS_TABLE,
};

async fn memory_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.min_connections(1).max_connections(1).sqlx_logging(false);
    Database::connect(opt).await
}

async fn table_names(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        ))
        .await?;
    rows.iter().map(|row| row.try_get("", "name")).collect()
}

#[tokio::test]
async fn fresh_database_has_nothing_applied() -> Result<(), DbErr> {
    let db = memory_db().await?;

    assert_eq!(count_applied_migrations(&db).await?, 0);
    assert_eq!(get_latest_migration_version(&db).await?, None);
    Ok(())
}

#[tokio::test]
async fn reading_state_does_not_create_the_bookkeeping_table() -> Result<(), DbErr> {
    let db = memory_db().await?;

    let state = migration_state(&db).await?;

    assert!(state.applied.is_empty());
    assert_eq!(state.pending().len(), defined_migration_names().len());
    assert!(table_names(&db).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn up_applies_every_defined_migration() -> Result<(), DbErr> {
    let db = memory_db().await?;

    let state = migrate(&db, MigrationCommand::Up).await?;

    let defined = defined_migration_names();
    assert!(state.is_current());
    assert_eq!(count_applied_migrations(&db).await?, defined.len());
    assert_eq!(
        get_latest_migration_version(&db).await?,
        defined.last().cloned()
    );
    assert!(table_names(&db).await?.contains(&"users".to_string()));
    Ok(())
}

#[tokio::test]
async fn up_is_idempotent() -> Result<(), DbErr> {
    let db = memory_db().await?;

    migrate(&db, MigrationCommand::Up).await?;
    let state = migrate(&db, MigrationCommand::Up).await?;

    assert_eq!(state.applied, defined_migration_names());
    Ok(())
}

#[tokio::test]
async fn reset_rolls_everything_back() -> Result<(), DbErr> {
    let db = memory_db().await?;

    migrate(&db, MigrationCommand::Up).await?;
    let state = migrate(&db, MigrationCommand::Reset).await?;

    assert_eq!(state.applied_count(), 0);
    assert!(!table_names(&db).await?.contains(&"users".to_string()));
    Ok(())
}

#[tokio::test]
async fn status_only_reads() -> Result<(), DbErr> {
    let db = memory_db().await?;

    let state = migrate(&db, MigrationCommand::Status).await?;

    assert_eq!(state.applied_count(), 0);
    assert!(table_names(&db).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_versions_are_reported() -> Result<(), DbErr> {
    let db = memory_db().await?;
    migrate(&db, MigrationCommand::Up).await?;
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        format!("INSERT INTO {MIGRATIONS_TABLE} (version, applied_at) VALUES ('m99990101_000001_later', 0)"),
    ))
    .await?;

    let state = migration_state(&db).await?;

    assert!(!state.is_current());
    assert!(state.pending().is_empty());
    assert_eq!(state.unknown(), vec!["m99990101_000001_later"]);
    Ok(())
}

#[tokio::test]
async fn bookkeeping_sql_marks_every_migration_applied() -> Result<(), DbErr> {
    let db = memory_db().await?;

    for stmt in bookkeeping_sql(DatabaseBackend::Sqlite, 1_700_000_000).split(";\n") {
        let stmt = stmt.trim_end_matches(';');
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, stmt))
            .await?;
    }

    let state = migration_state(&db).await?;
    assert_eq!(state.applied, defined_migration_names());
    Ok(())
}

#[test]
fn migration_names_are_sorted_by_version() {
    let names = defined_migration_names();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.iter().all(|n| n.starts_with('m')));
}
