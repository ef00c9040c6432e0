//! Repository behaviour on PostgreSQL. Skipped unless `DATABASE_URL` points at
//! a Postgres server; rows created here are deleted before returning.

use serial_test::serial;
use shared_models::repos::users::{self, UserChanges};
use shared_models::ConflictKind;
use test_support::postgres::migrated_postgres_db;
use test_support::unique_email;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
#[serial]
async fn duplicate_email_maps_the_named_constraint() -> TestResult {
    let Some(db) = migrated_postgres_db().await? else {
        return Ok(());
    };
    let email = unique_email("pg-dup");

    let first = users::create_user(&db, Some("First"), &email).await?;
    let err = users::create_user(&db, Some("Second"), &email)
        .await
        .expect_err("second insert with the same email must fail");

    users::delete_user(&db, first.id).await?;
    assert_eq!(err.conflict_kind(), Some(&ConflictKind::UniqueEmail), "{err}");
    Ok(())
}

#[tokio::test]
#[serial]
async fn update_to_a_taken_email_conflicts() -> TestResult {
    let Some(db) = migrated_postgres_db().await? else {
        return Ok(());
    };
    let taken = users::create_user(&db, None, &unique_email("pg-taken")).await?;
    let other = users::create_user(&db, None, &unique_email("pg-other")).await?;

    let result = users::update_user(
        &db,
        other.id,
        UserChanges {
            email: Some(taken.email.clone()),
            ..Default::default()
        },
    )
    .await;

    users::delete_user(&db, taken.id).await?;
    users::delete_user(&db, other.id).await?;
    let err = result.expect_err("email is already used");
    assert_eq!(err.conflict_kind(), Some(&ConflictKind::UniqueEmail), "{err}");
    Ok(())
}
