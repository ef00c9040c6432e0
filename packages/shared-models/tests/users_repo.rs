use shared_models::error::ModelError;
use shared_models::repos::users::{self, UserChanges};
use shared_models::ConflictKind;
use test_support::sqlite::migrated_memory_db;
use test_support::unique_email;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn create_and_find_roundtrip() -> TestResult {
    test_support::logging::init();
    let db = migrated_memory_db().await?;
    let email = unique_email("create");

    let created = users::create_user(&db, Some("Ada"), &email).await?;
    assert!(created.id > 0);
    assert_eq!(created.name.as_deref(), Some("Ada"));
    assert_eq!(created.email, email);

    let by_id = users::find_user_by_id(&db, created.id).await?;
    assert_eq!(by_id, Some(created.clone()));

    let by_email = users::find_user_by_email(&db, &email).await?;
    assert_eq!(by_email, Some(created));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_unique_email_conflict() -> TestResult {
    let db = migrated_memory_db().await?;
    let email = unique_email("dup");

    users::create_user(&db, Some("First"), &email).await?;
    let err = users::create_user(&db, Some("Second"), &email)
        .await
        .expect_err("second insert with the same email must fail");

    assert_eq!(err.conflict_kind(), Some(&ConflictKind::UniqueEmail), "{err}");
    assert_eq!(users::list_users(&db).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn name_is_optional() -> TestResult {
    let db = migrated_memory_db().await?;

    let created = users::create_user(&db, None, &unique_email("anon")).await?;
    assert_eq!(created.name, None);
    Ok(())
}

#[tokio::test]
async fn update_changes_only_requested_fields() -> TestResult {
    let db = migrated_memory_db().await?;
    let email = unique_email("update");
    let created = users::create_user(&db, Some("Before"), &email).await?;

    let renamed = users::update_user(
        &db,
        created.id,
        UserChanges {
            name: Some(Some("After".to_string())),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(renamed.name.as_deref(), Some("After"));
    assert_eq!(renamed.email, email);

    let cleared = users::update_user(
        &db,
        created.id,
        UserChanges {
            name: Some(None),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(cleared.name, None);
    Ok(())
}

#[tokio::test]
async fn update_to_taken_email_conflicts() -> TestResult {
    let db = migrated_memory_db().await?;
    let taken = unique_email("taken");
    users::create_user(&db, None, &taken).await?;
    let other = users::create_user(&db, None, &unique_email("other")).await?;

    let err = users::update_user(
        &db,
        other.id,
        UserChanges {
            email: Some(taken),
            ..Default::default()
        },
    )
    .await
    .expect_err("email is already taken");

    assert_eq!(err.conflict_kind(), Some(&ConflictKind::UniqueEmail));
    Ok(())
}

#[tokio::test]
async fn update_missing_user_is_not_found() -> TestResult {
    let db = migrated_memory_db().await?;

    let err = users::update_user(&db, 4242, UserChanges::default())
        .await
        .expect_err("no such user");
    assert!(matches!(err, ModelError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_row() -> TestResult {
    let db = migrated_memory_db().await?;
    let created = users::create_user(&db, None, &unique_email("delete")).await?;

    assert!(users::delete_user(&db, created.id).await?);
    assert!(!users::delete_user(&db, created.id).await?);
    assert_eq!(users::find_user_by_id(&db, created.id).await?, None);
    Ok(())
}

#[tokio::test]
async fn oversized_name_is_rejected_before_insert() -> TestResult {
    let db = migrated_memory_db().await?;
    let long_name = "n".repeat(shared_models::entities::users::NAME_MAX_LEN + 1);

    let err = users::create_user(&db, Some(&long_name), &unique_email("long"))
        .await
        .expect_err("name too long");
    assert!(matches!(err, ModelError::Validation(_)));
    assert!(users::list_users(&db).await?.is_empty());
    Ok(())
}
