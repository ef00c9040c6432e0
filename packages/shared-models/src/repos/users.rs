//! User repository functions (generic over ConnectionTrait).
//!
//! These only wrap the ORM: insert, lookup, update and delete go straight
//! through SeaORM, with input checked against the column bounds first.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::users::{self, EMAIL_MAX_LEN, NAME_MAX_LEN};
use crate::error::{ModelError, NotFoundKind};

/// Fields to change on an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    /// `Some(None)` clears the name.
    pub name: Option<Option<String>>,
    pub email: Option<String>,
}

fn validate_name(name: Option<&str>) -> Result<(), ModelError> {
    match name {
        Some(n) if n.chars().count() > NAME_MAX_LEN => Err(ModelError::validation(format!(
            "name exceeds {NAME_MAX_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

fn validate_email(email: &str) -> Result<(), ModelError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ModelError::validation("email must not be empty"));
    }
    if trimmed.chars().count() > EMAIL_MAX_LEN {
        return Err(ModelError::validation(format!(
            "email exceeds {EMAIL_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn create_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    name: Option<&str>,
    email: &str,
) -> Result<users::Model, ModelError> {
    validate_name(name)?;
    validate_email(email)?;

    let user = users::ActiveModel {
        name: Set(name.map(str::to_string)),
        email: Set(email.trim().to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(user_id = user.id, "user created");
    Ok(user)
}

pub async fn find_user_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i32,
) -> Result<Option<users::Model>, ModelError> {
    Ok(users::Entity::find_by_id(user_id).one(conn).await?)
}

pub async fn find_user_by_email<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    email: &str,
) -> Result<Option<users::Model>, ModelError> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(email.trim()))
        .one(conn)
        .await?)
}

pub async fn list_users<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<users::Model>, ModelError> {
    Ok(users::Entity::find()
        .order_by_asc(users::Column::Id)
        .all(conn)
        .await?)
}

pub async fn update_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i32,
    changes: UserChanges,
) -> Result<users::Model, ModelError> {
    let existing = find_user_by_id(conn, user_id).await?.ok_or_else(|| {
        ModelError::not_found(NotFoundKind::User, format!("user {user_id} not found"))
    })?;

    let mut active: users::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        validate_name(name.as_deref())?;
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        validate_email(&email)?;
        active.email = Set(email.trim().to_string());
    }

    let updated = active.update(conn).await?;
    debug!(user_id = updated.id, "user updated");
    Ok(updated)
}

/// Delete a user. Returns `false` when no row matched.
pub async fn delete_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i32,
) -> Result<bool, ModelError> {
    let result = users::Entity::delete_by_id(user_id).exec(conn).await?;
    debug!(user_id, rows_affected = result.rows_affected, "user delete");
    Ok(result.rows_affected > 0)
}
