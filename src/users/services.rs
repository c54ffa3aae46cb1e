use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::users::dto::{UserPublic, UserUpdateRequest};
use crate::users::repo;

/// Create a new user: duplicate checks, then hash, then insert.
///
/// The service-level checks give field-specific errors; the storage unique
/// constraints remain the authoritative guard (violations classify back to
/// the same duplicate errors in `ApiError::from`).
pub async fn register(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> ApiResult<UserPublic> {
    if repo::get_by_username(db, username).await?.is_some() {
        warn!(%username, "registration rejected: username taken");
        return Err(ApiError::DuplicateUsername(username.to_string()));
    }
    if repo::get_by_email(db, email).await?.is_some() {
        warn!(%email, "registration rejected: email taken");
        return Err(ApiError::DuplicateEmail(email.to_string()));
    }

    let hash = hash_password(password)?;
    let user = repo::insert(db, username, email, &hash).await?;
    info!(user_id = %user.id, %username, "user registered");
    Ok(user.into())
}

/// Verify credentials. Unknown username and wrong password fail identically
/// so the endpoint cannot be used for username enumeration.
pub async fn authenticate(db: &PgPool, username: &str, password: &str) -> ApiResult<UserPublic> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());

    let user = repo::get_by_username(db, username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, %username, "user logged in");
    Ok(user.into())
}

pub async fn list(db: &PgPool, skip: i64, limit: i64) -> ApiResult<Vec<UserPublic>> {
    let users = repo::list(db, skip, limit).await?;
    Ok(users.into_iter().map(UserPublic::from).collect())
}

pub async fn get(db: &PgPool, user_id: i64) -> ApiResult<UserPublic> {
    let user = repo::get_by_id(db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    Ok(user.into())
}

/// Partial profile update. Uniqueness is re-checked only when the new value
/// differs from the current one; a present password is hashed before it is
/// persisted.
pub async fn update(db: &PgPool, user_id: i64, patch: &UserUpdateRequest) -> ApiResult<UserPublic> {
    let existing = repo::get_by_id(db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if let Some(username) = &patch.username {
        if *username != existing.username
            && repo::get_by_username(db, username).await?.is_some()
        {
            return Err(ApiError::DuplicateUsername(username.clone()));
        }
    }
    if let Some(email) = &patch.email {
        if *email != existing.email && repo::get_by_email(db, email).await?.is_some() {
            return Err(ApiError::DuplicateEmail(email.clone()));
        }
    }

    let password_hash = match &patch.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let updated = repo::update_partial(
        db,
        user_id,
        patch.username.as_deref(),
        patch.email.as_deref(),
        password_hash.as_deref(),
    )
    .await?
    .ok_or(ApiError::UserNotFound)?;

    info!(user_id = %user_id, "user updated");
    Ok(updated.into())
}

/// Delete the user; the storage cascade removes owned agents.
pub async fn delete(db: &PgPool, user_id: i64) -> ApiResult<()> {
    if !repo::delete(db, user_id).await? {
        return Err(ApiError::UserNotFound);
    }
    info!(user_id = %user_id, "user deleted");
    Ok(())
}
