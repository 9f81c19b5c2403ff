use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::User,
    stores::postgres::UserRecord,
};

/// Registers a new member; username and email must both be unused
///
/// Credential handling lives in the auth layer in front of this service, so
/// registration here is identity only.
pub async fn create_user(pool: &PgPool, username: &str, email: &str) -> AppResult<User> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and email must not be empty".to_string(),
        ));
    }

    if find_by_username(pool, username).await?.is_some() {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let email_taken =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await?;
    if email_taken {
        return Err(AppError::Conflict(
            "Email is already registered".to_string(),
        ));
    }

    let user = User::new(username.to_string(), email.to_string());
    sqlx::query(
        "INSERT INTO users (id, username, email, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.created_at)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Public profile lookup by username
pub async fn profile(pool: &PgPool, username: &str) -> AppResult<User> {
    find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub(crate) async fn find_by_username(pool: &PgPool, username: &str) -> AppResult<Option<User>> {
    let record = sqlx::query_as::<_, UserRecord>(
        "SELECT id, username, email, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(|r| r.to_domain()))
}

/// Resolves an authenticated id to its user row
///
/// The id comes from the gateway's header, so a miss means the caller is
/// presenting an identity this service has never seen.
pub(crate) async fn require_user(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
    let record = sqlx::query_as::<_, UserRecord>(
        "SELECT id, username, email, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    record
        .map(|r| r.to_domain())
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))
}
