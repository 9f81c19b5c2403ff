use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header the auth gateway uses to pass the authenticated user downstream
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, taken from the gateway's identity header
///
/// Sessions, passwords and token validation all live in the gateway; by the
/// time a request reaches this service the caller is already authenticated
/// and identified by this header. Handlers that need an identity extract
/// this and pass `user_id` down into the services explicitly.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or_else(|| AppError::Unauthorized("Missing or invalid user header".to_string()))?;

        Ok(CurrentUser { user_id })
    }
}
