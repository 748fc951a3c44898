use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::auth::jwt;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

/// Pull the credentials out of `Authorization: Bearer <token>`.
///
/// `None` means no usable bearer header at all: missing, not ASCII, or a
/// different scheme. The scheme match is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

pub fn require_active(user: User) -> Result<User, AppError> {
    if user.is_active {
        Ok(user)
    } else {
        Err(AppError::BadRequest("Inactive user".to_string()))
    }
}

pub fn require_admin(user: User) -> Result<User, AppError> {
    if user.is_admin {
        Ok(user)
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// Any holder of a valid token whose subject still exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] whose account is active.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

/// An active [`CurrentUser`] with the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(AppError::not_authenticated)?;

        let email = jwt::validate_token(&state.config.jwt, token).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::from(e)
        })?;

        // A token can outlive its account
        let user = db::users::find_by_email(&state.pool, &email)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Token subject {email} no longer exists");
                AppError::invalid_credentials()
            })?;

        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<SharedState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_active(user).map(ActiveUser)
    }
}

impl FromRequestParts<SharedState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_active(user).and_then(require_admin).map(AdminUser)
    }
}
