//! User administration used by the `manage-users` binary.

use std::io;

use sqlx::PgPool;
use subtle::ConstantTimeEq;

use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::user::normalize_groups;
use crate::models::User;

/// Split a comma-separated `--groups` value into canonical tags.
pub fn parse_groups(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| normalize_groups(raw.split(',')))
        .unwrap_or_default()
}

/// Compare the typed admin-creation secret against the configured one.
pub fn admin_secret_matches(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

#[derive(Debug, PartialEq, Eq)]
pub enum AdminGate {
    NotConfigured,
    Rejected,
    Allowed,
}

/// Decide whether an admin may be created. `read_secret` is only asked for
/// the secret once one is configured.
pub fn authorize_admin_creation<F>(expected: &str, read_secret: F) -> io::Result<AdminGate>
where
    F: FnOnce() -> io::Result<String>,
{
    if expected.is_empty() {
        return Ok(AdminGate::NotConfigured);
    }
    let provided = read_secret()?;
    if admin_secret_matches(expected, &provided) {
        Ok(AdminGate::Allowed)
    } else {
        Ok(AdminGate::Rejected)
    }
}

pub struct CreateUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub is_admin: bool,
    pub groups: Vec<String>,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    AlreadyExists(User),
}

pub async fn create_user(pool: &PgPool, req: CreateUser<'_>) -> Result<CreateOutcome, AppError> {
    if let Some(existing) = db::users::find_by_email(pool, req.email).await? {
        return Ok(CreateOutcome::AlreadyExists(existing));
    }

    let pw_hash = password::hash(req.password)?;
    let user = db::users::create(
        pool,
        &db::users::NewUser {
            email: req.email,
            full_name: req.full_name,
            password_hash: &pw_hash,
            is_active: true,
            is_admin: req.is_admin,
            groups: &req.groups,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, is_admin = user.is_admin, "User created from CLI");
    Ok(CreateOutcome::Created(user))
}

pub async fn delete_user(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let deleted = db::users::delete_by_email(pool, email).await?;
    if deleted {
        tracing::info!("User deleted from CLI");
    }
    Ok(deleted)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AppError> {
    Ok(db::users::list_all(pool).await?)
}

pub async fn wipe_users(pool: &PgPool) -> Result<u64, AppError> {
    let deleted = db::users::delete_all(pool).await?;
    tracing::warn!(deleted, "Users table wiped from CLI");
    Ok(deleted)
}

pub fn describe(user: &User) -> String {
    format!(
        "- id={}, email={}, active={}, is_admin={}, groups=[{}]",
        user.id,
        user.email,
        user.is_active,
        user.is_admin,
        user.groups.join(", ")
    )
}
