use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::auth::password;
use crate::auth::ActiveUser;
use crate::db;
use crate::error::AppError;
use crate::models::user::normalize_groups;
use crate::models::User;
use crate::state::SharedState;

const DUPLICATE_EMAIL: &str = "User with this email already exists";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// OAuth2 password-flow form: the email travels as `username`.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(req) = payload?;
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    if db::users::find_by_email(&state.pool, &req.email).await?.is_some() {
        return Err(AppError::BadRequest(DUPLICATE_EMAIL.to_string()));
    }

    let pw_hash = password::hash(&req.password)?;
    let groups = normalize_groups(&req.groups);

    // The unique index still decides when two registrations race.
    let user = db::users::create(
        &state.pool,
        &db::users::NewUser {
            email: &req.email,
            full_name: req.full_name.as_deref(),
            password_hash: &pw_hash,
            is_active: req.is_active,
            is_admin: false,
            groups: &groups,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::BadRequest(DUPLICATE_EMAIL.to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(Json(user))
}

pub async fn login(
    State(state): State<SharedState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Form(form) = form?;
    let rejected = || AppError::Unauthorized("Incorrect email or password".to_string());

    let Some(user) = db::users::find_by_email(&state.pool, &form.username).await? else {
        tracing::info!("Login failed: unknown email");
        return Err(rejected());
    };

    if !password::verify(&form.password, &user.password_hash) {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(rejected());
    }

    let ttl = state.config.jwt.access_token_ttl;
    let access_token = jwt::issue_token(&state.config.jwt, &user.email, ttl)?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn me(ActiveUser(user): ActiveUser) -> Json<User> {
    Json(user)
}
