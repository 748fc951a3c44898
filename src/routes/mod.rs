pub mod auth;
pub mod stats;
pub mod users;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Admin
        .route("/users", get(users::list))
        .route("/pinterest-stats", get(stats::list))
        .route("/pinterest-stats/monthly", get(stats::monthly))
        .route("/pinterest-stats/upload-csv", post(stats::upload_csv))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
