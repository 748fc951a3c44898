use axum::extract::State;
use axum::Json;

use crate::auth::AdminUser;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;

pub async fn list(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = db::users::list_all(&state.pool).await?;
    Ok(Json(users))
}
