use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::db;
use crate::error::AppError;
use crate::ingest::{pipeline, upload, DateMode, IngestError};
use crate::models::MonthlyStat;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub convert_calendar_range: bool,
    pub default_calendar_year: Option<i32>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub inserted_rows: u64,
}

pub async fn list(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<MonthlyStat>>, AppError> {
    let stats = db::monthly_stats::list_all(&state.pool).await?;
    Ok(Json(stats))
}

pub async fn monthly(
    _admin: AdminUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<MonthlyStat>>, AppError> {
    let stats = db::monthly_stats::list_by_month(&state.pool).await?;
    Ok(Json(stats))
}

pub async fn upload_csv(
    AdminUser(admin): AdminUser,
    State(state): State<SharedState>,
    params: Result<Query<UploadParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let Query(params) = params?;
    let file = upload::read_file_part(&headers, body).await?;
    upload::ensure_csv_content_type(file.content_type.as_deref())?;
    let text = upload::decode_text(&file.data)?;

    let mode = DateMode::new(params.convert_calendar_range, params.default_calendar_year);
    let inserted_rows = pipeline::run(&state.pool, text, mode).await.inspect_err(|e| {
        if let IngestError::Row { line, message } = e {
            tracing::info!(user_id = admin.id, line, "CSV import rolled back: {message}");
        }
    })?;

    tracing::info!(
        user_id = admin.id,
        inserted_rows,
        file_name = file.file_name.as_deref().unwrap_or("-"),
        "CSV import committed"
    );
    Ok(Json(UploadResponse { inserted_rows }))
}
