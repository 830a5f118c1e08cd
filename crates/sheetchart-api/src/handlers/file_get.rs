use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{parse_id, FILE_NOT_FOUND};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sheetchart_core::models::FileResponse;
use sheetchart_core::AppError;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/files/list",
    tag = "files",
    responses(
        (status = 200, description = "Caller's files, newest first", body = Vec<FileResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %owner.user_id))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.files.list_files(owner.user_id).await?;
    let body: Vec<FileResponse> = files.into_iter().map(FileResponse::from).collect();
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = uuid::Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File record", body = FileResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "File not found or not owned", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %owner.user_id, file_id = %id))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_id(&id)?;
    let file = state
        .files
        .get_file(owner.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(FILE_NOT_FOUND.to_string()))?;

    Ok(Json(FileResponse::from(file)))
}
