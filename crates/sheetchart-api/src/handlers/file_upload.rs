use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadService;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sheetchart_core::models::FileResponse;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "files",
    request_body(content = inline(Object), description = "Workbook in the `excel` field", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Spreadsheet stored", body = FileResponse),
        (status = 400, description = "No file, or disallowed extension or content type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 413, description = "File exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(user_id = %owner.user_id, operation = "upload_file")
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let file = UploadService::new(&state)
        .upload(owner.user_id, multipart)
        .await?;

    Ok((StatusCode::CREATED, Json(FileResponse::from(file))))
}
