use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_id;
use crate::services::process_file;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sheetchart_core::models::FileResponse;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/files/{id}/process",
    tag = "files",
    params(
        ("id" = uuid::Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File after processing; status is completed or error", body = FileResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "File not found or not owned", body = ErrorResponse),
        (status = 409, description = "File is not in the uploading state", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = %owner.user_id, file_id = %id, operation = "process_file")
)]
pub async fn process(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_id(&id)?;
    let file = process_file(&state, owner.user_id, id).await?;
    Ok(Json(FileResponse::from(file)))
}
