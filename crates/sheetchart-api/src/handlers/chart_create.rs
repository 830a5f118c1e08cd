use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sheetchart_core::models::{ChartResponse, CreateChartRequest, FileResponse};
use sheetchart_core::AppError;
use std::sync::Arc;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/charts",
    tag = "charts",
    request_body = CreateChartRequest,
    responses(
        (status = 201, description = "Chart created", body = ChartResponse),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 404, description = "Source file not found or not owned", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(user_id = %owner.user_id))]
pub async fn create_chart(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    ValidatedJson(request): ValidatedJson<CreateChartRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be blank".to_string()).into());
    }

    let source = state
        .files
        .get_file(owner.user_id, request.source_file)
        .await?
        .ok_or_else(|| AppError::NotFound("Source file not found or access denied".to_string()))?;

    let chart = state
        .charts
        .create_chart(request.into_new_chart(owner.user_id))
        .await?;

    tracing::info!(chart_id = %chart.id, source_file = %source.id, "Chart created");

    let body = ChartResponse::from(chart).with_source(Some(FileResponse::from(source)));
    Ok((StatusCode::CREATED, Json(body)))
}
