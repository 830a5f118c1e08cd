use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{parse_id, CHART_NOT_FOUND};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sheetchart_core::models::{ChartResponse, FileResponse};
use sheetchart_core::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/charts",
    tag = "charts",
    responses(
        (status = 200, description = "Caller's charts, newest first, with source files embedded", body = Vec<ChartResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %owner.user_id))]
pub async fn list_charts(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let charts = state.charts.list_charts(owner.user_id).await?;

    let source_ids: Vec<Uuid> = charts
        .iter()
        .map(|c| c.source_file)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let sources: HashMap<Uuid, FileResponse> = state
        .files
        .get_files_by_ids(owner.user_id, &source_ids)
        .await?
        .into_iter()
        .map(|f| (f.id, FileResponse::from(f)))
        .collect();

    let body: Vec<ChartResponse> = charts
        .into_iter()
        .map(|chart| {
            let source = sources.get(&chart.source_file).cloned();
            ChartResponse::from(chart).with_source(source)
        })
        .collect();

    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/charts/{id}",
    tag = "charts",
    params(
        ("id" = uuid::Uuid, Path, description = "Chart ID")
    ),
    responses(
        (status = 200, description = "Chart with its source file; the view counter is incremented", body = ChartResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Chart not found or not owned", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %owner.user_id, chart_id = %id))]
pub async fn get_chart(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_id(&id)?;
    let chart = state
        .charts
        .record_view(owner.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(CHART_NOT_FOUND.to_string()))?;

    let source = state
        .files
        .get_file(owner.user_id, chart.source_file)
        .await?
        .map(FileResponse::from);

    Ok(Json(ChartResponse::from(chart).with_source(source)))
}
