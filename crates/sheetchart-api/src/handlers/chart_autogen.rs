use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::ChartAutogenService;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sheetchart_core::models::AutogenResponse;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/charts/autogen",
    tag = "charts",
    responses(
        (status = 201, description = "Number of charts generated", body = AutogenResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Files could not be listed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %owner.user_id, operation = "autogen_charts"))]
pub async fn autogen_charts(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = ChartAutogenService::new(&state).run(owner.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AutogenResponse {
            message: "Auto-generated charts".to_string(),
            created: outcome.created,
        }),
    ))
}
