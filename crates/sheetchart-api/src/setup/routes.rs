//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sheetchart_core::AppConfig;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the full application router.
pub fn setup_routes(config: &AppConfig, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(config.jwt_secret()));

    let protected = protected_routes()
        .layer(axum::middleware::from_fn_with_state(auth_state, auth_middleware));
    let routes = public_routes().merge(protected);

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = routes
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(
            config.max_file_size_bytes() + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/openapi.json", get(openapi_json))
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files/list", get(handlers::file_get::list_files))
        .route("/files/upload", post(handlers::file_upload::upload_file))
        .route("/files/{id}", get(handlers::file_get::get_file))
        .route(
            "/files/{id}/download",
            get(handlers::file_download::download_file),
        )
        .route(
            "/files/{id}/process",
            post(handlers::file_process::process),
        )
        .route(
            "/charts",
            get(handlers::chart_get::list_charts).post(handlers::chart_create::create_chart),
        )
        .route("/charts/", get(handlers::chart_get::list_charts))
        .route(
            "/charts/autogen",
            post(handlers::chart_autogen::autogen_charts),
        )
        .route("/charts/{id}", get(handlers::chart_get::get_chart))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &AppConfig) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
