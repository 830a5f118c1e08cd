//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use sheetchart_core::models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "SheetChart API",
        version = "0.1.0",
        description = "Upload Excel workbooks, read their contents and build charts from them. Every route except /health requires an HS256 bearer token whose subject is the owner id."
    ),
    paths(
        handlers::health::health,
        // Files
        handlers::file_upload::upload_file,
        handlers::file_get::list_files,
        handlers::file_get::get_file,
        handlers::file_download::download_file,
        handlers::file_process::process,
        // Charts
        handlers::chart_get::list_charts,
        handlers::chart_get::get_chart,
        handlers::chart_create::create_chart,
        handlers::chart_autogen::autogen_charts,
    ),
    components(
        schemas(
            models::FileStatus,
            models::FileResponse,
            models::ProcessedData,
            models::SheetSummary,
            models::ProcessedMetadata,
            models::ChartType,
            models::ChartConfig,
            models::AxisConfig,
            models::AxisKind,
            models::SeriesConfig,
            models::FilterPredicate,
            models::FilterOperator,
            models::Aggregation,
            models::SortSpec,
            models::SortOrder,
            models::ChartData,
            models::Dataset,
            models::ChartResponse,
            models::SourceFileRef,
            models::CreateChartRequest,
            models::AutogenResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "files", description = "Spreadsheet upload, listing, download and processing"),
        (name = "charts", description = "Chart definitions and auto-generation")
    )
)]
pub struct ApiDoc;
