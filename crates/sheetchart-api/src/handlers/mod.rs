pub mod chart_autogen;
pub mod chart_create;
pub mod chart_get;
pub mod file_download;
pub mod file_get;
pub mod file_process;
pub mod file_upload;
pub mod health;

use crate::error::HttpAppError;
use sheetchart_core::AppError;
use uuid::Uuid;

/// Parse a path id, answering malformed values with a 400 in the usual error shape.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, HttpAppError> {
    Uuid::parse_str(raw)
        .map_err(|_| HttpAppError(AppError::InvalidInput(format!("Invalid id: {}", raw))))
}

pub(crate) const FILE_NOT_FOUND: &str = "File not found or access denied";
pub(crate) const CHART_NOT_FOUND: &str = "Chart not found or access denied";
