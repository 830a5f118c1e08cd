//! Shared constants for uploads and chart generation.

/// Default upload limit in bytes (10 MiB), overridable via `MAX_FILE_SIZE`.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default directory for uploaded spreadsheets, overridable via `UPLOAD_DIR`.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Multipart field carrying the uploaded spreadsheet.
pub const UPLOAD_FIELD_NAME: &str = "excel";

/// Prefix of generated storage filenames.
pub const STORED_FILENAME_PREFIX: &str = "excel";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";

pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls"];
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[XLSX_CONTENT_TYPE, XLS_CONTENT_TYPE];

/// Fill color of auto-generated bar series.
pub const CHART_BACKGROUND_COLOR: &str = "rgba(53, 162, 235, 0.5)";
/// Border color of auto-generated bar series.
pub const CHART_BORDER_COLOR: &str = "rgba(53, 162, 235, 1)";
pub const CHART_BORDER_WIDTH: u32 = 1;

/// Point limit recorded on auto-generated charts.
pub const DEFAULT_CHART_LIMIT: u32 = 1000;

/// Rows kept in `processedData.dataPreview`.
pub const DATA_PREVIEW_ROWS: usize = 10;

/// Returns true when a declared MIME type names a spreadsheet format we accept.
pub fn is_spreadsheet_content_type(content_type: &str) -> bool {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&normalized.as_str())
}
