//! Spreadsheet processing for SheetChart.
//!
//! Reads `.xlsx` and legacy `.xls` workbooks into typed cell grids,
//! summarizes them into `processedData`, derives default charts and validates
//! uploads.

pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;
pub mod inference;
pub mod reader;
pub mod summary;
pub mod validator;
pub mod worksheet;
pub mod xls;
pub mod xlsx;

pub use error::{SpreadsheetError, SpreadsheetResult};
pub use inference::{infer_chart, select_axes, AxisSelection};
pub use summary::summarize;
pub use validator::{file_extension, UploadValidationError, UploadValidator};
pub use worksheet::{CellValue, DocumentProperties, Workbook, Worksheet};
pub use reader::{read_first_worksheet, read_workbook, WorkbookFormat};
pub use xlsx::XlsxReader;
