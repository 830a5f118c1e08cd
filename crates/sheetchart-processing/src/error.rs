use thiserror::Error;

/// Errors raised while reading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Workbook archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Workbook XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Workbook text encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("Workbook XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Legacy workbook error: {0}")]
    Xls(#[from] calamine::XlsError),

    #[error("Workbook read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook part missing: {0}")]
    MissingPart(String),

    #[error("Invalid workbook content: {0}")]
    Invalid(String),

    #[error("Workbook contains no worksheets")]
    NoWorksheets,

    #[error("Unsupported spreadsheet format: {0}")]
    Unsupported(String),
}

pub type SpreadsheetResult<T> = Result<T, SpreadsheetError>;
