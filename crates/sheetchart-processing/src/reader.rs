//! Format sniffing in front of the `.xlsx` and `.xls` readers.

use crate::error::{SpreadsheetError, SpreadsheetResult};
use crate::worksheet::{Workbook, Worksheet};
use crate::xls::{read_xls_first_worksheet, read_xls_workbook};
use crate::xlsx::{read_xlsx_first_worksheet, read_xlsx_workbook};

const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_SIGNATURE: [u8; 2] = [b'P', b'K'];

/// Container format of a workbook, decided from its leading bytes rather than
/// the declared name or MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Office Open XML zip package.
    Xlsx,
    /// BIFF8 inside an OLE compound file.
    Xls,
}

impl WorkbookFormat {
    pub fn detect(bytes: &[u8]) -> SpreadsheetResult<Self> {
        if bytes.starts_with(&OLE_SIGNATURE) {
            Ok(WorkbookFormat::Xls)
        } else if bytes.starts_with(&ZIP_SIGNATURE) {
            Ok(WorkbookFormat::Xlsx)
        } else {
            Err(SpreadsheetError::Unsupported(
                "file is neither an .xlsx nor an .xls workbook".to_string(),
            ))
        }
    }
}

/// Parse the first worksheet of a workbook in either format.
pub fn read_first_worksheet(bytes: &[u8]) -> SpreadsheetResult<Worksheet> {
    match WorkbookFormat::detect(bytes)? {
        WorkbookFormat::Xlsx => read_xlsx_first_worksheet(bytes),
        WorkbookFormat::Xls => read_xls_first_worksheet(bytes),
    }
}

/// Parse every worksheet of a workbook in either format.
pub fn read_workbook(bytes: &[u8]) -> SpreadsheetResult<Workbook> {
    match WorkbookFormat::detect(bytes)? {
        WorkbookFormat::Xlsx => read_xlsx_workbook(bytes),
        WorkbookFormat::Xls => read_xls_workbook(bytes),
    }
}
