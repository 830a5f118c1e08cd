use sheetchart_core::constants::{XLSX_CONTENT_TYPE, XLS_CONTENT_TYPE};
use sheetchart_processing::fixtures::{single_sheet_xls, single_sheet_xlsx};
use sheetchart_processing::CellValue;

pub const XLSX: &str = XLSX_CONTENT_TYPE;
pub const XLS: &str = XLS_CONTENT_TYPE;

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

/// Month / Revenue / Region with two data rows.
pub fn sales_workbook() -> Vec<u8> {
    single_sheet_xlsx(vec![
        vec![text("Month"), text("Revenue"), text("Region")],
        vec![CellValue::Number(1.0), CellValue::Number(100.0), text("X")],
        vec![CellValue::Number(2.0), CellValue::Number(150.0), text("Y")],
    ])
}

/// The sales rows as a legacy `.xls` workbook.
pub fn sales_workbook_xls() -> Vec<u8> {
    single_sheet_xls(vec![
        vec![text("Month"), text("Revenue"), text("Region")],
        vec![CellValue::Number(1.0), CellValue::Number(100.0), text("X")],
        vec![CellValue::Number(2.0), CellValue::Number(150.0), text("Y")],
    ])
}

/// Compound file signature followed by nothing usable.
pub fn corrupt_xls() -> Vec<u8> {
    vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]
}

/// Header row only.
pub fn header_only_workbook() -> Vec<u8> {
    single_sheet_xlsx(vec![vec![text("Name"), text("Score")]])
}

/// Bytes that start like a zip but are not a workbook.
pub fn corrupt_workbook() -> Vec<u8> {
    b"PK\x03\x04 definitely not a workbook".to_vec()
}
