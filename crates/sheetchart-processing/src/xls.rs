//! Legacy binary (`.xls`, BIFF8 in an OLE compound file) workbook reader.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls};
use chrono::NaiveDateTime;

use crate::error::{SpreadsheetError, SpreadsheetResult};
use crate::worksheet::{CellValue, DocumentProperties, Workbook, Worksheet};

fn open(bytes: &[u8]) -> SpreadsheetResult<Xls<Cursor<&[u8]>>> {
    let workbook: Xls<_> = Xls::new(Cursor::new(bytes))?;
    Ok(workbook)
}

/// Parse the first worksheet of an `.xls` workbook.
pub fn read_xls_first_worksheet(bytes: &[u8]) -> SpreadsheetResult<Worksheet> {
    let mut workbook = open(bytes)?;
    let name = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or(SpreadsheetError::NoWorksheets)?;
    let range = workbook.worksheet_range(&name)?;
    Ok(to_worksheet(name, &range))
}

/// Parse every worksheet of an `.xls` workbook. The binary format keeps its
/// document properties in a separate stream that is not read.
pub fn read_xls_workbook(bytes: &[u8]) -> SpreadsheetResult<Workbook> {
    let mut workbook = open(bytes)?;
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        sheets.push(to_worksheet(name, &range));
    }
    tracing::debug!(sheets = sheets.len(), "Legacy workbook opened");
    Ok(Workbook {
        sheets,
        properties: DocumentProperties::default(),
    })
}

/// The range is already anchored at its first used cell; trailing blanks are
/// trimmed so rows match the `.xlsx` reader's shape.
fn to_worksheet(name: String, range: &Range<Data>) -> Worksheet {
    let rows = range
        .rows()
        .map(|row| {
            let mut cells: Vec<CellValue> = row.iter().map(cell_value).collect();
            while cells.last().is_some_and(CellValue::is_blank) {
                cells.pop();
            }
            cells
        })
        .collect();
    Worksheet::new(name, rows)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => CellValue::Date(d),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Blank,
    }
}
