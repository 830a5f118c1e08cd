use serde_json::Value;
use sheetchart_core::constants::DATA_PREVIEW_ROWS;
use sheetchart_core::models::{ProcessedData, ProcessedMetadata, SheetSummary};

use crate::worksheet::{CellValue, Workbook, Worksheet};

const TEXT_ENCODING: &str = "UTF-8";

/// Summarize a parsed workbook into the `processedData` stored on a file.
///
/// Headers, row count and preview describe the first sheet; every sheet gets
/// its own entry in `sheets`.
pub fn summarize(workbook: &Workbook) -> ProcessedData {
    let first = workbook.first_sheet();

    let headers = first.map(Worksheet::header_texts).unwrap_or_default();
    let row_count = first.map(data_row_count).unwrap_or(0);
    let data_preview = first
        .map(|sheet| {
            sheet
                .data_rows()
                .iter()
                .take(DATA_PREVIEW_ROWS)
                .map(|row| Value::Array(row.iter().map(CellValue::to_json).collect()))
                .collect()
        })
        .unwrap_or_default();

    let sheets = workbook
        .sheets
        .iter()
        .map(|sheet| SheetSummary {
            name: sheet.name.clone(),
            headers: sheet.header_texts(),
            row_count: data_row_count(sheet),
        })
        .collect();

    ProcessedData {
        headers,
        row_count,
        sheets,
        data_preview,
        metadata: ProcessedMetadata {
            has_headers: first.map(has_text_header).unwrap_or(false),
            encoding: Some(TEXT_ENCODING.to_string()),
            created_date: workbook.properties.created,
            modified_date: workbook.properties.modified,
        },
    }
}

fn data_row_count(sheet: &Worksheet) -> u64 {
    sheet.data_rows().len() as u64
}

/// A header row is present when the first row is entirely non-empty text.
fn has_text_header(sheet: &Worksheet) -> bool {
    let header = sheet.header();
    !header.is_empty()
        && header
            .iter()
            .all(|cell| matches!(cell, CellValue::Text(s) if !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::DocumentProperties;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn summarizes_first_sheet_and_lists_all() {
        let mut rows = vec![vec![text("Month"), text("Revenue")]];
        for i in 0..15 {
            rows.push(vec![CellValue::Number(i as f64), CellValue::Number(i as f64 * 10.0)]);
        }
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let workbook = Workbook {
            sheets: vec![
                Worksheet::new("Data", rows),
                Worksheet::new("Empty", vec![]),
            ],
            properties: DocumentProperties {
                created: Some(created),
                modified: None,
            },
        };

        let data = summarize(&workbook);
        assert_eq!(data.headers, vec!["Month", "Revenue"]);
        assert_eq!(data.row_count, 15);
        assert_eq!(data.data_preview.len(), DATA_PREVIEW_ROWS);
        assert_eq!(data.data_preview[2], json!([2, 20]));
        assert_eq!(data.sheets.len(), 2);
        assert_eq!(data.sheets[1].name, "Empty");
        assert_eq!(data.sheets[1].row_count, 0);
        assert!(data.metadata.has_headers);
        assert_eq!(data.metadata.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(data.metadata.created_date, Some(created));
    }

    #[test]
    fn numeric_first_row_is_not_a_header() {
        let workbook = Workbook {
            sheets: vec![Worksheet::new(
                "Sheet1",
                vec![
                    vec![CellValue::Number(1.0), text("x")],
                    vec![CellValue::Number(2.0), text("y")],
                ],
            )],
            properties: DocumentProperties::default(),
        };
        let data = summarize(&workbook);
        assert!(!data.metadata.has_headers);
        assert_eq!(data.headers, vec!["1", "x"]);
        assert_eq!(data.data_preview, vec![json!([2, "y"])]);
    }

    #[test]
    fn empty_workbook_summary() {
        let data = summarize(&Workbook::default());
        assert!(data.headers.is_empty());
        assert_eq!(data.row_count, 0);
        assert!(data.sheets.is_empty());
        assert!(!data.metadata.has_headers);
    }
}
