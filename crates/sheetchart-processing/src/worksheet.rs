//! Worksheet grid model: a header row followed by data rows of typed cells.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

/// Largest integer an f64 (and a JSON consumer) can represent exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDateTime),
    Blank,
}

impl CellValue {
    /// Numeric cells drive axis selection. Dates count: workbooks store them
    /// as serial numbers and only the style marks them as dates.
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Number(_) | CellValue::Date(_))
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Plain text rendering, used for headers and titles.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => format_date(d),
            CellValue::Blank => String::new(),
        }
    }

    /// JSON rendering used for chart labels, series data and previews.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Number(n) => number_to_json(*n),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Date(d) => Value::String(format_date(d)),
            CellValue::Blank => Value::Null,
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

fn format_date(d: &NaiveDateTime) -> String {
    if d.time().num_seconds_from_midnight() == 0 && d.time().nanosecond() == 0 {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// The used range of one sheet, top-left aligned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Worksheet {
            name: name.into(),
            rows,
        }
    }

    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn header_texts(&self) -> Vec<String> {
        self.header().iter().map(CellValue::display_text).collect()
    }

    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        if self.rows.len() > 1 {
            &self.rows[1..]
        } else {
            &[]
        }
    }

    /// Cell at (row, column) of the grid; missing cells read as blank.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&CellValue::Blank)
    }
}

/// Core document properties (`docProps/core.xml`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentProperties {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
    pub properties: DocumentProperties,
}

impl Workbook {
    pub fn first_sheet(&self) -> Option<&Worksheet> {
        self.sheets.first()
    }
}
