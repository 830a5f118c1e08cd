//! Office Open XML (`.xlsx`) workbook reader.
//!
//! Reads the parts needed to turn a workbook into typed cell grids: the sheet
//! list and its relationships, shared strings, cell styles (to tell dates from
//! plain numbers) and the core document properties.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{SpreadsheetError, SpreadsheetResult};
use crate::worksheet::{CellValue, DocumentProperties, Workbook, Worksheet};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Default upper bound for a single decompressed XML part.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;
/// Serial of 9999-12-31; larger values are not dates.
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    part: String,
}

/// An opened workbook. Sheets are parsed on demand.
pub struct XlsxReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    date_styles: Vec<bool>,
    date1904: bool,
    max_part_bytes: u64,
}

impl<'a> XlsxReader<'a> {
    pub fn open(bytes: &'a [u8]) -> SpreadsheetResult<Self> {
        Self::open_with_part_limit(bytes, MAX_PART_BYTES)
    }

    /// Open with a custom cap on the decompressed size of each XML part.
    pub fn open_with_part_limit(bytes: &'a [u8], max_part_bytes: u64) -> SpreadsheetResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let limit = max_part_bytes;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART, limit)?
            .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_PART.to_string()))?;
        let (declared, date1904) = parse_workbook(&workbook_xml)?;

        let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART, limit)?
            .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_RELS_PART.to_string()))?;
        let targets = parse_relationships(&rels_xml)?;

        let sheets = declared
            .into_iter()
            .map(|(name, rel_id)| {
                let target = targets.get(&rel_id).ok_or_else(|| {
                    SpreadsheetError::Invalid(format!(
                        "sheet '{}' references unknown relationship '{}'",
                        name, rel_id
                    ))
                })?;
                Ok(SheetEntry {
                    name,
                    part: resolve_target(target),
                })
            })
            .collect::<SpreadsheetResult<Vec<_>>>()?;

        let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART, limit)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let date_styles = match read_part(&mut archive, STYLES_PART, limit)? {
            Some(xml) => parse_date_styles(&xml)?,
            None => Vec::new(),
        };

        tracing::debug!(
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            date1904,
            "Workbook opened"
        );

        Ok(XlsxReader {
            archive,
            sheets,
            shared_strings,
            date_styles,
            date1904,
            max_part_bytes,
        })
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn worksheet(&mut self, index: usize) -> SpreadsheetResult<Worksheet> {
        let entry = self
            .sheets
            .get(index)
            .cloned()
            .ok_or(SpreadsheetError::NoWorksheets)?;
        let xml = read_part(&mut self.archive, &entry.part, self.max_part_bytes)?
            .ok_or_else(|| SpreadsheetError::MissingPart(entry.part.clone()))?;
        let rows = self.parse_sheet(&xml)?;
        Ok(Worksheet::new(entry.name, rows))
    }

    pub fn properties(&mut self) -> SpreadsheetResult<DocumentProperties> {
        match read_part(&mut self.archive, CORE_PROPERTIES_PART, self.max_part_bytes)? {
            Some(xml) => parse_core_properties(&xml),
            None => Ok(DocumentProperties::default()),
        }
    }

    fn parse_sheet(&self, xml: &[u8]) -> SpreadsheetResult<Vec<Vec<CellValue>>> {
        let mut reader = xml_reader(xml);
        let mut buf = Vec::new();
        let mut cells: Vec<(usize, usize, CellValue)> = Vec::new();

        let mut row: Option<usize> = None;
        let mut next_column = 0usize;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline = false;
        let mut in_text = false;
        let mut in_phonetic = false;

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"row" => {
                        let index = match attribute(&e, b"r")? {
                            Some(r) => r
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|r| r.checked_sub(1))
                                .ok_or_else(|| {
                                    SpreadsheetError::Invalid(format!("bad row number '{}'", r))
                                })?,
                            None => row.map(|r| r + 1).unwrap_or(0),
                        };
                        if index >= MAX_ROWS {
                            return Err(SpreadsheetError::Invalid(format!(
                                "row {} is out of range",
                                index + 1
                            )));
                        }
                        row = Some(index);
                        next_column = 0;
                    }
                    b"c" => {
                        let column = match attribute(&e, b"r")? {
                            Some(reference) => column_index(&reference)?,
                            None => next_column,
                        };
                        let style = attribute(&e, b"s")?
                            .and_then(|s| s.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        cell = Some(PendingCell {
                            column,
                            kind: attribute(&e, b"t")?,
                            style,
                            value: String::new(),
                            inline: String::new(),
                        });
                    }
                    b"v" if cell.is_some() => in_value = true,
                    b"is" if cell.is_some() => in_inline = true,
                    b"rPh" => in_phonetic = true,
                    b"t" if in_inline && !in_phonetic => in_text = true,
                    _ => (),
                },
                Event::Text(t) => {
                    if let Some(pending) = cell.as_mut() {
                        if in_value {
                            pending.value.push_str(&t.xml_content()?);
                        } else if in_text {
                            pending.inline.push_str(&t.xml_content()?);
                        }
                    }
                }
                Event::CData(c) => {
                    if let Some(pending) = cell.as_mut() {
                        let text = String::from_utf8_lossy(&c);
                        if in_value {
                            pending.value.push_str(&text);
                        } else if in_text {
                            pending.inline.push_str(&text);
                        }
                    }
                }
                Event::GeneralRef(r) => {
                    if let Some(pending) = cell.as_mut() {
                        if in_value {
                            push_reference(&mut pending.value, &r)?;
                        } else if in_text {
                            push_reference(&mut pending.inline, &r)?;
                        }
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"is" => in_inline = false,
                    b"rPh" => in_phonetic = false,
                    b"t" => in_text = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            let row_index = row.unwrap_or(0);
                            next_column = pending.column + 1;
                            let value = self.cell_value(pending.kind.as_deref(), pending.style, &pending.value, pending.inline)?;
                            if !value.is_blank() {
                                cells.push((row_index, pending.column, value));
                            }
                        }
                    }
                    _ => (),
                },
                Event::Eof => break,
                _ => (),
            }
        }

        Ok(build_grid(cells))
    }

    fn cell_value(
        &self,
        kind: Option<&str>,
        style: usize,
        raw: &str,
        inline: String,
    ) -> SpreadsheetResult<CellValue> {
        let value = match kind {
            Some("s") => {
                if raw.trim().is_empty() {
                    return Ok(CellValue::Blank);
                }
                let index: usize = raw.trim().parse().map_err(|_| {
                    SpreadsheetError::Invalid(format!("bad shared string index '{}'", raw))
                })?;
                let text = self.shared_strings.get(index).ok_or_else(|| {
                    SpreadsheetError::Invalid(format!("shared string {} does not exist", index))
                })?;
                CellValue::Text(text.clone())
            }
            Some("inlineStr") => CellValue::Text(inline),
            Some("str") | Some("e") => CellValue::Text(raw.to_string()),
            Some("b") => match raw.trim() {
                "" => CellValue::Blank,
                v => CellValue::Bool(v == "1" || v.eq_ignore_ascii_case("true")),
            },
            Some("d") => match parse_iso_datetime(raw.trim()) {
                Some(d) => CellValue::Date(d),
                None => CellValue::Text(raw.to_string()),
            },
            _ => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(CellValue::Blank);
                }
                let number: f64 = trimmed
                    .parse()
                    .ok()
                    .filter(|n: &f64| n.is_finite())
                    .ok_or_else(|| {
                        SpreadsheetError::Invalid(format!("bad numeric value '{}'", trimmed))
                    })?;
                let is_date = self.date_styles.get(style).copied().unwrap_or(false);
                match is_date.then(|| serial_to_datetime(number, self.date1904)).flatten() {
                    Some(d) => CellValue::Date(d),
                    None => CellValue::Number(number),
                }
            }
        };
        Ok(value)
    }
}

struct PendingCell {
    column: usize,
    kind: Option<String>,
    style: usize,
    value: String,
    inline: String,
}

/// Parse the first worksheet of an `.xlsx` workbook.
pub fn read_xlsx_first_worksheet(bytes: &[u8]) -> SpreadsheetResult<Worksheet> {
    let mut reader = XlsxReader::open(bytes)?;
    if reader.sheet_count() == 0 {
        return Err(SpreadsheetError::NoWorksheets);
    }
    reader.worksheet(0)
}

/// Parse every worksheet of an `.xlsx` workbook plus its document properties.
pub fn read_xlsx_workbook(bytes: &[u8]) -> SpreadsheetResult<Workbook> {
    let mut reader = XlsxReader::open(bytes)?;
    let sheets = (0..reader.sheet_count())
        .map(|index| reader.worksheet(index))
        .collect::<SpreadsheetResult<Vec<_>>>()?;
    let properties = reader.properties()?;
    Ok(Workbook { sheets, properties })
}

fn xml_reader(data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(data);
    let config = reader.config_mut();
    config.check_comments = false;
    config.check_end_names = false;
    config.expand_empty_elements = true;
    config.trim_text(false);
    reader
}

/// Decompress one part. The buffer grows with the data actually read; the
/// size declared in the zip header is not trusted.
fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    limit: u64,
) -> SpreadsheetResult<Option<Vec<u8>>> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::new();
    file.take(limit + 1).read_to_end(&mut data)?;
    if data.len() as u64 > limit {
        return Err(SpreadsheetError::Invalid(format!(
            "part {} exceeds {} bytes",
            name, limit
        )));
    }
    Ok(Some(data))
}

/// Attribute value by local name (namespace prefixes ignored).
fn attribute(element: &BytesStart, name: &[u8]) -> SpreadsheetResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn push_reference(out: &mut String, reference: &BytesRef) -> SpreadsheetResult<()> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        }
        .ok_or_else(|| SpreadsheetError::Invalid(format!("bad character reference &{};", raw)))?;
        if let Some(c) = char::from_u32(code) {
            out.push(c);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        out.push_str(entity);
    } else {
        return Err(SpreadsheetError::Invalid(format!("unknown entity &{};", raw)));
    }
    Ok(())
}

/// Returns declared sheets as (name, relationship id) and the 1904 date flag.
fn parse_workbook(xml: &[u8]) -> SpreadsheetResult<(Vec<(String, String)>, bool)> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date1904 = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = attribute(&e, b"name")?.unwrap_or_default();
                    let rel_id = attribute(&e, b"id")?.ok_or_else(|| {
                        SpreadsheetError::Invalid(format!("sheet '{}' has no relationship", name))
                    })?;
                    sheets.push((name, rel_id));
                }
                b"workbookPr" => {
                    date1904 = attribute(&e, b"date1904")?
                        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                        .unwrap_or(false);
                }
                _ => (),
            },
            Event::Eof => break,
            _ => (),
        }
    }

    Ok((sheets, date1904))
}

fn parse_relationships(xml: &[u8]) -> SpreadsheetResult<HashMap<String, String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

fn parse_shared_strings(xml: &[u8]) -> SpreadsheetResult<Vec<String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => (),
            },
            Event::Text(t) if in_text => current.push_str(&t.xml_content()?),
            Event::CData(c) if in_text => current.push_str(&String::from_utf8_lossy(&c)),
            Event::GeneralRef(r) if in_text => push_reference(&mut current, &r)?,
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => (),
            },
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(strings)
}

/// For each `cellXfs` entry, whether its number format renders a date.
fn parse_date_styles(xml: &[u8]) -> SpreadsheetResult<Vec<bool>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(&e, b"numFmtId")?.and_then(|v| v.trim().parse().ok());
                    let code = attribute(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_formats.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attribute(&e, b"numFmtId")?
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(0);
                    format_ids.push(id);
                }
                _ => (),
            },
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(format_ids
        .into_iter()
        .map(|id| match custom_formats.get(&id) {
            Some(code) => custom_format_is_date(code),
            None => builtin_format_is_date(id),
        })
        .collect())
}

/// Built-in date and date-time formats. Time-only formats (18-21, 45-47) stay numeric.
fn builtin_format_is_date(id: u32) -> bool {
    matches!(id, 14..=17 | 22)
}

/// A custom format is a date when it uses year or day tokens outside literals,
/// escapes and bracketed sections.
fn custom_format_is_date(code: &str) -> bool {
    let mut escaped = false;
    let mut in_literal = false;
    let mut in_bracket = false;

    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' | '_' if !in_literal => escaped = true,
            '"' if !in_bracket => in_literal = !in_literal,
            '[' if !in_literal => in_bracket = true,
            ']' if in_bracket => in_bracket = false,
            _ if in_literal || in_bracket => (),
            'y' | 'Y' | 'd' | 'D' => return true,
            _ => (),
        }
    }
    false
}

/// Convert a serial day number to a timestamp.
///
/// The 1900 system counts 1900-02-29 as a real day, so serials below 60 are
/// shifted by one to land on the correct calendar date.
fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let base = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let millis = (serial.fract() * 86_400_000.0).round() as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_core_properties(xml: &[u8]) -> SpreadsheetResult<DocumentProperties> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut properties = DocumentProperties::default();
    let mut field: Option<&'static str> = None;
    let mut text = String::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                field = match e.local_name().as_ref() {
                    b"created" => Some("created"),
                    b"modified" => Some("modified"),
                    _ => None,
                };
                text.clear();
            }
            Event::Text(t) if field.is_some() => text.push_str(&t.xml_content()?),
            Event::End(_) => {
                if let Some(name) = field.take() {
                    let parsed = DateTime::parse_from_rfc3339(text.trim())
                        .ok()
                        .map(|d| d.with_timezone(&Utc));
                    match name {
                        "created" => properties.created = parsed,
                        _ => properties.modified = parsed,
                    }
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(properties)
}

/// Column index from an A1-style reference (`"C7"` -> 2).
fn column_index(reference: &str) -> SpreadsheetResult<usize> {
    let mut column = 0usize;
    let mut letters = 0;
    for ch in reference.chars() {
        if ch.is_ascii_alphabetic() {
            column = column * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
            letters += 1;
            if column > MAX_COLUMNS {
                break;
            }
        } else {
            break;
        }
    }
    if letters == 0 || column == 0 || column > MAX_COLUMNS {
        return Err(SpreadsheetError::Invalid(format!(
            "bad cell reference '{}'",
            reference
        )));
    }
    Ok(column - 1)
}

/// Lay cells out in a grid anchored at the top-left used cell.
fn build_grid(cells: Vec<(usize, usize, CellValue)>) -> Vec<Vec<CellValue>> {
    let (Some(min_row), Some(max_row), Some(min_column)) = (
        cells.iter().map(|c| c.0).min(),
        cells.iter().map(|c| c.0).max(),
        cells.iter().map(|c| c.1).min(),
    ) else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); max_row - min_row + 1];
    for (row, column, value) in cells {
        let target = &mut rows[row - min_row];
        let column = column - min_column;
        if target.len() <= column {
            target.resize(column + 1, CellValue::Blank);
        }
        target[column] = value;
    }
    rows
}
