//! In-memory `.xlsx` and `.xls` builders for tests.

use std::io::{Cursor, Write};

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::escape::escape;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::worksheet::CellValue;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// Style 1 renders dates (built-in format 14).
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

/// Zip arbitrary named parts.
pub fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer
            .write_all(content.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A workbook with one sheet per `(name, rows)` pair.
pub fn workbook_xlsx(sheets: &[(&str, Vec<Vec<CellValue>>)]) -> Vec<u8> {
    let mut sheet_entries = String::new();
    let mut relationships = String::new();
    let mut sheet_parts = Vec::new();

    for (index, (name, rows)) in sheets.iter().enumerate() {
        let n = index + 1;
        sheet_entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(*name),
            n,
            n
        ));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
        sheet_parts.push((format!("xl/worksheets/sheet{}.xml", n), sheet_xml(rows)));
    }

    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
        sheet_entries
    );
    let rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
        relationships
    );

    let mut parts: Vec<(&str, &str)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", &rels),
        ("xl/styles.xml", STYLES),
    ];
    for (name, xml) in &sheet_parts {
        parts.push((name.as_str(), xml.as_str()));
    }
    zip_parts(&parts)
}

/// A workbook with a single sheet named `Sheet1`.
pub fn single_sheet_xlsx(rows: Vec<Vec<CellValue>>) -> Vec<u8> {
    workbook_xlsx(&[("Sheet1", rows)])
}

fn sheet_xml(rows: &[Vec<CellValue>]) -> String {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        data.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(c), r + 1);
            match cell {
                CellValue::Number(n) => {
                    data.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n))
                }
                CellValue::Text(s) => data.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference,
                    escape(s.as_str())
                )),
                CellValue::Bool(b) => data.push_str(&format!(
                    r#"<c r="{}" t="b"><v>{}</v></c>"#,
                    reference,
                    u8::from(*b)
                )),
                CellValue::Date(d) => data.push_str(&format!(
                    r#"<c r="{}" s="1"><v>{}</v></c>"#,
                    reference,
                    date_serial(d)
                )),
                CellValue::Blank => (),
            }
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        data
    )
}

/// A legacy BIFF8 workbook with a single sheet named `Sheet1`, wrapped in a
/// version 3 compound file: one FAT sector, one directory sector, then the
/// `Workbook` stream padded past the 4096-byte mini stream cutoff.
pub fn single_sheet_xls(rows: Vec<Vec<CellValue>>) -> Vec<u8> {
    let stream = biff8_workbook("Sheet1", &rows);
    compound_file(&stream)
}

const XLS_RECORD_BOF: u16 = 0x0809;
const XLS_RECORD_EOF: u16 = 0x000A;
const XLS_RECORD_CODEPAGE: u16 = 0x0042;
const XLS_RECORD_XF: u16 = 0x00E0;
const XLS_RECORD_BOUNDSHEET: u16 = 0x0085;
const XLS_RECORD_SST: u16 = 0x00FC;
const XLS_RECORD_DIMENSIONS: u16 = 0x0200;
const XLS_RECORD_NUMBER: u16 = 0x0203;
const XLS_RECORD_BOOLERR: u16 = 0x0205;
const XLS_RECORD_LABELSST: u16 = 0x00FD;

/// XF 1 uses built-in number format 14 (a date).
const XLS_DATE_XF: u16 = 1;

fn record(out: &mut Vec<u8>, kind: u16, data: &[u8]) {
    assert!(data.len() <= 8224, "record too large for a fixture");
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn bof(substream: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&0x0600u16.to_le_bytes());
    data.extend_from_slice(&substream.to_le_bytes());
    data.extend_from_slice(&[0u8; 12]);
    data
}

/// Unicode string body: compressed Latin-1 when possible, UTF-16LE otherwise.
fn xl_string_body(text: &str, out: &mut Vec<u8>) {
    if text.chars().all(|c| (c as u32) < 0x100) {
        out.push(0x00);
        out.extend(text.chars().map(|c| c as u8));
    } else {
        out.push(0x01);
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
}

fn biff8_workbook(sheet_name: &str, rows: &[Vec<CellValue>]) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut cells = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u16, c as u16);
            match cell {
                CellValue::Number(n) => {
                    let mut data = cell_header(r, c, 0);
                    data.extend_from_slice(&n.to_le_bytes());
                    record(&mut cells, XLS_RECORD_NUMBER, &data);
                }
                CellValue::Date(d) => {
                    let mut data = cell_header(r, c, XLS_DATE_XF);
                    data.extend_from_slice(&date_serial(d).to_le_bytes());
                    record(&mut cells, XLS_RECORD_NUMBER, &data);
                }
                CellValue::Bool(b) => {
                    let mut data = cell_header(r, c, 0);
                    data.extend_from_slice(&[u8::from(*b), 0x00]);
                    record(&mut cells, XLS_RECORD_BOOLERR, &data);
                }
                CellValue::Text(s) => {
                    let index = match strings.iter().position(|existing| existing == s) {
                        Some(index) => index,
                        None => {
                            strings.push(s.clone());
                            strings.len() - 1
                        }
                    };
                    let mut data = cell_header(r, c, 0);
                    data.extend_from_slice(&(index as u32).to_le_bytes());
                    record(&mut cells, XLS_RECORD_LABELSST, &data);
                }
                CellValue::Blank => (),
            }
        }
    }

    let mut sst = Vec::new();
    sst.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    sst.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for s in &strings {
        sst.extend_from_slice(&(s.encode_utf16().count() as u16).to_le_bytes());
        xl_string_body(s, &mut sst);
    }

    let mut sheet_name_data = Vec::new();
    sheet_name_data.push(sheet_name.encode_utf16().count() as u8);
    xl_string_body(sheet_name, &mut sheet_name_data);

    let xf = vec![0u8; 20];
    let mut date_xf = vec![0u8; 20];
    date_xf[2..4].copy_from_slice(&14u16.to_le_bytes());

    // Globals first; the sheet offset is patched once their length is known.
    let mut globals = Vec::new();
    record(&mut globals, XLS_RECORD_BOF, &bof(0x0005));
    record(&mut globals, XLS_RECORD_CODEPAGE, &1200u16.to_le_bytes());
    record(&mut globals, XLS_RECORD_XF, &xf);
    record(&mut globals, XLS_RECORD_XF, &date_xf);
    let offset_at = globals.len() + 4;
    let mut boundsheet = vec![0u8; 6];
    boundsheet.extend_from_slice(&sheet_name_data);
    record(&mut globals, XLS_RECORD_BOUNDSHEET, &boundsheet);
    record(&mut globals, XLS_RECORD_SST, &sst);
    record(&mut globals, XLS_RECORD_EOF, &[]);
    let sheet_offset = globals.len() as u32;
    globals[offset_at..offset_at + 4].copy_from_slice(&sheet_offset.to_le_bytes());

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut dimensions = Vec::with_capacity(14);
    dimensions.extend_from_slice(&0u32.to_le_bytes());
    dimensions.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    dimensions.extend_from_slice(&0u16.to_le_bytes());
    dimensions.extend_from_slice(&(columns as u16).to_le_bytes());
    dimensions.extend_from_slice(&0u16.to_le_bytes());

    let mut stream = globals;
    record(&mut stream, XLS_RECORD_BOF, &bof(0x0010));
    record(&mut stream, XLS_RECORD_DIMENSIONS, &dimensions);
    stream.extend_from_slice(&cells);
    record(&mut stream, XLS_RECORD_EOF, &[]);
    stream
}

fn cell_header(row: u16, column: u16, xf: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(14);
    data.extend_from_slice(&row.to_le_bytes());
    data.extend_from_slice(&column.to_le_bytes());
    data.extend_from_slice(&xf.to_le_bytes());
    data
}

const CFB_SECTOR: usize = 512;
const CFB_FREE: u32 = 0xFFFF_FFFF;
const CFB_END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const CFB_FAT_SECTOR: u32 = 0xFFFF_FFFD;
const CFB_NO_STREAM: u32 = 0xFFFF_FFFF;
const CFB_MINI_STREAM_CUTOFF: usize = 4096;

fn compound_file(stream: &[u8]) -> Vec<u8> {
    let mut stream = stream.to_vec();
    if stream.len() < CFB_MINI_STREAM_CUTOFF {
        stream.resize(CFB_MINI_STREAM_CUTOFF, 0);
    }
    let stream_sectors = stream.len().div_ceil(CFB_SECTOR);
    assert!(stream_sectors + 2 <= CFB_SECTOR / 4, "workbook too large for a fixture");
    stream.resize(stream_sectors * CFB_SECTOR, 0);

    let mut header = vec![0u8; CFB_SECTOR];
    header[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
    header[26..28].copy_from_slice(&0x0003u16.to_le_bytes());
    header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
    header[30..32].copy_from_slice(&0x0009u16.to_le_bytes());
    header[32..34].copy_from_slice(&0x0006u16.to_le_bytes());
    header[44..48].copy_from_slice(&1u32.to_le_bytes());
    header[48..52].copy_from_slice(&1u32.to_le_bytes());
    header[56..60].copy_from_slice(&(CFB_MINI_STREAM_CUTOFF as u32).to_le_bytes());
    header[60..64].copy_from_slice(&CFB_END_OF_CHAIN.to_le_bytes());
    header[68..72].copy_from_slice(&CFB_END_OF_CHAIN.to_le_bytes());
    header[76..80].copy_from_slice(&0u32.to_le_bytes());
    for slot in header[80..].chunks_mut(4) {
        slot.copy_from_slice(&CFB_FREE.to_le_bytes());
    }

    let mut fat = vec![CFB_FREE; CFB_SECTOR / 4];
    fat[0] = CFB_FAT_SECTOR;
    fat[1] = CFB_END_OF_CHAIN;
    for sector in 0..stream_sectors {
        let id = sector + 2;
        fat[id] = if sector + 1 == stream_sectors {
            CFB_END_OF_CHAIN
        } else {
            (id + 1) as u32
        };
    }

    let mut directory = Vec::with_capacity(CFB_SECTOR);
    directory.extend(directory_entry("Root Entry", 5, 1, CFB_END_OF_CHAIN, 0));
    directory.extend(directory_entry("Workbook", 2, CFB_NO_STREAM, 2, stream.len() as u32));
    directory.extend(directory_entry("", 0, CFB_NO_STREAM, 0, 0));
    directory.extend(directory_entry("", 0, CFB_NO_STREAM, 0, 0));

    let mut file = header;
    for entry in fat {
        file.extend_from_slice(&entry.to_le_bytes());
    }
    file.extend_from_slice(&directory);
    file.extend_from_slice(&stream);
    file
}

fn directory_entry(name: &str, kind: u8, child: u32, start: u32, size: u32) -> Vec<u8> {
    let mut entry = vec![0u8; 128];
    if !name.is_empty() {
        let mut offset = 0;
        for unit in name.encode_utf16() {
            entry[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
            offset += 2;
        }
        entry[64..66].copy_from_slice(&((offset + 2) as u16).to_le_bytes());
    }
    entry[66] = kind;
    entry[67] = 1;
    entry[68..72].copy_from_slice(&CFB_NO_STREAM.to_le_bytes());
    entry[72..76].copy_from_slice(&CFB_NO_STREAM.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..124].copy_from_slice(&size.to_le_bytes());
    entry
}

fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Serial number in the 1900 date system (valid from 1900-03-01).
fn date_serial(value: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid epoch");
    let elapsed = *value - epoch;
    elapsed.num_milliseconds() as f64 / 86_400_000.0
}
