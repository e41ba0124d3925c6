// src/report.rs

use crate::cli::SortOrder;
use crate::error::ReportError;
use crate::model::CommitRecord;
use quick_xml::escape::escape;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const HEADERS: [&str; 3] = ["Repository", "Date", "Commit Message"];
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SHEET_NAME: &str = "Commits";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Stable sort by commit time; equal timestamps keep their input order.
pub fn sort_records(records: &mut [CommitRecord], order: SortOrder) {
    match order {
        SortOrder::Asc => records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortOrder::Desc => records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }
}

/// Report rows in output order, without the header
pub fn rows(records: &[CommitRecord]) -> Vec<[String; 3]> {
    records
        .iter()
        .map(|r| {
            [
                r.repository.clone(),
                r.timestamp.format(DATE_FORMAT).to_string(),
                r.message.clone(),
            ]
        })
        .collect()
}

/// Sorts `records` and writes them as an xlsx workbook at `path`.
///
/// The workbook is assembled in a temporary file next to `path` and only
/// renamed over it once complete, so a failed run never leaves a truncated
/// report behind. With no records the sheet holds just the header row.
pub fn write_report(
    path: &Path,
    mut records: Vec<CommitRecord>,
    order: SortOrder,
) -> Result<usize, ReportError> {
    sort_records(&mut records, order);
    let rows = rows(&records);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;

    let mut zip = ZipWriter::new(tmp.as_file_mut());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml().as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS.as_bytes())?;
    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(sheet_xml(&rows).as_bytes())?;
    zip.finish()?;

    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(rows.len())
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        SHEET_NAME
    )
}

fn sheet_xml(rows: &[[String; 3]]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    push_row(&mut xml, 1, HEADERS.iter().copied());
    for (i, row) in rows.iter().enumerate() {
        push_row(&mut xml, i + 2, row.iter().map(String::as_str));
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row<'a>(xml: &mut String, row: usize, cells: impl Iterator<Item = &'a str>) {
    xml.push_str(&format!(r#"<row r="{}">"#, row));
    for (col, value) in cells.enumerate() {
        let value = xml_safe(value);
        xml.push_str(&format!(
            r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            column_name(col),
            row,
            escape(value.as_str())
        ));
    }
    xml.push_str("</row>");
}

/// Drops characters XML 1.0 cannot carry (control characters other than tab and newlines)
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || !c.is_control())
        .collect()
}

fn column_name(col: usize) -> char {
    (b'A' + col as u8) as char
}
