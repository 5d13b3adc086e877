//! Minimal reader for Office Open XML workbooks (`.xlsx`).
//!
//! Only what an event sheet needs is decoded: sheet names, cell values
//! (shared, inline and formula strings, numbers, booleans, ISO dates and
//! error cells), hyperlinks attached to cells, and the workbook's date
//! system. Styles, formulas and merged cells are ignored.

use chrono::{Days, NaiveDate};
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesRef, Event};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

static CELL_REF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").ok());

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Errors raised while decoding a workbook.
#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a valid xlsx archive: {0}")]
    Zip(#[from] ZipError),

    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("missing workbook part {0}")]
    MissingPart(String),

    #[error("no sheet named `{0}`")]
    SheetNotFound(String),

    #[error("workbook has no sheets")]
    NoSheets,
}

pub type Result<T> = std::result::Result<T, XlsxError>;

/// Decoded value of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// ISO 8601 date as stored in `t="d"` cells
    IsoDate(String),
    /// Error literal such as `#N/A`
    Error(String),
}

/// One row of a sheet. Cells are keyed by 0-based column index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    /// 1-based row number
    pub number: u32,
    pub cells: Vec<(u32, CellValue)>,
}

impl SheetRow {
    pub fn cell(&self, column: u32) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(col, _)| *col == column)
            .map(|(_, value)| value)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| match value {
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        })
    }
}

/// Rectangular cell range, inclusive, 0-based columns and 1-based rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    first_col: u32,
    first_row: u32,
    last_col: u32,
    last_row: u32,
}

impl CellRange {
    fn parse(reference: &str) -> Option<Self> {
        let (start, end) = reference.split_once(':').unwrap_or((reference, reference));
        let (first_col, first_row) = parse_cell_ref(start)?;
        let (last_col, last_row) = parse_cell_ref(end)?;
        Some(Self {
            first_col: first_col.min(last_col),
            first_row: first_row.min(last_row),
            last_col: first_col.max(last_col),
            last_row: first_row.max(last_row),
        })
    }

    fn contains(&self, column: u32, row: u32) -> bool {
        (self.first_col..=self.last_col).contains(&column)
            && (self.first_row..=self.last_row).contains(&row)
    }
}

/// A fully decoded worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub rows: Vec<SheetRow>,
    hyperlinks: Vec<(CellRange, String)>,
    /// Whether serial dates count from 1904-01-01
    pub date1904: bool,
}

impl Sheet {
    /// Hyperlink target attached to the given cell, if any.
    pub fn hyperlink(&self, column: u32, row: u32) -> Option<&str> {
        self.hyperlinks
            .iter()
            .find(|(range, _)| range.contains(column, row))
            .map(|(_, target)| target.as_str())
    }
}

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    part: String,
}

/// An opened workbook archive.
pub struct Workbook {
    archive: ZipArchive<BufReader<File>>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    date1904: bool,
}

impl Workbook {
    /// Opens the archive and reads the workbook index and shared strings.
    ///
    /// # Errors
    ///
    /// Returns an `XlsxError` when the file is not a zip archive or a
    /// required part is missing or malformed.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PART.to_string()))?;
        let (declared, date1904) = parse_workbook(&workbook_xml)?;

        let rels = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml, WORKBOOK_RELS_PART)?,
            None => HashMap::new(),
        };

        let sheets = declared
            .into_iter()
            .filter_map(|(name, rel_id)| {
                rels.get(&rel_id).map(|rel| SheetEntry {
                    name,
                    part: resolve_part_path("xl", &rel.target),
                })
            })
            .collect::<Vec<_>>();

        let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        tracing::debug!(
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            date1904,
            "opened workbook {}",
            path.display()
        );

        Ok(Self {
            archive,
            sheets,
            shared_strings,
            date1904,
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Decodes the sheet with the given name.
    ///
    /// # Errors
    ///
    /// `XlsxError::SheetNotFound` if no such sheet exists, or a decode error.
    pub fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        let entry = self
            .sheets
            .iter()
            .find(|entry| entry.name == name)
            .cloned()
            .ok_or_else(|| XlsxError::SheetNotFound(name.to_string()))?;
        self.decode_sheet(&entry)
    }

    /// Decodes the first sheet in workbook order.
    ///
    /// # Errors
    ///
    /// `XlsxError::NoSheets` for an empty workbook, or a decode error.
    pub fn read_first_sheet(&mut self) -> Result<(String, Sheet)> {
        let entry = self.sheets.first().cloned().ok_or(XlsxError::NoSheets)?;
        let sheet = self.decode_sheet(&entry)?;
        Ok((entry.name, sheet))
    }

    fn decode_sheet(&mut self, entry: &SheetEntry) -> Result<Sheet> {
        let xml = read_part(&mut self.archive, &entry.part)?
            .ok_or_else(|| XlsxError::MissingPart(entry.part.clone()))?;

        let rels_part = sheet_rels_part(&entry.part);
        let rels = match read_part(&mut self.archive, &rels_part)? {
            Some(rels_xml) => parse_relationships(&rels_xml, &rels_part)?,
            None => HashMap::new(),
        };

        let mut sheet = parse_sheet(&xml, &entry.part, &self.shared_strings, &rels)?;
        sheet.date1904 = self.date1904;
        Ok(sheet)
    }
}

/// Converts a spreadsheet serial day number to a calendar date.
///
/// The 1900 system reproduces the historical leap-day bug: serial 60 is the
/// non-existent 1900-02-29 and lands on 1900-03-01. Returns `None` for
/// negative or out-of-range serials.
pub fn serial_to_date(serial: f64, date1904: bool) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let (epoch, days) = if date1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, days)
    } else if days < 61 {
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, days)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, days)
    };
    epoch.checked_add_days(Days::new(days))
}

/// Splits an `A1` style reference into a 0-based column and 1-based row.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let captures = CELL_REF.as_ref()?.captures(reference.trim())?;
    let letters = captures.get(1)?.as_str();
    let row = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let column = letters
        .bytes()
        .map(|b| u32::from(b.to_ascii_uppercase() - b'A') + 1)
        .fold(0u32, |acc, digit| acc * 26 + digit);
    Some((column - 1, row))
}

fn read_part(archive: &mut ZipArchive<BufReader<File>>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::with_capacity(usize::try_from(part.size()).unwrap_or(0));
    part.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn sheet_rels_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the directory of its source part.
fn resolve_part_path(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> XlsxError {
    XlsxError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

/// Collects attributes by local name, unescaped.
fn attributes(attrs: Attributes<'_>, part: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in attrs {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| xml_error(part, e))?;
        map.insert(key, value.into_owned());
    }
    Ok(map)
}

fn resolve_entity(entity: &BytesRef<'_>, part: &str) -> Result<String> {
    let raw = entity.decode().map_err(|e| xml_error(part, e))?;
    if let Some(resolved) = resolve_xml_entity(&raw) {
        return Ok(resolved.to_string());
    }
    if let Some(rest) = raw.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => rest.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| xml_error(part, format!("invalid character reference &{raw};")));
    }
    Ok(format!("&{raw};"))
}

fn parse_workbook(xml: &[u8]) -> Result<(Vec<(String, String)>, bool)> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date1904 = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(WORKBOOK_PART, e))?
        {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    let attrs = attributes(e.attributes(), WORKBOOK_PART)?;
                    date1904 = attrs
                        .get("date1904")
                        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
                }
                b"sheet" => {
                    let mut attrs = attributes(e.attributes(), WORKBOOK_PART)?;
                    if let (Some(name), Some(id)) = (attrs.remove("name"), attrs.remove("id")) {
                        sheets.push((name, id));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, date1904))
}

#[derive(Debug, Clone)]
struct Relationship {
    target: String,
    external: bool,
}

fn parse_relationships(xml: &[u8], part: &str) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_error(part, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut attrs = attributes(e.attributes(), part)?;
                if let (Some(id), Some(target)) = (attrs.remove("Id"), attrs.remove("Target")) {
                    let external = attrs
                        .get("TargetMode")
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
                    rels.insert(id, Relationship { target, external });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let part = SHARED_STRINGS_PART;
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_error(part, e))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.decode().map_err(|e| xml_error(part, e))?;
                if let Some(current) = current.as_mut() {
                    current.push_str(&text);
                }
            }
            Event::CData(e) if in_text => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) if in_text => {
                let resolved = resolve_entity(&e, part)?;
                if let Some(current) = current.as_mut() {
                    current.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Cell under construction while its children are read.
#[derive(Default)]
struct PendingCell {
    column: u32,
    kind: String,
    raw: String,
    inline: String,
}

impl PendingCell {
    fn finish(self, shared: &[String]) -> Option<CellValue> {
        let raw = self.raw;
        match self.kind.as_str() {
            "s" => {
                let index = raw.trim().parse::<usize>().ok()?;
                shared.get(index).cloned().map(CellValue::Text)
            }
            "inlineStr" => Some(CellValue::Text(self.inline)),
            "str" => Some(CellValue::Text(raw)),
            "b" => Some(CellValue::Bool(raw.trim() == "1")),
            "e" => Some(CellValue::Error(raw)),
            "d" => Some(CellValue::IsoDate(raw.trim().to_string())),
            _ if raw.trim().is_empty() => None,
            _ => raw
                .trim()
                .parse::<f64>()
                .ok()
                .map(CellValue::Number)
                .or(Some(CellValue::Error(raw))),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Value,
    Inline,
}

fn parse_sheet(
    xml: &[u8],
    part: &str,
    shared: &[String],
    rels: &HashMap<String, Relationship>,
) -> Result<Sheet> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheet = Sheet::default();

    let mut row: Option<SheetRow> = None;
    let mut cell: Option<PendingCell> = None;
    let mut capture = Capture::None;
    let mut phonetic_depth = 0usize;
    let mut next_row = 1u32;
    let mut next_col = 0u32;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_error(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        let attrs = attributes(e.attributes(), part)?;
                        let number = attrs
                            .get("r")
                            .and_then(|r| r.parse::<u32>().ok())
                            .unwrap_or(next_row);
                        next_row = number + 1;
                        next_col = 0;
                        let new_row = SheetRow {
                            number,
                            cells: Vec::new(),
                        };
                        if is_empty {
                            sheet.rows.push(new_row);
                        } else {
                            row = Some(new_row);
                        }
                    }
                    b"c" => {
                        let attrs = attributes(e.attributes(), part)?;
                        let column = attrs
                            .get("r")
                            .and_then(|r| parse_cell_ref(r))
                            .map_or(next_col, |(col, _)| col);
                        next_col = column + 1;
                        if !is_empty {
                            cell = Some(PendingCell {
                                column,
                                kind: attrs.get("t").cloned().unwrap_or_default(),
                                ..PendingCell::default()
                            });
                        }
                    }
                    b"v" if cell.is_some() && !is_empty => capture = Capture::Value,
                    b"rPh" if !is_empty => phonetic_depth += 1,
                    b"t" if cell.is_some() && !is_empty && phonetic_depth == 0 => {
                        capture = Capture::Inline;
                    }
                    b"hyperlink" => {
                        let attrs = attributes(e.attributes(), part)?;
                        if let Some(link) = hyperlink_target(&attrs, rels)
                            && let Some(range) = attrs.get("ref").and_then(|r| CellRange::parse(r))
                        {
                            sheet.hyperlinks.push((range, link));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    if let Some(done) = row.take() {
                        sheet.rows.push(done);
                    }
                }
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let column = pending.column;
                        if let Some(value) = pending.finish(shared)
                            && let Some(row) = row.as_mut()
                        {
                            row.cells.push((column, value));
                        }
                    }
                }
                b"v" | b"t" => capture = Capture::None,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Text(ref e) if capture != Capture::None => {
                let text = e.decode().map_err(|e| xml_error(part, e))?;
                push_captured(cell.as_mut(), capture, &text);
            }
            Event::CData(ref e) if capture != Capture::None => {
                push_captured(cell.as_mut(), capture, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::GeneralRef(ref e) if capture != Capture::None => {
                let resolved = resolve_entity(e, part)?;
                push_captured(cell.as_mut(), capture, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheet)
}

fn push_captured(cell: Option<&mut PendingCell>, capture: Capture, text: &str) {
    if let Some(cell) = cell {
        match capture {
            Capture::Value => cell.raw.push_str(text),
            Capture::Inline => cell.inline.push_str(text),
            Capture::None => {}
        }
    }
}

fn hyperlink_target(
    attrs: &HashMap<String, String>,
    rels: &HashMap<String, Relationship>,
) -> Option<String> {
    let location = attrs.get("location").filter(|l| !l.is_empty());
    match attrs.get("id").and_then(|id| rels.get(id)) {
        Some(rel) => {
            if !rel.external {
                tracing::trace!(target = %rel.target, "internal hyperlink relationship");
            }
            Some(match location {
                Some(location) => format!("{}#{location}", rel.target),
                None => rel.target.clone(),
            })
        }
        None => location.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::XlsxFixture;
    use tempfile::TempDir;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 1)));
        assert_eq!(parse_cell_ref("B12"), Some((1, 12)));
        assert_eq!(parse_cell_ref("Z3"), Some((25, 3)));
        assert_eq!(parse_cell_ref("AA7"), Some((26, 7)));
        assert_eq!(parse_cell_ref("$C$4"), Some((2, 4)));
        assert_eq!(parse_cell_ref("4C"), None);
        assert_eq!(parse_cell_ref(""), None);
    }

    #[test]
    fn test_cell_range_contains() {
        let range = CellRange::parse("B2:B4").unwrap();
        assert!(range.contains(1, 2));
        assert!(range.contains(1, 4));
        assert!(!range.contains(1, 5));
        assert!(!range.contains(0, 3));

        let single = CellRange::parse("C9").unwrap();
        assert!(single.contains(2, 9));
        assert!(!single.contains(2, 8));
    }

    #[test]
    fn test_serial_to_date_1900_system() {
        assert_eq!(serial_to_date(1.0, false), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(serial_to_date(59.0, false), NaiveDate::from_ymd_opt(1900, 2, 28));
        assert_eq!(serial_to_date(61.0, false), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(serial_to_date(45355.0, false), NaiveDate::from_ymd_opt(2024, 3, 4));
        // time of day is dropped
        assert_eq!(serial_to_date(45355.75, false), NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(serial_to_date(-1.0, false), None);
        assert_eq!(serial_to_date(f64::NAN, false), None);
    }

    #[test]
    fn test_serial_to_date_1904_system() {
        assert_eq!(serial_to_date(0.0, true), NaiveDate::from_ymd_opt(1904, 1, 1));
        assert_eq!(serial_to_date(43893.0, true), NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn test_resolve_part_path() {
        assert_eq!(
            resolve_part_path("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_part_path("xl", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_part_path("xl/worksheets", "../media/image.png"),
            "xl/media/image.png"
        );
    }

    #[test]
    fn test_sheet_rels_part() {
        assert_eq!(
            sheet_rels_part("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn test_shared_strings_rich_text_and_phonetics() {
        let xml = br#"<?xml version="1.0"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <si><t>plain</t></si>
  <si><r><t>rich </t></r><r><t xml:space="preserve">text</t></r></si>
  <si><t>kanji</t><rPh sb="0" eb="1"><t>reading</t></rPh></si>
  <si><t>a &amp; b &#169;</t></si>
  <si/>
</sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["plain", "rich text", "kanji", "a & b ©", ""]);
    }

    #[test]
    fn test_parse_sheet_cell_types() {
        let xml = br#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>
  <row r="1">
    <c r="A1" t="s"><v>0</v></c>
    <c r="B1" t="inlineStr"><is><t>inline</t></is></c>
    <c r="C1"><v>45355</v></c>
    <c r="D1" t="b"><v>1</v></c>
    <c r="E1" t="e"><v>#N/A</v></c>
    <c r="F1" t="d"><v>2024-03-04T00:00:00</v></c>
    <c r="G1" s="3"/>
  </row>
  <row r="3"><c r="B3" t="str"><v>formula text</v></c></row>
</sheetData>
<hyperlinks><hyperlink ref="B1" r:id="rId1"/><hyperlink ref="B3" location="Other!A1"/></hyperlinks>
</worksheet>"#;
        let shared = vec!["shared".to_string()];
        let mut rels = HashMap::new();
        rels.insert(
            "rId1".to_string(),
            Relationship {
                target: "http://a.example".to_string(),
                external: true,
            },
        );

        let sheet = parse_sheet(xml, "sheet", &shared, &rels).unwrap();
        assert_eq!(sheet.rows.len(), 2);

        let first = &sheet.rows[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.cell(0), Some(&CellValue::Text("shared".to_string())));
        assert_eq!(first.cell(1), Some(&CellValue::Text("inline".to_string())));
        assert_eq!(first.cell(2), Some(&CellValue::Number(45355.0)));
        assert_eq!(first.cell(3), Some(&CellValue::Bool(true)));
        assert_eq!(first.cell(4), Some(&CellValue::Error("#N/A".to_string())));
        assert_eq!(
            first.cell(5),
            Some(&CellValue::IsoDate("2024-03-04T00:00:00".to_string()))
        );
        assert_eq!(first.cell(6), None);

        let third = &sheet.rows[1];
        assert_eq!(third.number, 3);
        assert_eq!(third.cell(1), Some(&CellValue::Text("formula text".to_string())));

        assert_eq!(sheet.hyperlink(1, 1), Some("http://a.example"));
        assert_eq!(sheet.hyperlink(1, 3), Some("Other!A1"));
        assert_eq!(sheet.hyperlink(0, 1), None);
    }

    #[test]
    fn test_rows_without_refs_are_numbered_sequentially() {
        let xml = br#"<worksheet><sheetData>
<row><c t="inlineStr"><is><t>a</t></is></c><c t="inlineStr"><is><t>b</t></is></c></row>
<row><c><v>2</v></c></row>
</sheetData></worksheet>"#;
        let sheet = parse_sheet(xml, "sheet", &[], &HashMap::new()).unwrap();
        assert_eq!(sheet.rows[0].number, 1);
        assert_eq!(sheet.rows[0].cell(1), Some(&CellValue::Text("b".to_string())));
        assert_eq!(sheet.rows[1].number, 2);
        assert_eq!(sheet.rows[1].cell(0), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_open_fixture_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.xlsx");
        XlsxFixture::new()
            .text_row(&["Date", "Title", "Location"])
            .row_with_link("March 4, 2024", "Conf A", "City X", "http://a.example")
            .write(&path)
            .unwrap();

        let mut workbook = Workbook::open(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Sheet1"]);

        let sheet = workbook.read_sheet("Sheet1").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].cell(1), Some(&CellValue::Text("Conf A".to_string())));
        assert_eq!(sheet.hyperlink(1, 2), Some("http://a.example"));
        assert!(!sheet.date1904);

        assert!(matches!(
            workbook.read_sheet("Missing"),
            Err(XlsxError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fake.xlsx");
        std::fs::write(&path, "not a workbook").unwrap();
        assert!(matches!(Workbook::open(&path), Err(XlsxError::Zip(_))));
    }
}
