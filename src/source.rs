//! Row sources: turning spreadsheet rows into [`Record`]s.
//!
//! A source yields one [`RowOutcome`] per data row. Rows that cannot be
//! turned into a record come back as [`RowOutcome::Skipped`] so a single bad
//! row never stops the rest of the sheet from loading.

use crate::error::{MalformedRow, Result, SpliceError};
use crate::record::Record;
use crate::xlsx::{CellValue, Sheet, SheetRow, Workbook, XlsxError, serial_to_date};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Pattern for date-typed cells, e.g. `March 4, 2024`.
pub const DATE_FORMAT: &str = "%B %-d, %Y";

/// First-column text that marks a header row.
pub const HEADER_LABEL: &str = "date";

/// Sheet read when none is named explicitly.
pub const DEFAULT_SHEET: &str = "Sheet1";

const DATE_COLUMN: u32 = 0;
const TITLE_COLUMN: u32 = 1;
const LOCATION_COLUMN: u32 = 2;

/// Result of extracting one data row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record(Record),
    Skipped(MalformedRow),
}

/// A finite, non-restartable sequence of row outcomes.
///
/// Implementations may decode their input up front; only the conversion of
/// rows into outcomes is guaranteed to happen on demand.
pub trait RowSource {
    /// Next row outcome in source order, `None` once the rows are exhausted.
    fn next_row(&mut self) -> Option<RowOutcome>;
}

/// Every row of a source, split into records and skipped rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRows {
    pub records: Vec<Record>,
    pub skipped: Vec<MalformedRow>,
}

impl LoadedRows {
    /// Drains `source` to the end.
    pub fn drain<S: RowSource + ?Sized>(source: &mut S) -> Self {
        let mut loaded = Self::default();
        while let Some(outcome) = source.next_row() {
            match outcome {
                RowOutcome::Record(record) => loaded.records.push(record),
                RowOutcome::Skipped(skip) => {
                    tracing::warn!(row = skip.row, "skipping row: {}", skip.reason);
                    loaded.skipped.push(skip);
                }
            }
        }
        tracing::debug!(
            records = loaded.records.len(),
            skipped = loaded.skipped.len(),
            "rows loaded"
        );
        loaded
    }
}

/// Rows of one worksheet in an `.xlsx` workbook.
///
/// The whole sheet is decoded into memory by [`XlsxSource::open`]; each
/// [`RowSource::next_row`] call then turns one decoded row into an outcome.
pub struct XlsxSource {
    path: PathBuf,
    sheet: Sheet,
    rows: std::vec::IntoIter<SheetRow>,
}

impl std::fmt::Debug for XlsxSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxSource")
            .field("path", &self.path)
            .field("remaining", &self.rows.len())
            .finish()
    }
}

impl XlsxSource {
    /// Opens `path` and selects the sheet to read.
    ///
    /// With `sheet == None` the `Sheet1` sheet is used, or the first sheet
    /// when the workbook has no sheet of that name. A sheet named explicitly
    /// must exist.
    ///
    /// # Errors
    ///
    /// - `SpliceError::SourceNotFound` if the file does not exist.
    /// - `SpliceError::UnreadableFormat` if it is not a readable workbook or
    ///   the requested sheet is missing.
    pub fn open(path: &Path, sheet: Option<&str>) -> Result<Self> {
        if !path.is_file() {
            return Err(SpliceError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let unreadable = |err: XlsxError| match err {
            XlsxError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                SpliceError::SourceNotFound {
                    path: path.to_path_buf(),
                }
            }
            other => SpliceError::UnreadableFormat {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        };

        let mut workbook = Workbook::open(path).map_err(unreadable)?;
        let (name, mut sheet) = match sheet {
            Some(name) => (name.to_string(), workbook.read_sheet(name).map_err(unreadable)?),
            None if workbook.sheet_names().contains(&DEFAULT_SHEET) => (
                DEFAULT_SHEET.to_string(),
                workbook.read_sheet(DEFAULT_SHEET).map_err(unreadable)?,
            ),
            None => workbook.read_first_sheet().map_err(unreadable)?,
        };

        tracing::debug!(sheet = %name, rows = sheet.rows.len(), "reading {}", path.display());

        let rows = std::mem::take(&mut sheet.rows).into_iter();
        Ok(Self {
            path: path.to_path_buf(),
            sheet,
            rows,
        })
    }

    fn extract(&self, row: &SheetRow) -> Option<RowOutcome> {
        if row.is_blank() {
            tracing::trace!(row = row.number, "blank row");
            return None;
        }

        let malformed = |reason: String| {
            Some(RowOutcome::Skipped(MalformedRow {
                row: row.number,
                reason,
            }))
        };

        let date = match row.cell(DATE_COLUMN) {
            Some(CellValue::Text(text)) if text.eq_ignore_ascii_case(HEADER_LABEL) => {
                tracing::debug!(row = row.number, "skipping header row");
                return None;
            }
            Some(CellValue::Text(text)) => text.clone(),
            Some(CellValue::Number(serial)) => {
                match serial_to_date(*serial, self.sheet.date1904) {
                    Some(date) => format_date(date),
                    None => return malformed(format!("date serial {serial} is out of range")),
                }
            }
            Some(CellValue::IsoDate(iso)) => match parse_iso_date(iso) {
                Some(date) => format_date(date),
                None => return malformed(format!("unparseable date `{iso}`")),
            },
            Some(other) => return malformed(format!("date cell holds {}", describe(other))),
            None => return malformed("missing date cell".to_string()),
        };

        let title = match row.cell(TITLE_COLUMN) {
            Some(CellValue::Text(text)) => text,
            Some(other) => return malformed(format!("title cell holds {}", describe(other))),
            None => return malformed("missing title cell".to_string()),
        };

        let location = match row.cell(LOCATION_COLUMN) {
            Some(CellValue::Text(text)) => text,
            Some(other) => return malformed(format!("location cell holds {}", describe(other))),
            None => return malformed("missing location cell".to_string()),
        };

        let link = self.sheet.hyperlink(TITLE_COLUMN, row.number);
        Some(RowOutcome::Record(Record::new(date, title, location, link)))
    }
}

impl RowSource for XlsxSource {
    fn next_row(&mut self) -> Option<RowOutcome> {
        while let Some(row) = self.rows.next() {
            if let Some(outcome) = self.extract(&row) {
                return Some(outcome);
            }
        }
        None
    }
}

/// Opens the workbook and drains every row of the selected sheet.
///
/// # Errors
///
/// Same as [`XlsxSource::open`]; row-level problems are reported in
/// [`LoadedRows::skipped`] instead.
pub fn load_rows(path: &Path, sheet: Option<&str>) -> Result<LoadedRows> {
    let mut source = XlsxSource::open(path, sheet)?;
    Ok(LoadedRows::drain(&mut source))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn describe(value: &CellValue) -> String {
    match value {
        CellValue::Text(_) => "text".to_string(),
        CellValue::Number(n) => format!("a number ({n})"),
        CellValue::Bool(b) => format!("a boolean ({b})"),
        CellValue::IsoDate(d) => format!("a date ({d})"),
        CellValue::Error(e) => format!("an error value ({e})"),
    }
}
