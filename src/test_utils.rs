//! Fixture helpers shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for the integration tests under `tests/`.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses the given level, or `RUST_LOG` when no level is passed. With neither,
/// logging stays off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// A cell as written into a fixture workbook.
#[derive(Debug, Clone)]
pub enum FixtureCell {
    /// Shared string cell
    Text(String),
    /// Shared string cell carrying an external hyperlink
    Linked(String, String),
    /// Numeric cell, e.g. a serial date
    Number(f64),
    Bool(bool),
    /// Error cell such as `#REF!`
    Error(String),
    /// No `<c>` element at all
    Blank,
}

impl From<&str> for FixtureCell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for FixtureCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Builds small `.xlsx` workbooks for tests.
#[derive(Debug, Clone)]
pub struct XlsxFixture {
    sheet_name: String,
    extra_sheets: Vec<String>,
    date1904: bool,
    rows: Vec<Vec<FixtureCell>>,
}

impl Default for XlsxFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxFixture {
    pub fn new() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            extra_sheets: Vec::new(),
            date1904: false,
            rows: Vec::new(),
        }
    }

    /// Names the data sheet.
    pub fn sheet_name(mut self, name: &str) -> Self {
        self.sheet_name = name.to_string();
        self
    }

    /// Adds an empty sheet placed before the data sheet.
    pub fn leading_sheet(mut self, name: &str) -> Self {
        self.extra_sheets.push(name.to_string());
        self
    }

    pub fn date1904(mut self, enabled: bool) -> Self {
        self.date1904 = enabled;
        self
    }

    pub fn row(mut self, cells: Vec<FixtureCell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn text_row(self, cells: &[&str]) -> Self {
        self.row(cells.iter().map(|c| FixtureCell::from(*c)).collect())
    }

    /// Adds a date/title/location row whose title links to `link`.
    pub fn row_with_link(self, date: &str, title: &str, location: &str, link: &str) -> Self {
        self.row(vec![
            date.into(),
            FixtureCell::Linked(title.to_string(), link.to_string()),
            location.into(),
        ])
    }

    /// Writes the workbook to `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying zip error if the archive cannot be written.
    pub fn write(&self, path: &Path) -> zip::result::ZipResult<()> {
        let mut shared: Vec<String> = Vec::new();
        let mut links: Vec<(String, String)> = Vec::new();
        let mut sheet_data = String::new();

        for (index, cells) in self.rows.iter().enumerate() {
            let row_number = index + 1;
            let _ = write!(sheet_data, r#"<row r="{row_number}">"#);
            for (col, cell) in cells.iter().enumerate() {
                let reference = format!("{}{row_number}", column_letter(col));
                match cell {
                    FixtureCell::Text(text) => {
                        let idx = intern(&mut shared, text);
                        let _ = write!(sheet_data, r#"<c r="{reference}" t="s"><v>{idx}</v></c>"#);
                    }
                    FixtureCell::Linked(text, target) => {
                        let idx = intern(&mut shared, text);
                        let _ = write!(sheet_data, r#"<c r="{reference}" t="s"><v>{idx}</v></c>"#);
                        links.push((reference, target.clone()));
                    }
                    FixtureCell::Number(value) => {
                        let _ = write!(sheet_data, r#"<c r="{reference}" s="1"><v>{value}</v></c>"#);
                    }
                    FixtureCell::Bool(value) => {
                        let flag = u8::from(*value);
                        let _ = write!(sheet_data, r#"<c r="{reference}" t="b"><v>{flag}</v></c>"#);
                    }
                    FixtureCell::Error(value) => {
                        let _ = write!(
                            sheet_data,
                            r#"<c r="{reference}" t="e"><v>{}</v></c>"#,
                            escape(value)
                        );
                    }
                    FixtureCell::Blank => {}
                }
            }
            sheet_data.push_str("</row>");
        }

        let mut hyperlinks = String::new();
        let mut sheet_rels = String::new();
        if !links.is_empty() {
            hyperlinks.push_str("<hyperlinks>");
            for (i, (reference, target)) in links.iter().enumerate() {
                let id = i + 1;
                let _ = write!(hyperlinks, r#"<hyperlink ref="{reference}" r:id="rId{id}"/>"#);
                let _ = write!(
                    sheet_rels,
                    r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
                    escape(target)
                );
            }
            hyperlinks.push_str("</hyperlinks>");
        }

        let mut sheets_xml = String::new();
        let mut workbook_rels = String::new();
        let all_sheets = self
            .extra_sheets
            .iter()
            .chain(std::iter::once(&self.sheet_name))
            .collect::<Vec<_>>();
        for (i, name) in all_sheets.iter().enumerate() {
            let id = i + 1;
            let _ = write!(
                sheets_xml,
                r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
                escape(name)
            );
            let _ = write!(
                workbook_rels,
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            );
        }
        let shared_id = all_sheets.len() + 1;
        let _ = write!(
            workbook_rels,
            r#"<Relationship Id="rId{shared_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#
        );

        let date1904 = if self.date1904 {
            r#"<workbookPr date1904="1"/>"#
        } else {
            "<workbookPr/>"
        };

        let mut sst = String::new();
        for text in &shared {
            let _ = write!(sst, r#"<si><t xml:space="preserve">{}</t></si>"#, escape(text));
        }

        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);

        let mut put = |name: &str, body: String| -> zip::result::ZipResult<()> {
            zip.start_file(name, SimpleFileOptions::default())?;
            zip.write_all(body.as_bytes())?;
            Ok(())
        };

        put("[Content_Types].xml", CONTENT_TYPES.to_string())?;
        put("_rels/.rels", ROOT_RELS.to_string())?;
        put(
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{date1904}<sheets>{sheets_xml}</sheets></workbook>"#
            ),
        )?;
        put(
            "xl/_rels/workbook.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG_REL_NS}">{workbook_rels}</Relationships>"#),
        )?;
        put(
            "xl/sharedStrings.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{sst}</sst>"#,
                n = shared.len()
            ),
        )?;

        let data_sheet = all_sheets.len();
        for id in 1..=data_sheet {
            let body = if id == data_sheet {
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheetData>{sheet_data}</sheetData>{hyperlinks}</worksheet>"#
                )
            } else {
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData/></worksheet>"#)
            };
            put(&format!("xl/worksheets/sheet{id}.xml"), body)?;
        }
        if !sheet_rels.is_empty() {
            put(
                &format!("xl/worksheets/_rels/sheet{data_sheet}.xml.rels"),
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG_REL_NS}">{sheet_rels}</Relationships>"#),
            )?;
        }

        zip.finish()?;
        Ok(())
    }
}

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn intern(shared: &mut Vec<String>, text: &str) -> usize {
    if let Some(pos) = shared.iter().position(|s| s == text) {
        return pos;
    }
    shared.push(text.to_string());
    shared.len() - 1
}

fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
