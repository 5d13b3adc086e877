//! Terminal prompts used when no paths are given on the command line.

use crate::error::{Result, SpliceError};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx"];
const TEMPLATE_EXTENSIONS: &[&str] = &["html", "htm"];

/// The two paths picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub data: PathBuf,
    pub template: PathBuf,
}

/// Asks for the workbook and then the template on `input`, echoing prompts
/// to `output`.
///
/// Surrounding whitespace and quotes are trimmed from each answer, so paths
/// pasted from a file manager work as-is.
///
/// # Errors
///
/// - `SpliceError::UnsupportedExtension` if a path has the wrong extension.
/// - `SpliceError::Io` on terminal errors, or if input ends before both
///   paths were read.
pub fn prompt_paths<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Selection> {
    let data = ask(input, output, "Spreadsheet with events (.xlsx): ")?;
    check_extension(&data, WORKBOOK_EXTENSIONS, "spreadsheet (.xlsx)")?;

    let template = ask(input, output, "HTML page to update (.html): ")?;
    check_extension(&template, TEMPLATE_EXTENSIONS, "HTML (.html)")?;

    Ok(Selection { data, template })
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<PathBuf> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SpliceError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "no path entered",
        )));
    }

    let answer = line.trim().trim_matches(|c| c == '"' || c == '\'');
    Ok(PathBuf::from(answer))
}

/// Checks `path` against a list of allowed extensions, ignoring case.
///
/// # Errors
///
/// `SpliceError::UnsupportedExtension` when nothing matches.
pub fn check_extension(path: &Path, allowed: &[&str], expected: &str) -> Result<()> {
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)));

    if matches {
        Ok(())
    } else {
        Err(SpliceError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: expected.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("a.xlsx"), WORKBOOK_EXTENSIONS, "x").is_ok());
        assert!(check_extension(Path::new("A.XLSX"), WORKBOOK_EXTENSIONS, "x").is_ok());
        assert!(check_extension(Path::new("page.htm"), TEMPLATE_EXTENSIONS, "x").is_ok());
        assert!(check_extension(Path::new("page.Html"), TEMPLATE_EXTENSIONS, "x").is_ok());

        for bad in ["a.xls", "a", "a.xlsx.bak", ".xlsx"] {
            assert!(
                matches!(
                    check_extension(Path::new(bad), WORKBOOK_EXTENSIONS, "x"),
                    Err(SpliceError::UnsupportedExtension { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_prompt_paths() {
        let mut input = Cursor::new("  /tmp/events.xlsx \n\"/tmp/my page.html\"\n");
        let mut output = Vec::new();

        let selection = prompt_paths(&mut input, &mut output).unwrap();
        assert_eq!(selection.data, PathBuf::from("/tmp/events.xlsx"));
        assert_eq!(selection.template, PathBuf::from("/tmp/my page.html"));

        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.contains(".xlsx"));
        assert!(prompts.contains(".html"));
    }

    #[test]
    fn test_prompt_rejects_wrong_template() {
        let mut input = Cursor::new("events.xlsx\nnotes.txt\n");
        let err = prompt_paths(&mut input, &mut Vec::new()).unwrap_err();
        match err {
            SpliceError::UnsupportedExtension { path, .. } => {
                assert_eq!(path, PathBuf::from("notes.txt"));
            }
            other => panic!("expected UnsupportedExtension, got {other:?}"),
        }
    }

    #[test]
    fn test_prompt_stops_at_end_of_input() {
        let mut input = Cursor::new("events.xlsx\n");
        let err = prompt_paths(&mut input, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, SpliceError::Io(_)));
    }
}
