use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for eventsplice operations.
///
/// Every variant is fatal for the conversion it came from: when one is
/// returned, the destination template has not been modified.
#[derive(Error, Debug)]
pub enum SpliceError {
    /// An input path does not exist or is not a readable file
    #[error("File not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The data source could not be decoded as a workbook
    #[error("Unreadable workbook {path}: {reason}")]
    UnreadableFormat { path: PathBuf, reason: String },

    /// The begin marker was found but the end marker never followed it
    #[error("Template {path} has no `{marker}` after the begin marker; nothing was written")]
    MissingEndMarker { path: PathBuf, marker: String },

    /// Reading the template failed part way through the pass
    #[error("Failed to read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temporary output file could not be created or written
    #[error("Failed to write output for {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The final rename over the destination failed
    #[error("Failed to replace {path} (output kept at {temp_path}): {source}")]
    CommitFailure {
        path: PathBuf,
        temp_path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Row loading did not finish within the configured bound
    #[error("Loading rows timed out after {}s", .timeout.as_secs_f64())]
    LoadTimeout { timeout: Duration },

    /// The row loading worker panicked or was cancelled
    #[error("Row loader failed: {0}")]
    Worker(String),

    /// A path picked in interactive mode has the wrong extension
    #[error("Expected a {expected} file, got: {path}")]
    UnsupportedExtension { path: PathBuf, expected: String },

    /// Terminal I/O in interactive mode
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SpliceError>;

/// A single data row that could not be turned into a record.
///
/// This is a recoverable condition: the row is skipped and the conversion
/// carries on with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[error("row {row}: {reason}")]
pub struct MalformedRow {
    /// 1-based row number as shown by spreadsheet applications
    pub row: u32,
    pub reason: String,
}
