//! # eventsplice
//!
//! Regenerates the events section of a static HTML page from a spreadsheet.
//! Every data row (date, title, location, optional title hyperlink) becomes
//! one HTML block, spliced between two comment markers in the page:
//!
//! ```html
//! <!-- Begin Events Body -->
//! ...generated blocks...
//! <!-- End Events Body -->
//! ```
//!
//! Everything outside the markers is copied byte for byte, and the page is
//! only replaced once the whole pass succeeded.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use eventsplice::{SpliceConfig, convert};
//! use std::path::Path;
//!
//! # async fn run() -> eventsplice::Result<()> {
//! let report = convert(
//!     Path::new("events.xlsx"),
//!     Path::new("events.html"),
//!     &SpliceConfig::default(),
//! )
//! .await?;
//! println!("{} events written", report.records_written);
//! # Ok(())
//! # }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Splice rows into a page
//! eventsplice events.xlsx events.html
//!
//! # Pick the files interactively
//! eventsplice
//! ```

pub mod error;
pub mod fragment;
pub mod fs_utils;
pub mod interactive;
pub mod record;
pub mod source;
pub mod splice;
pub mod xlsx;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types and functions for convenience
pub use error::{MalformedRow, Result, SpliceError};
pub use fragment::FragmentLayout;
pub use record::Record;
pub use source::{LoadedRows, RowSource, XlsxSource, load_rows};
pub use splice::{
    ConversionReport, Markers, RowLoader, Schedule, SpliceConfig, SpliceOutcome, SpliceSink,
    convert, dry_run, splice,
};
