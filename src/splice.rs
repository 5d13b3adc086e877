use crate::error::{MalformedRow, Result, SpliceError};
use crate::fragment::FragmentLayout;
use crate::fs_utils::{AtomicWriter, require_file};
use crate::source::{LoadedRows, load_rows};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// Marker opening the region that receives generated events
pub const BEGIN_MARKER: &str = "<!-- Begin Events Body -->";
/// Marker closing the region
pub const END_MARKER: &str = "<!-- End Events Body -->";
/// Upper bound on how long the template pass waits for rows
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// The pair of sentinel substrings delimiting the splice region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub begin: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            begin: BEGIN_MARKER.to_string(),
            end: END_MARKER.to_string(),
        }
    }
}

/// When rows are loaded relative to the template scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Load rows once the begin marker is reached
    Sequential,
    /// Start loading rows on a worker as soon as conversion starts
    #[default]
    Overlapped,
}

/// Configuration for a conversion
#[derive(Debug, Clone)]
pub struct SpliceConfig {
    pub markers: Markers,
    pub schedule: Schedule,
    /// How long to wait for rows once they are needed
    pub load_timeout: Duration,
    /// Worksheet to read; `None` picks `Sheet1` or the first sheet
    pub sheet: Option<String>,
    pub layout: FragmentLayout,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            markers: Markers::default(),
            schedule: Schedule::default(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            sheet: None,
            layout: FragmentLayout::default(),
        }
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub data: PathBuf,
    pub template: PathBuf,
    /// False when the template had no begin marker and was left alone
    pub spliced: bool,
    /// Whether the template file was replaced
    pub committed: bool,
    pub records_written: usize,
    pub skipped: Vec<MalformedRow>,
}

/// What a single pass over a template produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpliceOutcome {
    pub spliced: bool,
    pub records_written: usize,
    pub skipped: Vec<MalformedRow>,
}

/// Destination for spliced output. Only the splicing task writes to it.
pub trait SpliceSink {
    /// Appends raw bytes.
    ///
    /// # Errors
    ///
    /// `SpliceError::WriteFailure` if the bytes cannot be stored.
    fn put(&mut self, bytes: &[u8]) -> Result<()>;
}

impl SpliceSink for AtomicWriter {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        AtomicWriter::put(self, bytes)
    }
}

impl SpliceSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Discards everything; used for dry runs.
#[derive(Debug, Default)]
pub struct NullSink {
    pub bytes: usize,
}

impl SpliceSink for NullSink {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes += bytes.len();
        Ok(())
    }
}

/// Handle to the rows a pass will splice in.
///
/// Joined exactly once, when the begin marker is reached.
#[derive(Debug)]
pub enum RowLoader {
    /// Rows already in memory
    Ready(LoadedRows),
    /// Load from the workbook when first needed
    Deferred { path: PathBuf, sheet: Option<String> },
    /// Loading on a blocking worker
    Running(JoinHandle<Result<LoadedRows>>),
}

impl RowLoader {
    /// Creates the loader for `path` according to `schedule`.
    ///
    /// `Overlapped` must be called from within a Tokio runtime since it
    /// spawns the worker immediately.
    pub fn start(path: &Path, sheet: Option<String>, schedule: Schedule) -> Self {
        match schedule {
            Schedule::Sequential => Self::Deferred {
                path: path.to_path_buf(),
                sheet,
            },
            Schedule::Overlapped => {
                tracing::debug!("loading rows from {} in background", path.display());
                Self::Running(spawn_load(path.to_path_buf(), sheet))
            }
        }
    }

    /// Waits for the rows, giving up after `timeout`.
    ///
    /// A worker that timed out is detached, not stopped.
    ///
    /// # Errors
    ///
    /// - `SpliceError::LoadTimeout` if loading takes longer than `timeout`.
    /// - `SpliceError::Worker` if the worker panicked or was cancelled.
    /// - Any error from opening the workbook.
    pub async fn join(self, timeout: Duration) -> Result<LoadedRows> {
        let handle = match self {
            Self::Ready(rows) => return Ok(rows),
            Self::Deferred { path, sheet } => {
                tracing::debug!("loading rows from {}", path.display());
                spawn_load(path, sheet)
            }
            Self::Running(handle) => handle,
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(join_error)) => Err(SpliceError::Worker(join_error.to_string())),
            Err(_) => Err(SpliceError::LoadTimeout { timeout }),
        }
    }
}

fn spawn_load(path: PathBuf, sheet: Option<String>) -> JoinHandle<Result<LoadedRows>> {
    tokio::task::spawn_blocking(move || load_rows(&path, sheet.as_deref()))
}

/// Position of the pass within the template.
#[derive(Debug)]
enum SpliceState {
    /// Before the begin marker; owns the loader until it is joined
    CopyingPrefix(RowLoader),
    /// Between the markers; template lines are dropped
    Splicing,
    /// After the end marker
    CopyingSuffix,
}

/// Runs one forward pass over `template`, writing the spliced result into
/// `sink`.
///
/// Lines up to and including the begin marker are copied, then one
/// fragment per record, then the end-marker line and everything after it.
/// Line terminators are copied exactly as read. `name` is only used in
/// error messages.
///
/// # Errors
///
/// - `SpliceError::MissingEndMarker` if the begin marker is never closed.
/// - `SpliceError::TemplateRead` if reading the template fails.
/// - Errors from the loader or the sink.
pub async fn splice<R, S>(
    template: R,
    name: &Path,
    loader: RowLoader,
    sink: &mut S,
    config: &SpliceConfig,
) -> Result<SpliceOutcome>
where
    R: AsyncBufRead + Unpin,
    S: SpliceSink + ?Sized,
{
    let begin = config.markers.begin.as_bytes();
    let end = config.markers.end.as_bytes();

    let mut template = template;
    let mut outcome = SpliceOutcome::default();
    let mut state = SpliceState::CopyingPrefix(loader);
    let mut line = Vec::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        let read = template
            .read_until(b'\n', &mut line)
            .await
            .map_err(|source| SpliceError::TemplateRead {
                path: name.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        line_no += 1;

        state = match state {
            SpliceState::CopyingPrefix(loader) => {
                sink.put(&line)?;
                if contains(&line, begin) {
                    tracing::debug!(line = line_no, "begin marker found");
                    let rows = loader.join(config.load_timeout).await?;
                    for record in &rows.records {
                        sink.put(config.layout.format(record).as_bytes())?;
                    }
                    outcome.records_written = rows.records.len();
                    outcome.skipped = rows.skipped;
                    SpliceState::Splicing
                } else {
                    SpliceState::CopyingPrefix(loader)
                }
            }
            SpliceState::Splicing => {
                if contains(&line, end) {
                    tracing::debug!(line = line_no, "end marker found");
                    sink.put(&line)?;
                    SpliceState::CopyingSuffix
                } else {
                    tracing::trace!(line = line_no, "dropping placeholder line");
                    SpliceState::Splicing
                }
            }
            SpliceState::CopyingSuffix => {
                sink.put(&line)?;
                SpliceState::CopyingSuffix
            }
        };
    }

    match state {
        SpliceState::CopyingPrefix(loader) => {
            // rows are not written, but a broken data source still fails
            let rows = loader.join(config.load_timeout).await?;
            tracing::warn!(
                "{} has no `{}`; nothing to splice",
                name.display(),
                config.markers.begin
            );
            outcome.skipped = rows.skipped;
            Ok(outcome)
        }
        SpliceState::Splicing => Err(SpliceError::MissingEndMarker {
            path: name.to_path_buf(),
            marker: config.markers.end.clone(),
        }),
        SpliceState::CopyingSuffix => {
            outcome.spliced = true;
            Ok(outcome)
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Splices the rows of `data` into `template` and atomically replaces
/// `template` with the result.
///
/// The template is only replaced when the whole pass succeeded. A template
/// without a begin marker is left untouched and reported with
/// `spliced == false`.
///
/// # Errors
///
/// Any `SpliceError`; in every error case the template file is unchanged.
/// The data source is always loaded, so an unreadable workbook fails even
/// when the template has no begin marker.
///
/// On `SpliceError::LoadTimeout` the blocking loader cannot be cancelled
/// and keeps running. Dropping the runtime waits for it; callers that must
/// not wait should shut down with `Runtime::shutdown_timeout` or exit.
pub async fn convert(data: &Path, template: &Path, config: &SpliceConfig) -> Result<ConversionReport> {
    run(data, template, config, true).await
}

/// Performs the whole conversion but discards the output.
///
/// # Errors
///
/// Same as [`convert`], minus commit errors.
pub async fn dry_run(data: &Path, template: &Path, config: &SpliceConfig) -> Result<ConversionReport> {
    run(data, template, config, false).await
}

async fn run(
    data: &Path,
    template: &Path,
    config: &SpliceConfig,
    commit: bool,
) -> Result<ConversionReport> {
    require_file(data)?;
    require_file(template)?;

    let loader = RowLoader::start(data, config.sheet.clone(), config.schedule);

    let file = tokio::fs::File::open(template)
        .await
        .map_err(|source| SpliceError::TemplateRead {
            path: template.to_path_buf(),
            source,
        })?;
    let reader = BufReader::new(file);

    let (outcome, committed) = if commit {
        let mut writer = AtomicWriter::create(template)?;
        let outcome = splice(reader, template, loader, &mut writer, config).await?;
        if outcome.spliced {
            writer.commit()?;
            (outcome, true)
        } else {
            // identical output; dropping the writer removes the temp file
            (outcome, false)
        }
    } else {
        let mut sink = NullSink::default();
        let outcome = splice(reader, template, loader, &mut sink, config).await?;
        tracing::debug!(bytes = sink.bytes, "dry run output discarded");
        (outcome, false)
    };

    Ok(ConversionReport {
        data: data.to_path_buf(),
        template: template.to_path_buf(),
        spliced: outcome.spliced,
        committed,
        records_written: outcome.records_written,
        skipped: outcome.skipped,
    })
}
