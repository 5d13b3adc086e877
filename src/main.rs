use clap::{Parser, ValueEnum};
use eventsplice::interactive::prompt_paths;
use eventsplice::{ConversionReport, Result, Schedule, SpliceConfig};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
The HTML page must contain the two marker lines:
  <!-- Begin Events Body -->
  <!-- End Events Body -->
Everything between them is replaced by one block per spreadsheet row.
Columns: A = date, B = title (its hyperlink becomes the link), C = location.
A first row whose date cell reads "Date" is treated as a header.

Examples:
  # Update a page in place
  eventsplice events.xlsx events.html
  # Choose the files interactively
  eventsplice
  # Read another worksheet
  eventsplice events.xlsx events.html --sheet "2025"
  # Check what would be written
  eventsplice events.xlsx events.html --dry-run
  # Summary as JSON for scripting
  eventsplice events.xlsx events.html --report json
"#;

/// Splice spreadsheet event rows into an HTML page.
#[derive(Parser, Debug)]
#[command(
    name = "eventsplice",
    version,
    about = "Splice spreadsheet event rows into an HTML page.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Spreadsheet (.xlsx) followed by the HTML page to update
    #[arg(value_name = "DATA TEMPLATE")]
    inputs: Vec<PathBuf>,

    /// Prompt for the two files instead of taking them as arguments
    #[arg(short, long)]
    gui: bool,

    /// Worksheet to read (defaults to Sheet1, then the first sheet)
    #[arg(long, value_name = "NAME")]
    sheet: Option<String>,

    /// Load rows only once the begin marker is reached
    #[arg(long)]
    sequential: bool,

    /// Seconds to wait for the spreadsheet to load
    #[arg(long, value_name = "SECS", env = "EVENTSPLICE_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Do everything except replacing the page
    #[arg(long)]
    dry_run: bool,

    /// How to print the conversion summary
    #[arg(long, value_enum, default_value = "plain")]
    report: ReportFormat,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ReportFormat {
    /// Human readable summary
    Plain,
    /// JSON output for scripting
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let (data, template) = match (cli.gui, cli.inputs.as_slice()) {
        (false, [data, template]) => (data.clone(), template.clone()),
        (_, []) => match prompt_paths(&mut io::stdin().lock(), &mut io::stderr()) {
            Ok(selection) => (selection.data, selection.template),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("Invalid parameters: expected DATA and TEMPLATE, or none for interactive mode");
            std::process::exit(2);
        }
    };

    let config = SpliceConfig {
        schedule: if cli.sequential {
            Schedule::Sequential
        } else {
            Schedule::Overlapped
        },
        load_timeout: Duration::from_secs(cli.timeout),
        sheet: cli.sheet.clone(),
        ..SpliceConfig::default()
    };

    let result = run(&cli, &data, &template, &config).await;

    // exit right away: a timed out loader may still hold a blocking thread
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: &Cli, data: &Path, template: &Path, config: &SpliceConfig) -> Result<()> {
    tracing::info!("splicing {} into {}", data.display(), template.display());

    let report = if cli.dry_run {
        eventsplice::dry_run(data, template, config).await?
    } else {
        eventsplice::convert(data, template, config).await?
    };

    match cli.report {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
        ReportFormat::Plain if !cli.quiet => print_summary(&report, cli.dry_run),
        ReportFormat::Plain => {}
    }

    Ok(())
}

fn print_summary(report: &ConversionReport, dry_run: bool) {
    if !report.spliced {
        println!(
            "No begin marker in {}; left unchanged",
            report.template.display()
        );
        return;
    }

    let verb = if dry_run { "Would write" } else { "Wrote" };
    println!(
        "{verb} {} event(s) into {}",
        report.records_written,
        report.template.display()
    );
    if !report.skipped.is_empty() {
        println!("Skipped {} row(s):", report.skipped.len());
        for row in &report.skipped {
            println!("  {row}");
        }
    }
}
