use assert_cmd::Command;
use eventsplice::test_utils::XlsxFixture;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TEMPLATE: &str =
    "<p>Intro</p>\n<!-- Begin Events Body -->\n<p>old</p>\n<!-- End Events Body -->\n<p>Outro</p>\n";

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("events.xlsx");
    let page = temp_dir.path().join("events.html");
    XlsxFixture::new()
        .text_row(&["Date", "Title", "Location"])
        .row_with_link("March 4, 2024", "Conf A", "City X", "http://a.example")
        .text_row(&["May 2, 2024", "Meetup", "City Y"])
        .write(&data)
        .unwrap();
    fs::write(&page, TEMPLATE).unwrap();
    (temp_dir, data, page)
}

fn eventsplice() -> Command {
    let mut cmd = Command::cargo_bin("eventsplice").unwrap();
    cmd.env_remove("EVENTSPLICE_TIMEOUT").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_convert_updates_page() {
    let (_dir, data, page) = setup();

    eventsplice()
        .arg(&data)
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 event(s)"));

    let out = fs::read_to_string(&page).unwrap();
    assert!(out.starts_with("<p>Intro</p>\n<!-- Begin Events Body -->\n<div>\n"));
    assert!(out.ends_with("<!-- End Events Body -->\n<p>Outro</p>\n"));
    assert!(out.contains("<a href=\"http://a.example\">Conf A</a>"));
    assert!(out.contains("<br> Location: City Y"));
    assert!(!out.contains("<p>old</p>"));
}

#[test]
fn test_sequential_matches_default() {
    let (_dir_a, data_a, page_a) = setup();
    let (_dir_b, data_b, page_b) = setup();

    eventsplice().arg(&data_a).arg(&page_a).assert().success();
    eventsplice()
        .arg(&data_b)
        .arg(&page_b)
        .arg("--sequential")
        .assert()
        .success();

    assert_eq!(fs::read(&page_a).unwrap(), fs::read(&page_b).unwrap());
}

#[test]
fn test_wrong_argument_count_is_usage_error() {
    let (_dir, data, _page) = setup();

    eventsplice()
        .arg(&data)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid parameters"));
}

#[test]
fn test_missing_data_fails_and_keeps_page() {
    let (dir, _data, page) = setup();

    eventsplice()
        .arg(dir.path().join("missing.xlsx"))
        .arg(&page)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));

    assert_eq!(fs::read_to_string(&page).unwrap(), TEMPLATE);
}

#[test]
fn test_missing_end_marker_fails_and_keeps_page() {
    let (_dir, data, page) = setup();
    let broken = "<!-- Begin Events Body -->\n<p>no end</p>\n";
    fs::write(&page, broken).unwrap();

    eventsplice()
        .arg(&data)
        .arg(&page)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("End Events Body"));

    assert_eq!(fs::read_to_string(&page).unwrap(), broken);
}

#[test]
fn test_dry_run_json_report() {
    let (_dir, data, page) = setup();

    let output = eventsplice()
        .arg(&data)
        .arg(&page)
        .args(["--dry-run", "--report", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["records_written"], 2);
    assert_eq!(report["spliced"], true);
    assert_eq!(report["committed"], false);
    assert_eq!(fs::read_to_string(&page).unwrap(), TEMPLATE);
}

#[test]
fn test_interactive_mode_reads_paths_from_stdin() {
    let (_dir, data, page) = setup();

    eventsplice()
        .write_stdin(format!("{}\n{}\n", data.display(), page.display()))
        .assert()
        .success();

    assert!(fs::read_to_string(&page).unwrap().contains("Conf A"));
}

#[test]
fn test_interactive_mode_rejects_wrong_extension() {
    let (dir, data, _page) = setup();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, TEMPLATE).unwrap();

    eventsplice()
        .arg("--gui")
        .write_stdin(format!("{}\n{}\n", data.display(), notes.display()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected a HTML (.html) file"));

    assert_eq!(fs::read_to_string(&notes).unwrap(), TEMPLATE);
}
