//! End-to-end tests for the farmcal binary

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Run the binary inside `dir` so no stray `farmcal.toml` is picked up
fn farmcal(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_farmcal"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("FARMCAL_CONFIG")
        .args(args)
        .output()
        .expect("failed to run farmcal")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn calendar_as_json() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &["calendar", input.to_str().unwrap(), "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let calendar: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(calendar["columns"].as_array().unwrap().len(), 52);

    let rows = calendar["rows"].as_array().unwrap();
    let blocks: Vec<&str> = rows.iter().map(|r| r["block_id"].as_str().unwrap()).collect();
    assert_eq!(blocks, vec!["A1", "B2"]);

    assert_eq!(calendar["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(calendar["legend"][0]["crop"], "Rice");
    assert_eq!(calendar["legend"][0]["color"], "#4CAF50");
}

#[test]
fn skipped_records_reported_on_stderr() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &["calendar", input.to_str().unwrap(), "--format", "text"],
    );
    assert!(output.status.success());

    let err = stderr(&output);
    assert!(err.contains("1 record(s) skipped:"));
    assert!(err.contains("record #3 (B2 2024-W60)"));

    let text = stdout(&output);
    assert!(text.starts_with("BLOCKS AREA | 2024"));
    assert!(text.contains("P-R"));
    assert!(text.contains("U-M"));
    assert!(!text.contains("SKIPPED"));
}

#[test]
fn abort_on_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &[
            "calendar",
            input.to_str().unwrap(),
            "--format",
            "json",
            "--abort-on-out-of-range",
        ],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Week 60 of 2024"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn calendar_xlsx_written_to_default_path() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &[
            "calendar",
            input.to_str().unwrap(),
            "--with-land-prep",
            "--as-of",
            "2024-03-05",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("farm_calendar.xlsx"));

    let bytes = std::fs::read(dir.path().join("farm_calendar.xlsx")).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn explicit_years_extend_the_axis() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &[
            "calendar",
            input.to_str().unwrap(),
            "--format",
            "json",
            "--years",
            "2020,2024",
        ],
    );
    assert!(output.status.success());

    let calendar: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(calendar["columns"].as_array().unwrap().len(), 53 + 52);
}

#[test]
fn invalid_year_fails() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &["calendar", input.to_str().unwrap(), "--years=-1"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid year: -1"));
    assert!(!dir.path().join("farm_calendar.xlsx").exists());
}

#[test]
fn config_file_is_read_from_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("farmcal.toml"),
        "[calendar]\ncolor-mode = \"action\"\n\n[export]\noutput = \"season.xlsx\"\n",
    )
    .unwrap();

    let input = fixture("season_2024.json");
    let json = farmcal(
        &dir,
        &["calendar", input.to_str().unwrap(), "--format", "json"],
    );
    assert!(json.status.success());
    let calendar: serde_json::Value = serde_json::from_str(&stdout(&json)).unwrap();
    assert!(calendar["legend"].as_array().unwrap().is_empty());

    let xlsx = farmcal(&dir, &["calendar", input.to_str().unwrap()]);
    assert!(xlsx.status.success());
    assert!(dir.path().join("season.xlsx").exists());
}

#[test]
fn land_prep_summary() {
    let dir = TempDir::new().unwrap();
    let input = fixture("season_2024.json");
    let output = farmcal(
        &dir,
        &["land-prep", input.to_str().unwrap(), "--as-of", "2024-03-05"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("(2 plantings, 1 not cleared)"));

    let bytes = std::fs::read(dir.path().join("land_preparation.xlsx")).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn weeks_of_a_long_year() {
    let dir = TempDir::new().unwrap();
    let output = farmcal(&dir, &["weeks", "2020"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("2020 (53 weeks)\n"));
    assert!(text.contains("  January    1 2 3 4 5\n"));
    assert!(text.contains("53\n"));
}

#[test]
fn missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = farmcal(&dir, &["calendar", "no_such_file.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to open no_such_file.json"));
}

#[test]
fn unsupported_extension_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("records.csv");
    std::fs::write(&input, "block,week\n").unwrap();

    let output = farmcal(&dir, &["calendar", input.to_str().unwrap()]);
    assert!(!output.status.success());
}
