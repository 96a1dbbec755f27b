//! Integration tests for XLSX export

use chrono::NaiveDate;
use farmcal_core::{ActionType, ActivityRecord, FarmCalendar, GridExporter, LandPrepRecord};
use farmcal_grid::{land_prep_report, CalendarBuilder, CalendarOptions};
use farmcal_render::{ExcelExporter, LandPrepExporter};
use rust_decimal_macros::dec;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Two seasons on three blocks, spanning a 53-week year
fn create_farm_calendar() -> FarmCalendar {
    let records = vec![
        ActivityRecord::new("A1 North", ActionType::Planting, 2020, 3)
            .crop("Rice")
            .color("#4CAF50")
            .area(dec!(2.5)),
        ActivityRecord::new("A1 North", ActionType::Harvesting, 2020, 18)
            .crop("Rice")
            .color("#4CAF50")
            .yield_value(dec!(1250.5)),
        ActivityRecord::new("A1 North", ActionType::Uprooting, 2020, 20)
            .crop("Rice")
            .color("#4CAF50"),
        ActivityRecord::new("B2 South", ActionType::Planting, 2020, 53)
            .crop("Maize")
            .color("#FFEB3B")
            .area(dec!(1)),
        ActivityRecord::new("B2 South", ActionType::Harvesting, 2021, 14)
            .crop("Maize")
            .yield_value(dec!(800)),
        ActivityRecord::new("C3", ActionType::Harvesting, 2021, 14)
            .crop("Beans")
            .yield_value(dec!(75.25)),
    ];

    CalendarBuilder::new(CalendarOptions::default())
        .build(&records, &[2020, 2021])
        .unwrap()
}

#[test]
fn render_farm_calendar_to_excel() {
    let calendar = create_farm_calendar();
    assert_eq!(calendar.column_count(), 105);
    assert_eq!(calendar.total(2021, 14), Some(dec!(875.25)));

    let bytes = ExcelExporter::new().render_to_bytes(&calendar).unwrap();
    assert!(bytes.len() > 1000);
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn export_through_trait() {
    let calendar = create_farm_calendar();
    let exporter: &dyn GridExporter<Output = Vec<u8>> = &ExcelExporter::new().static_values();
    let bytes = exporter.export(&calendar).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn save_with_land_prep_sheet() {
    let calendar = create_farm_calendar();
    let prep = vec![
        LandPrepRecord::new("A1 North", date(2025, 3, 10)).crop("Rice"),
        LandPrepRecord::new("B2 South", date(2025, 3, 4)).crop("Maize").cleared(),
    ];
    let report = land_prep_report(&prep, date(2025, 3, 5));
    assert_eq!(report.rows.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("farm_calendar.xlsx");
    ExcelExporter::new()
        .sheet_name("Season 2020")
        .with_land_prep(report)
        .save(&calendar, &path)
        .unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(&written[0..2], b"PK");
}

#[test]
fn standalone_land_prep_workbook() {
    let prep = vec![LandPrepRecord::new("P1", date(2025, 1, 6)).crop("Okra")];
    let report = land_prep_report(&prep, date(2025, 1, 1));

    let bytes = LandPrepExporter::new().render_to_bytes(&report).unwrap();
    assert_eq!(&bytes[0..2], b"PK");

    // an empty report still produces a workbook with headers
    let empty = land_prep_report(&[], date(2025, 1, 1));
    assert!(LandPrepExporter::new().render_to_bytes(&empty).is_ok());
}

#[test]
fn save_to_missing_directory_is_io_error() {
    let calendar = create_farm_calendar();
    let err = ExcelExporter::new()
        .save(&calendar, "/nonexistent/dir/out.xlsx")
        .unwrap_err();
    assert!(matches!(err, farmcal_core::RenderError::Io(_)));
}
