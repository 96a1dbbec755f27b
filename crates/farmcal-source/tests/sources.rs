//! File-backed source tests

use chrono::NaiveDate;
use farmcal_core::{ActionType, ActivityRecord, LandPrepRecord};
use farmcal_source::{
    open_source, ActivitySource, RetryPolicy, SourceError, SourceOptions, SqliteSource,
};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::TempDir;

fn seeded(dir: &TempDir) -> SqliteSource {
    let source = SqliteSource::open(dir.path().join("farm.db"), RetryPolicy::none()).unwrap();
    source.init_schema().unwrap();

    let rows = [
        (
            ActivityRecord::new("B1", ActionType::Harvesting, 2024, 10).yield_value(dec!(500)),
            true,
        ),
        (
            ActivityRecord::new("A1", ActionType::Planting, 2024, 3)
                .crop("Rice")
                .color("#4CAF50")
                .area(dec!(2.5)),
            true,
        ),
        (
            ActivityRecord::new("B1", ActionType::Planting, 2024, 10).crop("Corn"),
            true,
        ),
        (
            ActivityRecord::new("A1", ActionType::from("NURSERY"), 2024, 1).crop("Rice"),
            true,
        ),
        (
            ActivityRecord::new("A1", ActionType::Uprooting, 2023, 40).crop("Rice"),
            true,
        ),
        (
            ActivityRecord::new("C1", ActionType::Planting, 2024, 5).crop("Yam"),
            false,
        ),
    ];
    for (record, active) in &rows {
        source.insert_activity(record, *active).unwrap();
    }
    source
}

#[test]
fn sqlite_filters_and_orders_like_the_activity_query() {
    let dir = TempDir::new().unwrap();
    let source = seeded(&dir);

    let records = source.fetch_activities().unwrap();
    let keys: Vec<(String, i32, u32, ActionType)> = records
        .iter()
        .map(|r| (r.block_id.clone(), r.year, r.iso_week, r.action_type.clone()))
        .collect();

    // inactive C1 and the nursery row are dropped; B1 keeps insertion order
    assert_eq!(
        keys,
        vec![
            ("A1".into(), 2023, 40, ActionType::Uprooting),
            ("A1".into(), 2024, 3, ActionType::Planting),
            ("B1".into(), 2024, 10, ActionType::Harvesting),
            ("B1".into(), 2024, 10, ActionType::Planting),
        ]
    );
    assert_eq!(records[1].area, Some(dec!(2.5)));
    assert_eq!(records[1].color_code.as_deref(), Some("#4CAF50"));
    assert_eq!(records[2].yield_value, Some(dec!(500)));
}

#[test]
fn sqlite_sums_harvest_lines_of_the_same_week() {
    let dir = TempDir::new().unwrap();
    let source = SqliteSource::open(dir.path().join("harvest.db"), RetryPolicy::none()).unwrap();
    source.init_schema().unwrap();

    let harvest = |value| {
        ActivityRecord::new("B1", ActionType::Harvesting, 2024, 10)
            .crop("Corn")
            .yield_value(value)
    };
    source.insert_activity(&harvest(dec!(500)), true).unwrap();
    source
        .insert_activity(&ActivityRecord::new("A1", ActionType::Planting, 2024, 10).crop("Rice"), true)
        .unwrap();
    source.insert_activity(&harvest(dec!(300)), true).unwrap();
    source.insert_activity(&harvest(dec!(0.25)), true).unwrap();
    source
        .insert_activity(&ActivityRecord::new("B1", ActionType::Harvesting, 2024, 11).crop("Corn"), true)
        .unwrap();

    let records = source.fetch_activities().unwrap();
    let rows: Vec<(String, u32, Option<rust_decimal::Decimal>)> = records
        .iter()
        .map(|r| (r.block_id.clone(), r.iso_week, r.yield_value))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("A1".into(), 10, None),
            ("B1".into(), 10, Some(dec!(800.25))),
            ("B1".into(), 11, None),
        ]
    );
}

#[test]
fn sqlite_options_apply() {
    let dir = TempDir::new().unwrap();
    let source = seeded(&dir).with_options(SourceOptions {
        from_year: Some(2024),
        include_inactive: true,
    });

    let blocks: Vec<String> = source
        .fetch_activities()
        .unwrap()
        .into_iter()
        .map(|r| r.block_id)
        .collect();
    assert_eq!(blocks, vec!["A1", "B1", "B1", "C1"]);
}

#[test]
fn closed_connection_rejects_queries_until_reconnect() {
    let dir = TempDir::new().unwrap();
    let mut source = seeded(&dir);

    source.close().unwrap();
    assert!(!source.is_open());
    assert!(matches!(source.fetch_activities(), Err(SourceError::Closed)));
    assert!(matches!(source.fetch_land_prep(), Err(SourceError::Closed)));
    source.close().unwrap();

    source.reconnect().unwrap();
    assert!(source.is_open());
    assert_eq!(source.fetch_activities().unwrap().len(), 4);
}

#[test]
fn sqlite_land_prep_rows_sorted_by_date() {
    let dir = TempDir::new().unwrap();
    let source = seeded(&dir);
    let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();

    source
        .insert_land_prep(&LandPrepRecord::new("P2", date(3, 20)).crop("Maize"))
        .unwrap();
    source
        .insert_land_prep(&LandPrepRecord::new("P1", date(3, 3)).crop("Beans").cleared())
        .unwrap();

    let rows = source.fetch_land_prep().unwrap();
    assert_eq!(
        rows,
        vec![
            LandPrepRecord::new("P1", date(3, 3)).crop("Beans").cleared(),
            LandPrepRecord::new("P2", date(3, 20)).crop("Maize"),
        ]
    );
}

#[test]
fn not_a_database_fails_after_retries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, b"this is definitely not sqlite, just some text padding it out").unwrap();

    let retry = RetryPolicy {
        attempts: 2,
        initial_backoff: std::time::Duration::from_millis(1),
        max_backoff: std::time::Duration::from_millis(1),
    };
    let err = SqliteSource::open(&path, retry).err().unwrap();
    match err {
        SourceError::Database(message) => assert!(message.contains("2 attempt")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_source_picks_json_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rows.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"[{{"block_name": "A1", "action_type": "PLANTING", "years": 2024, "weeks": 3, "crop": "Rice"}}]"#
    )
    .unwrap();

    let source = open_source(&path, SourceOptions::default()).unwrap();
    let records = source.fetch_activities().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].crop_name(), Some("Rice"));
}

#[test]
fn open_source_picks_sqlite_by_extension() {
    let dir = TempDir::new().unwrap();
    drop(seeded(&dir));

    let source = open_source(&dir.path().join("farm.db"), SourceOptions::default()).unwrap();
    assert_eq!(source.fetch_activities().unwrap().len(), 4);
}
