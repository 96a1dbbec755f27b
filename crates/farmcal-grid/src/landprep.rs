//! Land preparation report
//!
//! Lists plantings from one week before `as_of` onwards, oldest first, with
//! the ISO week they fall in and whether the partition has been cleared.

use chrono::{Datelike, Duration, NaiveDate};
use farmcal_core::{LandPrepRecord, LandPrepReport, LandPrepRow};

/// How far back (in days) plantings are still listed
pub const LOOKBACK_DAYS: i64 = 7;

/// Build the report for `as_of`
pub fn land_prep_report(records: &[LandPrepRecord], as_of: NaiveDate) -> LandPrepReport {
    let cutoff = as_of - Duration::days(LOOKBACK_DAYS);

    let mut selected: Vec<&LandPrepRecord> = records
        .iter()
        .filter(|r| r.planting_date >= cutoff)
        .collect();
    selected.sort_by_key(|r| r.planting_date);

    let rows = selected
        .into_iter()
        .map(|record| {
            let week = record.planting_date.iso_week();
            LandPrepRow {
                partition: record.partition.clone(),
                crop: record.crop.clone().unwrap_or_default(),
                planting_date: record.planting_date,
                planting_date_label: record.planting_date.format("%d %b %Y").to_string(),
                week_year: format!("{}-{}", week.week(), week.year()),
                status: record.status(),
            }
        })
        .collect();

    LandPrepReport { as_of, rows }
}
