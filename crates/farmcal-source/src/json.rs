//! JSON record files
//!
//! Accepts either a full document
//!
//! ```json
//! { "activities": [ ... ], "land_prep": [ ... ] }
//! ```
//!
//! or a bare array of activity rows. Rows may use the raw column names of
//! the activity query (`block_name`, `years`, `weeks`, `total_yeild`).

use crate::{ActivitySource, SourceError, SourceOptions};
use farmcal_core::{ActivityRecord, LandPrepRecord};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Rows(Vec<ActivityRecord>),
    Full {
        #[serde(default)]
        activities: Vec<ActivityRecord>,
        #[serde(default)]
        land_prep: Vec<LandPrepRecord>,
    },
}

/// Records loaded from a JSON document, returned in file order
#[derive(Clone, Debug, Default)]
pub struct JsonSource {
    activities: Vec<ActivityRecord>,
    land_prep: Vec<LandPrepRecord>,
    options: SourceOptions,
}

impl JsonSource {
    /// Read and parse a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let source = Self::parse(&text)?;
        debug!(
            path = %path.display(),
            activities = source.activities.len(),
            land_prep = source.land_prep.len(),
            "json source loaded"
        );
        Ok(source)
    }

    /// Parse a JSON document
    pub fn parse(text: &str) -> Result<Self, SourceError> {
        let (activities, land_prep) = match serde_json::from_str(text)? {
            Document::Rows(rows) => (rows, Vec::new()),
            Document::Full {
                activities,
                land_prep,
            } => (activities, land_prep),
        };
        Ok(Self {
            activities,
            land_prep,
            options: SourceOptions::default(),
        })
    }

    pub fn with_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }
}

impl ActivitySource for JsonSource {
    fn fetch_activities(&self) -> Result<Vec<ActivityRecord>, SourceError> {
        let from_year = self.options.from_year;
        Ok(self
            .activities
            .iter()
            .filter(|r| from_year.map_or(true, |y| r.year >= y))
            .cloned()
            .collect())
    }

    fn fetch_land_prep(&self) -> Result<Vec<LandPrepRecord>, SourceError> {
        Ok(self.land_prep.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmcal_core::ActionType;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn bare_array_of_raw_rows() {
        let source = JsonSource::parse(
            r##"[
                {"block_name": "A1 North", "area": 2.5, "crop": "Rice",
                 "color_code": "#4CAF50", "action_type": "PLANTING",
                 "years": 2024, "weeks": 3},
                {"block_name": "A1 North", "action_type": "HARVESTING",
                 "years": 2024, "weeks": 20, "total_yeild": "1250.5"}
            ]"##,
        )
        .unwrap();

        let records = source.fetch_activities().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].block_id, "A1 North");
        assert_eq!(records[0].area, Some(dec!(2.5)));
        assert_eq!(records[1].action_type, ActionType::Harvesting);
        assert_eq!(records[1].yield_value, Some(dec!(1250.5)));
        assert!(source.fetch_land_prep().unwrap().is_empty());
    }

    #[test]
    fn full_document() {
        let source = JsonSource::parse(
            r#"{
                "activities": [
                    {"block_id": "B1", "action_type": "planting", "year": 2025,
                     "iso_week": 10, "crop": "Corn"}
                ],
                "land_prep": [
                    {"partition": "B1", "crop": "Corn", "planting_date": "2025-03-03",
                     "ready_for_planting": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(source.fetch_activities().unwrap()[0].iso_week, 10);
        let prep = source.fetch_land_prep().unwrap();
        assert_eq!(prep.len(), 1);
        assert!(prep[0].ready_for_planting);
    }

    #[test]
    fn from_year_filters_activities_in_order() {
        let source = JsonSource::parse(
            r#"[
                {"block_id": "A", "action_type": "PLANTING", "year": 2023, "iso_week": 1, "crop": "Rice"},
                {"block_id": "B", "action_type": "PLANTING", "year": 2025, "iso_week": 1, "crop": "Rice"},
                {"block_id": "C", "action_type": "PLANTING", "year": 2024, "iso_week": 1, "crop": "Rice"}
            ]"#,
        )
        .unwrap()
        .with_options(SourceOptions {
            from_year: Some(2024),
            ..SourceOptions::default()
        });

        let blocks: Vec<String> = source
            .fetch_activities()
            .unwrap()
            .into_iter()
            .map(|r| r.block_id)
            .collect();
        assert_eq!(blocks, vec!["B", "C"]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            JsonSource::parse("{\"activities\": [{\"block_id\": 1}]}"),
            Err(SourceError::Json(_))
        ));
    }
}
