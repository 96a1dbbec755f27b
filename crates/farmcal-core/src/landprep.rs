//! Land preparation status
//!
//! Upcoming plantings and whether their partition has been cleared for
//! planting. The report is built by `farmcal-grid` and exported as its own
//! sheet next to the farm calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One planting event as returned by the land preparation query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandPrepRecord {
    #[serde(alias = "block_name")]
    pub partition: String,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(alias = "start_date")]
    pub planting_date: NaiveDate,
    #[serde(default, deserialize_with = "flag")]
    pub ready_for_planting: bool,
}

impl LandPrepRecord {
    pub fn new(partition: impl Into<String>, planting_date: NaiveDate) -> Self {
        Self {
            partition: partition.into(),
            crop: None,
            planting_date,
            ready_for_planting: false,
        }
    }

    pub fn crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }

    /// Mark the partition as cleared for planting
    pub fn cleared(mut self) -> Self {
        self.ready_for_planting = true;
        self
    }

    pub fn status(&self) -> PrepStatus {
        if self.ready_for_planting {
            PrepStatus::Cleared
        } else {
            PrepStatus::NotCleared
        }
    }
}

/// Clearing status of a partition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrepStatus {
    Cleared,
    NotCleared,
}

impl PrepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrepStatus::Cleared => "Cleared",
            PrepStatus::NotCleared => "Not Cleared",
        }
    }
}

impl fmt::Display for PrepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A display row of the land preparation sheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LandPrepRow {
    pub partition: String,
    pub crop: String,
    pub planting_date: NaiveDate,
    /// e.g. `05 Mar 2025`
    pub planting_date_label: String,
    /// ISO week and ISO year, e.g. `10-2025`
    pub week_year: String,
    pub status: PrepStatus,
}

/// Land preparation rows as of a given day
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LandPrepReport {
    pub as_of: NaiveDate,
    pub rows: Vec<LandPrepRow>,
}

impl LandPrepReport {
    pub fn not_cleared(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == PrepStatus::NotCleared)
            .count()
    }
}

/// Accept `true`/`false` as well as the `1`/`0` the database returns
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        None => false,
    })
}
