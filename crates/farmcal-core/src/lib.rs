//! # farmcal-core
//!
//! Core domain model and traits for the farmcal activity calendar.
//!
//! This crate provides:
//! - Domain types: `ActivityRecord`, `ActionType`, `HexColor`, `TimeColumn`,
//!   `GridCell`, `LegendEntry`, `ColumnTotal`, `FarmCalendar`
//! - Land preparation types (see [`landprep`])
//! - The `GridExporter` trait implemented by output sinks
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use farmcal_core::{ActionType, ActivityRecord};
//!
//! let record = ActivityRecord::new("A1 North", ActionType::Planting, 2024, 3)
//!     .crop("Rice")
//!     .color("#4CAF50");
//!
//! assert_eq!(record.crop.as_deref(), Some("Rice"));
//! assert!(record.action_type.is_rendered());
//! ```

pub mod landprep;

pub use landprep::{LandPrepRecord, LandPrepReport, LandPrepRow, PrepStatus};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Name of a land block (or block partition); the row key of the calendar
pub type BlockId = String;

// ============================================================================
// Action Types
// ============================================================================

/// Category of farm activity
///
/// Only the first three variants produce visible cells. Anything else the
/// query interface hands over is carried as `Other` and rendered empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Planting,
    Uprooting,
    Harvesting,
    Other(String),
}

impl ActionType {
    /// Upper-case wire name (`PLANTING`, `UPROOTING`, ...)
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Planting => "PLANTING",
            ActionType::Uprooting => "UPROOTING",
            ActionType::Harvesting => "HARVESTING",
            ActionType::Other(name) => name,
        }
    }

    /// Whether cells for this action carry a value
    pub fn is_rendered(&self) -> bool {
        !matches!(self, ActionType::Other(_))
    }

    /// Rank used by the action-priority collision policy (higher wins)
    pub fn priority(&self) -> u8 {
        match self {
            ActionType::Harvesting => 3,
            ActionType::Uprooting => 2,
            ActionType::Planting => 1,
            ActionType::Other(_) => 0,
        }
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "PLANTING" => ActionType::Planting,
            "UPROOTING" => ActionType::Uprooting,
            "HARVESTING" => ActionType::Harvesting,
            other => ActionType::Other(other.to_string()),
        }
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        ActionType::from(value.as_str())
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Colors
// ============================================================================

/// 24-bit RGB color, written as `#RRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(u32);

impl HexColor {
    pub const fn new(rgb: u32) -> Self {
        Self(rgb & 0x00FF_FFFF)
    }

    /// Raw `0xRRGGBB` value
    pub const fn rgb(self) -> u32 {
        self.0
    }

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(input.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::new)
            .map_err(|_| ColorParseError(input.to_string()))
    }
}

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Color string that is not a 6-digit hex code
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Invalid hex color: {0:?}")]
pub struct ColorParseError(pub String);

// ============================================================================
// Activity Records
// ============================================================================

/// One activity row as returned by the query interface
///
/// Field aliases accept the raw column names of the activity query
/// (`block_name`, `years`, `weeks`, `total_yeild`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(alias = "block_name")]
    pub block_id: BlockId,
    #[serde(default)]
    pub area: Option<Decimal>,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
    pub action_type: ActionType,
    #[serde(alias = "years")]
    pub year: i32,
    #[serde(alias = "weeks")]
    pub iso_week: u32,
    #[serde(default, alias = "total_yeild")]
    pub yield_value: Option<Decimal>,
}

impl ActivityRecord {
    pub fn new(
        block_id: impl Into<BlockId>,
        action_type: ActionType,
        year: i32,
        iso_week: u32,
    ) -> Self {
        Self {
            block_id: block_id.into(),
            area: None,
            crop: None,
            color_code: None,
            action_type,
            year,
            iso_week,
            yield_value: None,
        }
    }

    /// Set the crop name
    pub fn crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }

    /// Set the crop color code
    pub fn color(mut self, color_code: impl Into<String>) -> Self {
        self.color_code = Some(color_code.into());
        self
    }

    /// Set the block area
    pub fn area(mut self, area: Decimal) -> Self {
        self.area = Some(area);
        self
    }

    /// Set the harvested yield
    pub fn yield_value(mut self, value: Decimal) -> Self {
        self.yield_value = Some(value);
        self
    }

    /// The crop name, if present and not blank
    pub fn crop_name(&self) -> Option<&str> {
        self.crop.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

// ============================================================================
// Time Axis
// ============================================================================

/// One week column of the calendar
///
/// Ordering is `(year, month, iso_week)`, which is column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeColumn {
    pub year: i32,
    /// Calendar month (1-12) the week is grouped under
    pub month: u32,
    pub iso_week: u32,
}

impl TimeColumn {
    pub const fn new(year: i32, month: u32, iso_week: u32) -> Self {
        Self { year, month, iso_week }
    }

    /// Header label, e.g. `Wk 7`
    pub fn label(&self) -> String {
        format!("Wk {}", self.iso_week)
    }
}

/// A merged header region over consecutive time columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSpan {
    pub label: String,
    /// Index of the first covered time column (0-based)
    pub first_column: usize,
    /// Number of covered columns (never 0)
    pub width: usize,
}

impl HeaderSpan {
    pub fn last_column(&self) -> usize {
        self.first_column + self.width - 1
    }
}

/// Three-level header: year spans, month spans, week labels
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLayout {
    pub years: Vec<HeaderSpan>,
    pub months: Vec<HeaderSpan>,
    pub weeks: Vec<String>,
}

// ============================================================================
// Grid
// ============================================================================

/// Value displayed in a cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Empty,
    Text(String),
    Number(Decimal),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) => write!(f, "{}", n.normalize()),
        }
    }
}

/// Font treatment of a cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Plain,
    /// Bold white text on the fill color
    BoldLightOnDark,
}

/// Display value, fill and emphasis of one cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContent {
    pub value: CellValue,
    pub fill: HexColor,
    pub emphasis: Emphasis,
}

impl CellContent {
    pub fn empty(fill: HexColor) -> Self {
        Self {
            value: CellValue::Empty,
            fill,
            emphasis: Emphasis::Plain,
        }
    }
}

/// A rendered cell of the block x week grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub block_id: BlockId,
    pub column: TimeColumn,
    pub value: CellValue,
    pub fill: HexColor,
    pub emphasis: Emphasis,
}

impl GridCell {
    pub fn new(block_id: impl Into<BlockId>, column: TimeColumn, content: CellContent) -> Self {
        Self {
            block_id: block_id.into(),
            column,
            value: content.value,
            fill: content.fill,
            emphasis: content.emphasis,
        }
    }
}

/// One block row: label columns plus one cell per time column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub block_id: BlockId,
    pub area: Option<Decimal>,
    pub cells: Vec<GridCell>,
}

/// Sum of harvested yield in one column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTotal {
    pub column: TimeColumn,
    pub total: Decimal,
}

/// Crop color key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub crop: String,
    pub color: HexColor,
}

/// Action-type key explaining the cell codes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionKeyEntry {
    pub label: String,
    pub description: String,
    pub fill: HexColor,
    pub emphasis: Emphasis,
}

/// A record that did not make it into the grid, and why
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Position of the record in the input sequence
    pub index: usize,
    pub block_id: BlockId,
    pub year: i32,
    pub iso_week: u32,
    #[serde(serialize_with = "serialize_error")]
    pub error: GridError,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record #{} ({} {}-W{:02}): {}",
            self.index, self.block_id, self.year, self.iso_week, self.error
        )
    }
}

/// Logical content of a farm calendar, ready for an exporter
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FarmCalendar {
    pub header: HeaderLayout,
    pub columns: Vec<TimeColumn>,
    pub rows: Vec<GridRow>,
    pub totals: Vec<ColumnTotal>,
    pub legend: Vec<LegendEntry>,
    pub action_key: Vec<ActionKeyEntry>,
    pub skipped: Vec<SkippedRecord>,
}

impl FarmCalendar {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no block rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up the row for a block
    pub fn row(&self, block_id: &str) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.block_id == block_id)
    }

    /// Look up a cell by block and (year, week)
    pub fn cell(&self, block_id: &str, year: i32, iso_week: u32) -> Option<&GridCell> {
        self.row(block_id)?
            .cells
            .iter()
            .find(|c| c.column.year == year && c.column.iso_week == iso_week)
    }

    /// Total for a (year, week) column
    pub fn total(&self, year: i32, iso_week: u32) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|t| t.column.year == year && t.column.iso_week == iso_week)
            .map(|t| t.total)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output sink for an assembled calendar
pub trait GridExporter {
    type Output;

    /// Render the calendar to the output format
    fn export(&self, calendar: &FarmCalendar) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Calendar construction error
///
/// `InvalidYear` is structural and aborts a run. The other two are
/// per-record and normally end up in [`SkippedRecord`]s.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Invalid year: {year}")]
    InvalidYear { year: i32 },

    #[error("Week {week} of {year} is not on the calendar axis (block {block_id})")]
    OutOfRangeWeek {
        block_id: BlockId,
        year: i32,
        week: u32,
    },

    #[error("Empty crop name for block {block_id} in {year}-W{week:02}")]
    EmptyCropName {
        block_id: BlockId,
        year: i32,
        week: u32,
    },
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

fn serialize_error<S: serde::Serializer>(error: &GridError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn action_type_parsing_is_case_insensitive() {
        assert_eq!(ActionType::from("PLANTING"), ActionType::Planting);
        assert_eq!(ActionType::from("uprooting"), ActionType::Uprooting);
        assert_eq!(ActionType::from(" Harvesting "), ActionType::Harvesting);
        assert_eq!(
            ActionType::from("nursery"),
            ActionType::Other("NURSERY".into())
        );
    }

    #[test]
    fn action_type_priority_order() {
        assert!(ActionType::Harvesting.priority() > ActionType::Uprooting.priority());
        assert!(ActionType::Uprooting.priority() > ActionType::Planting.priority());
        assert!(ActionType::Planting.priority() > ActionType::Other("X".into()).priority());
        assert!(!ActionType::Other("SPRAYING".into()).is_rendered());
    }

    #[test]
    fn hex_color_parse_and_display() {
        assert_eq!(HexColor::parse("#4CAF50").unwrap().rgb(), 0x4CAF50);
        assert_eq!(HexColor::parse("ffc107").unwrap().to_string(), "#FFC107");
        assert!(HexColor::parse("#FFF").is_err());
        assert!(HexColor::parse("green").is_err());
        assert!(HexColor::parse("").is_err());
    }

    #[test]
    fn activity_record_from_raw_query_row() {
        let json = r##"{
            "block_name": "B1 East",
            "area": 2.5,
            "crop": "Corn",
            "color_code": "#FFEB3B",
            "action_type": "HARVESTING",
            "years": 2024,
            "weeks": 10,
            "total_yeild": 500
        }"##;

        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.block_id, "B1 East");
        assert_eq!(record.action_type, ActionType::Harvesting);
        assert_eq!(record.year, 2024);
        assert_eq!(record.iso_week, 10);
        assert_eq!(record.yield_value, Some(dec!(500)));
        assert_eq!(record.area, Some(dec!(2.5)));
    }

    #[test]
    fn crop_name_ignores_blank() {
        let record = ActivityRecord::new("A1", ActionType::Planting, 2024, 1).crop("   ");
        assert_eq!(record.crop_name(), None);

        let record = ActivityRecord::new("A1", ActionType::Planting, 2024, 1).crop(" Rice");
        assert_eq!(record.crop_name(), Some("Rice"));
    }

    #[test]
    fn time_columns_sort_in_column_order() {
        let mut columns = vec![
            TimeColumn::new(2025, 1, 2),
            TimeColumn::new(2024, 12, 52),
            TimeColumn::new(2024, 1, 1),
            TimeColumn::new(2025, 1, 1),
        ];
        columns.sort();
        assert_eq!(
            columns,
            vec![
                TimeColumn::new(2024, 1, 1),
                TimeColumn::new(2024, 12, 52),
                TimeColumn::new(2025, 1, 1),
                TimeColumn::new(2025, 1, 2),
            ]
        );
        assert_eq!(columns[1].label(), "Wk 52");
    }

    #[test]
    fn cell_value_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Text("P-R".into()).to_string(), "P-R");
        assert_eq!(CellValue::Number(dec!(500.00)).to_string(), "500");
    }

    #[test]
    fn header_span_last_column() {
        let span = HeaderSpan {
            label: "March".into(),
            first_column: 9,
            width: 4,
        };
        assert_eq!(span.last_column(), 12);
    }

    #[test]
    fn skipped_record_display() {
        let skipped = SkippedRecord {
            index: 4,
            block_id: "C2".into(),
            year: 2024,
            iso_week: 54,
            error: GridError::OutOfRangeWeek {
                block_id: "C2".into(),
                year: 2024,
                week: 54,
            },
        };
        assert_eq!(
            skipped.to_string(),
            "record #4 (C2 2024-W54): Week 54 of 2024 is not on the calendar axis (block C2)"
        );
    }
}
