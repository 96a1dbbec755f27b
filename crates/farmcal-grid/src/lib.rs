//! # farmcal-grid
//!
//! Builds the farm calendar grid from activity records.
//!
//! This crate provides:
//! - ISO-8601 time axis construction (52/53-week years, month grouping)
//! - Assembly of records into `(block, year, week)` slots
//! - Cell rendering (display value, fill color, emphasis)
//! - Crop legend and per-column harvest totals
//! - The land preparation report
//!
//! ## Example
//!
//! ```rust
//! use farmcal_core::{ActionType, ActivityRecord, CellValue};
//! use farmcal_grid::{CalendarBuilder, CalendarOptions};
//!
//! let records = vec![
//!     ActivityRecord::new("A1", ActionType::Planting, 2024, 3).crop("Rice"),
//! ];
//!
//! let calendar = CalendarBuilder::new(CalendarOptions::default())
//!     .build(&records, &[2024])
//!     .unwrap();
//!
//! let cell = calendar.cell("A1", 2024, 3).unwrap();
//! assert_eq!(cell.value, CellValue::Text("P-R".into()));
//! assert_eq!(calendar.columns.len(), 52);
//! ```

pub mod assemble;
pub mod axis;
pub mod cell;
pub mod landprep;
pub mod legend;
pub mod totals;

pub use assemble::{Assembly, CollisionPolicy, GridAssembler, OutOfRangePolicy, SlotKey};
pub use axis::{TimeAxis, TimeAxisBuilder};
pub use cell::{CellRenderer, ColorMode, Palette};
pub use landprep::land_prep_report;
pub use legend::LegendBuilder;
pub use totals::TotalsComputer;

use farmcal_core::{ActivityRecord, FarmCalendar, GridCell, GridError, GridRow, SkippedRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Calendar construction options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CalendarOptions {
    pub color_mode: ColorMode,
    pub out_of_range: OutOfRangePolicy,
    pub collision: CollisionPolicy,
    pub palette: Palette,
}

/// Runs the whole pipeline: axis, assembly, cells, totals, legend
#[derive(Clone, Debug, Default)]
pub struct CalendarBuilder {
    pub options: CalendarOptions,
    pub axis: TimeAxisBuilder,
}

impl CalendarBuilder {
    pub fn new(options: CalendarOptions) -> Self {
        Self {
            options,
            axis: TimeAxisBuilder::default(),
        }
    }

    /// Use a custom axis builder (e.g. a narrower year range)
    pub fn axis_builder(mut self, axis: TimeAxisBuilder) -> Self {
        self.axis = axis;
        self
    }

    /// Build the calendar for the years the records mention
    pub fn build_for_records(&self, records: &[ActivityRecord]) -> Result<FarmCalendar, GridError> {
        self.build(records, &years_of(records))
    }

    /// Build the calendar for `years`
    ///
    /// Fails on an invalid year, or on an out-of-range record under
    /// [`OutOfRangePolicy::Abort`]. Every other per-record problem is
    /// reported in [`FarmCalendar::skipped`].
    pub fn build(&self, records: &[ActivityRecord], years: &[i32]) -> Result<FarmCalendar, GridError> {
        let options = &self.options;
        let axis = self.axis.build(years.iter().copied())?;
        debug!(years = ?years, columns = axis.len(), "time axis built");

        let assembly = GridAssembler::new()
            .out_of_range(options.out_of_range)
            .collision(options.collision)
            .assemble(records, &axis)?;

        let renderer = CellRenderer::new(options.palette, options.color_mode);
        let mut skipped: Vec<SkippedRecord> = assembly.skipped().to_vec();

        let rows = assembly
            .blocks()
            .iter()
            .map(|block| {
                let cells = axis
                    .columns()
                    .iter()
                    .map(|&column| {
                        let resolved = assembly.get(&block.block_id, column.year, column.iso_week);
                        let content = match renderer.render(resolved.map(|r| r.record)) {
                            Ok(content) => content,
                            Err(error) => {
                                // only a resolved record can fail to render
                                if let Some(r) = resolved {
                                    warn!(index = r.index, %error, "skipping record");
                                    skipped.push(SkippedRecord {
                                        index: r.index,
                                        block_id: block.block_id.clone(),
                                        year: column.year,
                                        iso_week: column.iso_week,
                                        error,
                                    });
                                }
                                renderer.empty()
                            }
                        };
                        GridCell::new(block.block_id.clone(), column, content)
                    })
                    .collect();
                GridRow {
                    block_id: block.block_id.clone(),
                    area: block.area,
                    cells,
                }
            })
            .collect();

        skipped.sort_by_key(|s| s.index);

        let legend = match options.color_mode {
            ColorMode::Crop => LegendBuilder::new(options.palette.empty).build(records),
            ColorMode::Action => Vec::new(),
        };

        Ok(FarmCalendar {
            header: axis.header(),
            columns: axis.columns().to_vec(),
            rows,
            totals: TotalsComputer::compute(&axis, &assembly),
            legend,
            action_key: LegendBuilder::action_key(&options.palette),
            skipped,
        })
    }
}

/// Distinct years mentioned by the records, ascending
pub fn years_of(records: &[ActivityRecord]) -> Vec<i32> {
    records
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
