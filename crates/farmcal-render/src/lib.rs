//! # farmcal-render
//!
//! Export sinks for assembled farm calendars.
//!
//! This crate provides:
//! - XLSX workbooks (merged year/month header, frozen panes, totals, legend)
//! - A standalone land preparation workbook
//! - Fixed-width text preview for the terminal
//!
//! ## Example
//!
//! ```rust,ignore
//! use farmcal_core::GridExporter;
//! use farmcal_render::{ExcelExporter, TextRenderer};
//!
//! let xlsx_bytes = ExcelExporter::new().export(&calendar)?;
//! std::fs::write("farm_calendar.xlsx", xlsx_bytes)?;
//!
//! println!("{}", TextRenderer::new().render(&calendar));
//! ```

pub mod excel;
pub mod text;

pub use excel::{ExcelExporter, LandPrepExporter};
pub use text::TextRenderer;
