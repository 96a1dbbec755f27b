//! XLSX export
//!
//! Writes the farm calendar as a workbook:
//! - Farm Activities: block x ISO-week grid with a three-row header
//! - Land Preparation (optional): upcoming plantings and clearing status
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Farm Activities
//! |        |      |                2024                 |
//! | BLOCKS | AREA |   January         |   February  ... |
//! |        |      | Wk 1 | Wk 2 | ... | Wk 6 | ...      |
//! |--------|------|------|------|-----|------|----------|
//! | A1     | 2.5  |      | P-R  |     |      |          |
//! | B1     |      |      |      |     | 500  |          |
//! | Total         | =SUM | =SUM | ... | =SUM |          |
//!
//! LEGEND
//! | Planting   | P-{Crop Initial} |
//! | Uprooting  | U-{Crop Initial} |
//! | Harvesting | Yield Value      |
//! | Empty Week | No Activity      |
//!
//! CROPS
//! | Rice | #4CAF50 |
//! ```
//!
//! Panes are frozen below the header and right of the BLOCKS/AREA columns.

use std::collections::HashMap;
use std::path::Path;

use farmcal_core::{
    CellValue, Emphasis, FarmCalendar, GridExporter, HexColor, LandPrepReport, PrepStatus,
    RenderError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

/// Rows taken by the year / month / week header
pub const HEADER_ROWS: u32 = 3;
/// Columns taken by BLOCKS and AREA
pub const LABEL_COLUMNS: u16 = 2;
/// Column limit of an XLSX worksheet
const MAX_COLUMNS: usize = 16_384;

pub const LAND_PREP_SHEET: &str = "Land Preparation";
const LAND_PREP_HEADERS: [&str; 5] = [
    "Partition",
    "Crop",
    "Planting Date",
    "Planting Wk-Year",
    "Status",
];

/// XLSX exporter for farm calendars
#[derive(Clone, Debug)]
pub struct ExcelExporter {
    /// Name of the calendar sheet
    pub sheet_name: String,
    /// Write `=SUM(..)` formulas in the total row instead of computed values
    pub use_formulas: bool,
    /// Size columns to their longest value
    pub auto_fit: bool,
    land_prep: Option<LandPrepReport>,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self {
            sheet_name: "Farm Activities".into(),
            use_formulas: true,
            auto_fit: true,
            land_prep: None,
        }
    }
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the calendar sheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Use static totals instead of formulas
    pub fn static_values(mut self) -> Self {
        self.use_formulas = false;
        self
    }

    /// Keep default column widths
    pub fn no_auto_fit(mut self) -> Self {
        self.auto_fit = false;
        self
    }

    /// Add a Land Preparation sheet after the calendar
    pub fn with_land_prep(mut self, report: LandPrepReport) -> Self {
        self.land_prep = Some(report);
        self
    }

    /// Generate workbook bytes
    pub fn render_to_bytes(&self, calendar: &FarmCalendar) -> Result<Vec<u8>, RenderError> {
        let column_count = usize::from(LABEL_COLUMNS) + calendar.column_count();
        if column_count > MAX_COLUMNS {
            return Err(RenderError::InvalidData(format!(
                "{} week columns exceed the worksheet limit of {MAX_COLUMNS} columns",
                calendar.column_count()
            )));
        }

        let mut workbook = Workbook::new();
        let mut formats = ExcelFormats::new();

        self.add_calendar_sheet(&mut workbook, calendar, &mut formats)?;
        if let Some(report) = &self.land_prep {
            add_land_prep_sheet(&mut workbook, report, &formats, self.auto_fit)?;
        }

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;

        debug!(
            rows = calendar.rows.len(),
            columns = calendar.column_count(),
            bytes = buffer.len(),
            "workbook rendered"
        );
        Ok(buffer)
    }

    /// Render and write the workbook to `path`
    pub fn save(&self, calendar: &FarmCalendar, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let bytes = self.render_to_bytes(calendar)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn add_calendar_sheet(
        &self,
        workbook: &mut Workbook,
        calendar: &FarmCalendar,
        formats: &mut ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name).map_err(xlsx)?;

        let mut widths = ColumnWidths::default();

        write_header(sheet, calendar, formats, &mut widths)?;
        sheet.set_freeze_panes(HEADER_ROWS, LABEL_COLUMNS).map_err(xlsx)?;

        // Block rows
        let mut row = HEADER_ROWS;
        for grid_row in &calendar.rows {
            sheet
                .write_string_with_format(row, 0, &grid_row.block_id, &formats.text)
                .map_err(xlsx)?;
            widths.note(0, &grid_row.block_id);

            match grid_row.area {
                Some(area) => {
                    sheet
                        .write_number_with_format(row, 1, number(area)?, &formats.number)
                        .map_err(xlsx)?;
                    widths.note(1, &area.normalize().to_string());
                }
                None => {
                    sheet.write_blank(row, 1, &formats.text).map_err(xlsx)?;
                }
            }

            for (index, cell) in grid_row.cells.iter().enumerate() {
                let col = time_column(index);
                let format = formats.cell(cell.fill, cell.emphasis);
                match &cell.value {
                    CellValue::Empty => sheet.write_blank(row, col, format),
                    CellValue::Text(text) => sheet.write_string_with_format(row, col, text, format),
                    CellValue::Number(value) => {
                        sheet.write_number_with_format(row, col, number(*value)?, format)
                    }
                }
                .map_err(xlsx)?;
                widths.note(col, &cell.value.to_string());
            }

            row += 1;
        }

        self.write_totals(sheet, calendar, row, formats, &mut widths)?;

        let legend_row = row + 2;
        write_legend(sheet, calendar, legend_row, formats, &mut widths)?;

        if self.auto_fit {
            widths.apply(sheet)?;
        }

        Ok(())
    }

    /// Total row: label merged over BLOCKS/AREA, one value per week column
    fn write_totals(
        &self,
        sheet: &mut Worksheet,
        calendar: &FarmCalendar,
        row: u32,
        formats: &ExcelFormats,
        widths: &mut ColumnWidths,
    ) -> Result<(), RenderError> {
        sheet
            .merge_range(row, 0, row, LABEL_COLUMNS - 1, "Total", &formats.total_row)
            .map_err(xlsx)?;

        let has_rows = row > HEADER_ROWS;
        for (index, total) in calendar.totals.iter().enumerate() {
            let col = time_column(index);
            if self.use_formulas && has_rows {
                let letter = col_to_letter(col);
                // rows are 1-based in formulas; the last block row is `row`
                let formula = format!("=SUM({letter}{}:{letter}{row})", HEADER_ROWS + 1);
                sheet
                    .write_formula_with_format(row, col, formula.as_str(), &formats.total_row)
                    .map_err(xlsx)?;
            } else {
                sheet
                    .write_number_with_format(row, col, number(total.total)?, &formats.total_row)
                    .map_err(xlsx)?;
                widths.note(col, &total.total.normalize().to_string());
            }
        }

        Ok(())
    }
}

impl GridExporter for ExcelExporter {
    type Output = Vec<u8>;

    fn export(&self, calendar: &FarmCalendar) -> Result<Vec<u8>, RenderError> {
        self.render_to_bytes(calendar)
    }
}

/// Year spans, month spans, week labels; BLOCKS and AREA merged over all three rows
fn write_header(
    sheet: &mut Worksheet,
    calendar: &FarmCalendar,
    formats: &ExcelFormats,
    widths: &mut ColumnWidths,
) -> Result<(), RenderError> {
    let last_header_row = HEADER_ROWS - 1;
    sheet
        .merge_range(0, 0, last_header_row, 0, "BLOCKS", &formats.header)
        .map_err(xlsx)?;
    sheet
        .merge_range(0, 1, last_header_row, 1, "AREA", &formats.header)
        .map_err(xlsx)?;
    widths.note(0, "BLOCKS");
    widths.note(1, "AREA");

    for span in &calendar.header.years {
        merge_or_write(
            sheet,
            0,
            time_column(span.first_column),
            time_column(span.last_column()),
            &span.label,
            &formats.header,
        )?;
    }
    for span in &calendar.header.months {
        merge_or_write(
            sheet,
            1,
            time_column(span.first_column),
            time_column(span.last_column()),
            &span.label,
            &formats.header,
        )?;
    }
    for (index, label) in calendar.header.weeks.iter().enumerate() {
        let col = time_column(index);
        sheet
            .write_string_with_format(last_header_row, col, label, &formats.week_header)
            .map_err(xlsx)?;
        widths.note(col, label);
    }

    Ok(())
}

/// LEGEND block (cell codes per action) followed by the CROPS block
fn write_legend(
    sheet: &mut Worksheet,
    calendar: &FarmCalendar,
    start_row: u32,
    formats: &mut ExcelFormats,
    widths: &mut ColumnWidths,
) -> Result<(), RenderError> {
    let mut row = start_row;
    sheet
        .write_string_with_format(row, 0, "LEGEND", &formats.bold)
        .map_err(xlsx)?;
    row += 1;

    for entry in &calendar.action_key {
        sheet.write_string(row, 0, &entry.label).map_err(xlsx)?;
        let format = formats.cell(entry.fill, entry.emphasis);
        sheet
            .write_string_with_format(row, 1, &entry.description, format)
            .map_err(xlsx)?;
        widths.note(0, &entry.label);
        widths.note(1, &entry.description);
        row += 1;
    }

    if calendar.legend.is_empty() {
        return Ok(());
    }

    row += 1;
    sheet
        .write_string_with_format(row, 0, "CROPS", &formats.bold)
        .map_err(xlsx)?;
    row += 1;

    for entry in &calendar.legend {
        let code = entry.color.to_string();
        sheet.write_string(row, 0, &entry.crop).map_err(xlsx)?;
        let format = formats.cell(entry.color, Emphasis::Plain);
        sheet
            .write_string_with_format(row, 1, &code, format)
            .map_err(xlsx)?;
        widths.note(0, &entry.crop);
        widths.note(1, &code);
        row += 1;
    }

    Ok(())
}

fn add_land_prep_sheet(
    workbook: &mut Workbook,
    report: &LandPrepReport,
    formats: &ExcelFormats,
    auto_fit: bool,
) -> Result<(), RenderError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(LAND_PREP_SHEET).map_err(xlsx)?;

    let mut widths = ColumnWidths::default();

    for (col, header) in LAND_PREP_HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, *header, &formats.land_prep_header)
            .map_err(xlsx)?;
        widths.note(col, header);
    }

    for (index, prep) in report.rows.iter().enumerate() {
        let row = index as u32 + 1;
        let status_format = match prep.status {
            PrepStatus::Cleared => &formats.cleared,
            PrepStatus::NotCleared => &formats.not_cleared,
        };

        let values = [
            prep.partition.as_str(),
            prep.crop.as_str(),
            prep.planting_date_label.as_str(),
            prep.week_year.as_str(),
        ];
        for (col, value) in values.iter().enumerate() {
            let col = col as u16;
            sheet.write_string(row, col, *value).map_err(xlsx)?;
            widths.note(col, value);
        }
        sheet
            .write_string_with_format(row, 4, prep.status.as_str(), status_format)
            .map_err(xlsx)?;
        widths.note(4, prep.status.as_str());
    }

    if auto_fit {
        widths.apply(sheet)?;
    }

    Ok(())
}

/// Standalone land preparation workbook
#[derive(Clone, Debug)]
pub struct LandPrepExporter {
    pub auto_fit: bool,
}

impl Default for LandPrepExporter {
    fn default() -> Self {
        Self { auto_fit: true }
    }
}

impl LandPrepExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_to_bytes(&self, report: &LandPrepReport) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = ExcelFormats::new();
        add_land_prep_sheet(&mut workbook, report, &formats, self.auto_fit)?;
        workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))
    }

    pub fn save(&self, report: &LandPrepReport, path: impl AsRef<Path>) -> Result<(), RenderError> {
        std::fs::write(path, self.render_to_bytes(report)?)?;
        Ok(())
    }
}

// =============================================================================
// Formats
// =============================================================================

/// Reusable formats, plus one cached format per (fill, emphasis) pair
struct ExcelFormats {
    header: Format,
    week_header: Format,
    text: Format,
    number: Format,
    bold: Format,
    total_row: Format,
    land_prep_header: Format,
    cleared: Format,
    not_cleared: Format,
    cells: HashMap<(HexColor, Emphasis), Format>,
}

impl ExcelFormats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);

        let week_header = Format::new()
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format("#,##0.##")
            .set_border(FormatBorder::Thin);

        let total_row = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        let land_prep_header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_background_color(0x000000)
            .set_font_color(0xFFFFFF);

        let cleared = Format::new()
            .set_bold()
            .set_background_color(0x00FF00)
            .set_font_color(0x000000);

        let not_cleared = Format::new()
            .set_bold()
            .set_background_color(0xFF0000)
            .set_font_color(0xFFFFFF);

        Self {
            header,
            week_header,
            text,
            number,
            bold: Format::new().set_bold(),
            total_row,
            land_prep_header,
            cleared,
            not_cleared,
            cells: HashMap::new(),
        }
    }

    /// Grid cell format: centered, filled, bold white text when emphasized
    fn cell(&mut self, fill: HexColor, emphasis: Emphasis) -> &Format {
        self.cells.entry((fill, emphasis)).or_insert_with(|| {
            let format = Format::new()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(fill.rgb())
                .set_border(FormatBorder::Thin);
            match emphasis {
                Emphasis::Plain => format,
                Emphasis::BoldLightOnDark => format.set_bold().set_font_color(0xFFFFFF),
            }
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Longest value per column, for auto-fit
#[derive(Default)]
struct ColumnWidths {
    widths: Vec<usize>,
}

impl ColumnWidths {
    fn note(&mut self, col: u16, text: &str) {
        let col = usize::from(col);
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(text.chars().count());
    }

    fn apply(&self, sheet: &mut Worksheet) -> Result<(), RenderError> {
        for (col, &width) in self.widths.iter().enumerate() {
            if width > 0 {
                sheet
                    .set_column_width(col as u16, (width + 2) as f64)
                    .map_err(xlsx)?;
            }
        }
        Ok(())
    }
}

fn time_column(index: usize) -> u16 {
    LABEL_COLUMNS + index as u16
}

/// Merge a header span; a one-column span is written as a plain cell
fn merge_or_write(
    sheet: &mut Worksheet,
    row: u32,
    first_col: u16,
    last_col: u16,
    label: &str,
    format: &Format,
) -> Result<(), RenderError> {
    if first_col == last_col {
        sheet.write_string_with_format(row, first_col, label, format)
    } else {
        sheet.merge_range(row, first_col, row, last_col, label, format)
    }
    .map_err(xlsx)?;
    Ok(())
}

fn number(value: Decimal) -> Result<f64, RenderError> {
    value
        .to_f64()
        .ok_or_else(|| RenderError::InvalidData(format!("{value} is not representable")))
}

fn xlsx(e: XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

/// Convert a 0-based column index to its letter (0 = A, 26 = AA)
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = u32::from(col);
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
