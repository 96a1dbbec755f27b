//! Fixed-width terminal preview of a calendar

use farmcal_core::{CellValue, FarmCalendar, GridExporter, HeaderSpan, RenderError};

/// Plain text renderer for console output
///
/// One line per block, one fixed-width column per ISO week. Empty cells
/// print as `.` so that long calendars stay readable.
#[derive(Clone, Debug)]
pub struct TextRenderer {
    pub show_legend: bool,
    pub show_skipped: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            show_legend: true,
            show_skipped: true,
        }
    }
}

const EMPTY_MARKER: &str = ".";
const SEPARATOR: &str = " | ";

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_legend(mut self) -> Self {
        self.show_legend = false;
        self
    }

    pub fn render(&self, calendar: &FarmCalendar) -> String {
        let labels: Vec<String> = calendar
            .header
            .weeks
            .iter()
            .map(|label| label.replace("Wk ", "W"))
            .collect();

        let cell_width = calendar
            .rows
            .iter()
            .flat_map(|row| row.cells.iter().map(|c| c.value.to_string().len()))
            .chain(labels.iter().map(String::len))
            .chain(calendar.totals.iter().map(|t| t.total.normalize().to_string().len()))
            .max()
            .unwrap_or(0)
            .max(3);

        let block_width = calendar
            .rows
            .iter()
            .map(|r| r.block_id.chars().count())
            .chain(["BLOCKS".len(), "Total".len()])
            .max()
            .unwrap_or(0);

        let areas: Vec<String> = calendar
            .rows
            .iter()
            .map(|r| r.area.map(|a| a.normalize().to_string()).unwrap_or_default())
            .collect();
        let area_width = areas.iter().map(String::len).max().unwrap_or(0).max("AREA".len());

        let label_width = block_width + 1 + area_width;
        let mut out = String::new();

        // Header
        out.push_str(&format!("{:<block_width$} {:<area_width$}{SEPARATOR}", "BLOCKS", "AREA"));
        out.push_str(&spans_line(&calendar.header.years, cell_width));
        out.push('\n');
        out.push_str(&format!("{:label_width$}{SEPARATOR}", ""));
        out.push_str(&spans_line(&calendar.header.months, cell_width));
        out.push('\n');
        out.push_str(&format!("{:label_width$}{SEPARATOR}", ""));
        out.push_str(&cells_line(labels.iter().map(String::as_str), cell_width));
        out.push('\n');

        // Blocks
        for (row, area) in calendar.rows.iter().zip(&areas) {
            out.push_str(&format!(
                "{:<block_width$} {:<area_width$}{SEPARATOR}",
                row.block_id, area
            ));
            let values: Vec<String> = row
                .cells
                .iter()
                .map(|c| match &c.value {
                    CellValue::Empty => EMPTY_MARKER.to_string(),
                    value => value.to_string(),
                })
                .collect();
            out.push_str(&cells_line(values.iter().map(String::as_str), cell_width));
            out.push('\n');
        }

        // Totals
        out.push_str(&format!("{:<label_width$}{SEPARATOR}", "Total"));
        let totals: Vec<String> = calendar
            .totals
            .iter()
            .map(|t| t.total.normalize().to_string())
            .collect();
        out.push_str(&cells_line(totals.iter().map(String::as_str), cell_width));
        out.push('\n');

        if self.show_legend {
            out.push_str("\nLEGEND\n");
            for entry in &calendar.action_key {
                out.push_str(&format!("  {:<12}{}\n", entry.label, entry.description));
            }
            if !calendar.legend.is_empty() {
                out.push_str("\nCROPS\n");
                for entry in &calendar.legend {
                    out.push_str(&format!("  {:<12}{}\n", entry.crop, entry.color));
                }
            }
        }

        if self.show_skipped && !calendar.skipped.is_empty() {
            out.push_str(&format!("\nSKIPPED ({})\n", calendar.skipped.len()));
            for skipped in &calendar.skipped {
                out.push_str(&format!("  {skipped}\n"));
            }
        }

        out
    }
}

impl GridExporter for TextRenderer {
    type Output = String;

    fn export(&self, calendar: &FarmCalendar) -> Result<String, RenderError> {
        Ok(self.render(calendar))
    }
}

fn cells_line<'a>(values: impl Iterator<Item = &'a str>, width: usize) -> String {
    values
        .map(|v| format!("{v:>width$}"))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

/// Span labels left-aligned over the columns they cover, truncated to fit
fn spans_line(spans: &[HeaderSpan], cell_width: usize) -> String {
    let mut line = String::new();
    for span in spans {
        let room = span.width * (cell_width + 1);
        let label: String = span.label.chars().take(room.saturating_sub(1)).collect();
        line.push_str(&format!("{label:<room$}"));
    }
    line.trim_end().to_string()
}
