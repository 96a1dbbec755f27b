//! Cell rendering
//!
//! Turns the record resolved for a slot (or its absence) into a display
//! value, a fill color and an emphasis flag:
//!
//! | Record       | Value              | Fill                       | Emphasis          |
//! |--------------|--------------------|----------------------------|-------------------|
//! | none         | empty              | palette empty              | plain             |
//! | HARVESTING   | yield (may be none)| crop color / palette       | plain             |
//! | PLANTING     | `P-` + crop initial| crop color / palette       | bold light-on-dark|
//! | UPROOTING    | `U-` + crop initial| crop color / palette       | bold light-on-dark|
//! | other action | empty              | palette empty              | plain             |

use farmcal_core::{
    ActionType, ActivityRecord, CellContent, CellValue, Emphasis, GridError, HexColor,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fallback and fixed-mode colors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub planting: HexColor,
    pub uprooting: HexColor,
    pub harvesting: HexColor,
    pub empty: HexColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            planting: HexColor::new(0x4CAF50),   // green
            uprooting: HexColor::new(0x9C27B0),  // purple
            harvesting: HexColor::new(0xFFC107), // amber
            empty: HexColor::new(0xE0E0E0),      // light gray
        }
    }
}

impl Palette {
    /// Palette color for an action type
    pub fn for_action(&self, action: &ActionType) -> HexColor {
        match action {
            ActionType::Planting => self.planting,
            ActionType::Uprooting => self.uprooting,
            ActionType::Harvesting => self.harvesting,
            ActionType::Other(_) => self.empty,
        }
    }
}

/// Where cell colors come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    /// The record's crop color, falling back to the palette
    #[default]
    Crop,
    /// Fixed palette per action type
    Action,
}

/// Renders resolved records into cell content
#[derive(Clone, Debug, Default)]
pub struct CellRenderer {
    pub palette: Palette,
    pub color_mode: ColorMode,
}

impl CellRenderer {
    pub fn new(palette: Palette, color_mode: ColorMode) -> Self {
        Self {
            palette,
            color_mode,
        }
    }

    /// Content of the cell resolved to `record`
    ///
    /// Planting and uprooting cells need a crop initial and fail with
    /// [`GridError::EmptyCropName`] when the crop is missing or blank.
    pub fn render(&self, record: Option<&ActivityRecord>) -> Result<CellContent, GridError> {
        let Some(record) = record else {
            return Ok(self.empty());
        };

        let content = match record.action_type {
            ActionType::Harvesting => CellContent {
                value: record
                    .yield_value
                    .map(CellValue::Number)
                    .unwrap_or(CellValue::Empty),
                fill: self.fill(record),
                emphasis: Emphasis::Plain,
            },
            ActionType::Planting => self.coded(record, 'P')?,
            ActionType::Uprooting => self.coded(record, 'U')?,
            ActionType::Other(_) => self.empty(),
        };

        Ok(content)
    }

    /// Content of a cell with no activity
    pub fn empty(&self) -> CellContent {
        CellContent::empty(self.palette.empty)
    }

    fn coded(&self, record: &ActivityRecord, prefix: char) -> Result<CellContent, GridError> {
        let initial = crop_initial(record)?;
        Ok(CellContent {
            value: CellValue::Text(format!("{prefix}-{initial}")),
            fill: self.fill(record),
            emphasis: Emphasis::BoldLightOnDark,
        })
    }

    fn fill(&self, record: &ActivityRecord) -> HexColor {
        let fallback = self.palette.for_action(&record.action_type);
        match self.color_mode {
            ColorMode::Action => fallback,
            ColorMode::Crop => record_color(record).unwrap_or(fallback),
        }
    }
}

/// First character of the record's crop name
pub fn crop_initial(record: &ActivityRecord) -> Result<char, GridError> {
    record
        .crop_name()
        .and_then(|name| name.chars().next())
        .ok_or_else(|| GridError::EmptyCropName {
            block_id: record.block_id.clone(),
            year: record.year,
            week: record.iso_week,
        })
}

/// Check that `record` can be rendered: coded actions need a crop initial
pub fn check_renderable(record: &ActivityRecord) -> Result<(), GridError> {
    match record.action_type {
        ActionType::Planting | ActionType::Uprooting => crop_initial(record).map(|_| ()),
        _ => Ok(()),
    }
}

/// The record's color code, if present and parseable
pub fn record_color(record: &ActivityRecord) -> Option<HexColor> {
    let code = record.color_code.as_deref()?.trim();
    if code.is_empty() {
        return None;
    }
    match HexColor::parse(code) {
        Ok(color) => Some(color),
        Err(error) => {
            warn!(block = %record.block_id, %error, "ignoring color code");
            None
        }
    }
}
