//! Legend construction
//!
//! The crop legend has one entry per distinct crop. Entries keep the position
//! of the crop's first occurrence and take the color of its last one.

use crate::cell::{record_color, Palette};
use farmcal_core::{ActionKeyEntry, ActivityRecord, Emphasis, HexColor, LegendEntry};
use std::collections::HashMap;

/// Builds the crop → color legend
#[derive(Clone, Debug)]
pub struct LegendBuilder {
    /// Color for crops whose last record has no usable color code
    pub fallback: HexColor,
}

impl Default for LegendBuilder {
    fn default() -> Self {
        Self::new(Palette::default().empty)
    }
}

impl LegendBuilder {
    pub fn new(fallback: HexColor) -> Self {
        Self { fallback }
    }

    /// One entry per distinct non-blank crop, in first-encounter order
    pub fn build<'a, I>(&self, records: I) -> Vec<LegendEntry>
    where
        I: IntoIterator<Item = &'a ActivityRecord>,
    {
        let mut entries: Vec<LegendEntry> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            let Some(crop) = record.crop_name() else {
                continue;
            };
            let color = record_color(record).unwrap_or(self.fallback);
            match positions.get(crop) {
                Some(&i) => entries[i].color = color,
                None => {
                    positions.insert(crop.to_string(), entries.len());
                    entries.push(LegendEntry {
                        crop: crop.to_string(),
                        color,
                    });
                }
            }
        }

        entries
    }

    /// Key explaining the cell codes and palette colors
    pub fn action_key(palette: &Palette) -> Vec<ActionKeyEntry> {
        let entry = |label: &str, description: &str, fill: HexColor, emphasis: Emphasis| {
            ActionKeyEntry {
                label: label.to_string(),
                description: description.to_string(),
                fill,
                emphasis,
            }
        };

        vec![
            entry(
                "Planting",
                "P-{Crop Initial}",
                palette.planting,
                Emphasis::BoldLightOnDark,
            ),
            entry(
                "Uprooting",
                "U-{Crop Initial}",
                palette.uprooting,
                Emphasis::BoldLightOnDark,
            ),
            entry("Harvesting", "Yield Value", palette.harvesting, Emphasis::Plain),
            entry("Empty Week", "No Activity", palette.empty, Emphasis::Plain),
        ]
    }
}
