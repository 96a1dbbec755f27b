//! `farmcal.toml` configuration
//!
//! ```toml
//! [calendar]
//! color-mode = "crop"
//! out-of-range = "skip"
//! collision = "last-wins"
//! years = [2024, 2025]
//!
//! [calendar.palette]
//! planting = "#4CAF50"
//!
//! [export]
//! sheet-name = "Farm Activities"
//! use-formulas = true
//! output = "farm_calendar.xlsx"
//!
//! [source]
//! from-year = 2024
//! include-inactive = false
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use anyhow::{Context, Result};
use farmcal_grid::CalendarOptions;
use farmcal_source::SourceOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG: &str = "farmcal.toml";

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FarmcalConfig {
    pub calendar: CalendarSection,
    pub export: ExportSection,
    pub source: SourceOptions,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    #[serde(flatten)]
    pub options: CalendarOptions,
    /// Years to lay out; empty means the years the records mention
    pub years: Vec<i32>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExportSection {
    pub sheet_name: Option<String>,
    pub use_formulas: bool,
    pub output: Option<PathBuf>,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            sheet_name: None,
            use_formulas: true,
            output: None,
        }
    }
}

impl FarmcalConfig {
    /// Load `path`, or `farmcal.toml` if it exists, or the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
