//! # farmcal-source
//!
//! Where activity records come from.
//!
//! Two adapters implement [`ActivitySource`]:
//! - [`JsonSource`]: a JSON export of the activity query
//! - [`SqliteSource`]: an explicitly opened SQLite connection handle
//!
//! [`open_source`] picks the adapter from the input's file extension.

pub mod json;
pub mod sqlite;

pub use json::JsonSource;
pub use sqlite::{RetryPolicy, SqliteSource};

use farmcal_core::{ActivityRecord, LandPrepRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A query interface returning activity and land preparation rows
///
/// Activity rows must come back in the order the calendar should see them:
/// later rows win slot collisions.
pub trait ActivitySource {
    /// All calendar activity rows
    fn fetch_activities(&self) -> Result<Vec<ActivityRecord>, SourceError>;

    /// Planting events for the land preparation report
    fn fetch_land_prep(&self) -> Result<Vec<LandPrepRecord>, SourceError>;
}

/// Row filters shared by all sources
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceOptions {
    /// Drop activity rows from years before this one
    pub from_year: Option<i32>,
    /// Keep rows flagged inactive (SQLite only)
    pub include_inactive: bool,
}

/// Input kinds recognised by [`open_source`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Sqlite,
}

impl SourceKind {
    /// Detect the kind from the file extension (case-insensitive)
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(SourceKind::Json),
            Some("db" | "sqlite" | "sqlite3") => Ok(SourceKind::Sqlite),
            _ => Err(SourceError::UnsupportedInput(path.to_path_buf())),
        }
    }
}

/// Open the source behind `path`
///
/// The file must exist; SQLite inputs are opened with the default
/// [`RetryPolicy`].
pub fn open_source(
    path: &Path,
    options: SourceOptions,
) -> Result<Box<dyn ActivitySource>, SourceError> {
    let kind = SourceKind::detect(path)?;
    if !path.exists() {
        return Err(SourceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let source: Box<dyn ActivitySource> = match kind {
        SourceKind::Json => Box::new(JsonSource::from_path(path)?.with_options(options)),
        SourceKind::Sqlite => {
            Box::new(SqliteSource::open(path, RetryPolicy::default())?.with_options(options))
        }
    };
    Ok(source)
}

/// Errors raised while reading records
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    #[error("Connection is closed")]
    Closed,

    #[error("Unsupported input {}: expected .json, .db, .sqlite or .sqlite3", .0.display())]
    UnsupportedInput(PathBuf),
}

impl SourceError {
    /// Create a database error from a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid row error
    pub fn invalid_row(row: usize, msg: impl Into<String>) -> Self {
        Self::InvalidRow {
            row,
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_by_extension() {
        assert_eq!(
            SourceKind::detect(Path::new("rows.json")).unwrap(),
            SourceKind::Json
        );
        assert_eq!(
            SourceKind::detect(Path::new("/tmp/farm.DB")).unwrap(),
            SourceKind::Sqlite
        );
        assert_eq!(
            SourceKind::detect(Path::new("farm.sqlite3")).unwrap(),
            SourceKind::Sqlite
        );
        assert!(matches!(
            SourceKind::detect(Path::new("farm.csv")),
            Err(SourceError::UnsupportedInput(_))
        ));
        assert!(SourceKind::detect(Path::new("farm")).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = open_source(Path::new("/nonexistent/farm.json"), SourceOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SourceError::invalid_row(3, "area: bad decimal").to_string(),
            "Invalid row 3: area: bad decimal"
        );
        assert_eq!(SourceError::Closed.to_string(), "Connection is closed");
        assert!(SourceError::UnsupportedInput(PathBuf::from("x.csv"))
            .to_string()
            .contains("x.csv"));
    }

    #[test]
    fn options_from_toml() {
        let options: SourceOptions = toml::from_str("from-year = 2024").unwrap();
        assert_eq!(options.from_year, Some(2024));
        assert!(!options.include_inactive);
    }
}
