//! SQLite-backed activity source
//!
//! The connection handle is opened explicitly by the caller and passed to
//! whatever needs records; nothing here is global. Two tables back it:
//! - activity_rows: one row per activity event (block, crop, action, week)
//! - land_prep_rows: planting events with their clearing flag

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use farmcal_core::{ActionType, ActivityRecord, LandPrepRecord};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{ActivitySource, SourceError, SourceOptions};

/// Bounded retry with exponential backoff for opening the database
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Fail on the first error
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// SQLite connection handle
///
/// Queries fail with [`SourceError::Closed`] once [`close`](Self::close) has
/// been called, until [`reconnect`](Self::reconnect).
pub struct SqliteSource {
    path: PathBuf,
    retry: RetryPolicy,
    options: SourceOptions,
    conn: Option<Connection>,
}

impl SqliteSource {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>, retry: RetryPolicy) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let conn = connect(&path, &retry)?;
        debug!(path = %path.display(), "sqlite source opened");

        Ok(Self {
            path,
            retry,
            options: SourceOptions::default(),
            conn: Some(conn),
        })
    }

    pub fn with_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Drop the current connection (if any) and open a fresh one
    pub fn reconnect(&mut self) -> Result<(), SourceError> {
        drop(self.conn.take());
        self.conn = Some(connect(&self.path, &self.retry)?);
        debug!(path = %self.path.display(), "sqlite source reconnected");
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), SourceError> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .map_err(|(_, e)| SourceError::database(format!("Failed to close database: {e}"))),
            None => Ok(()),
        }
    }

    fn conn(&self) -> Result<&Connection, SourceError> {
        self.conn.as_ref().ok_or(SourceError::Closed)
    }

    /// Create both tables if they don't exist
    pub fn init_schema(&self) -> Result<(), SourceError> {
        self.conn()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS activity_rows (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    block_name TEXT NOT NULL,
                    area TEXT,
                    crop TEXT,
                    color_code TEXT,
                    action_type TEXT NOT NULL,
                    years INTEGER NOT NULL,
                    weeks INTEGER NOT NULL,
                    total_yeild TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1
                );

                CREATE INDEX IF NOT EXISTS idx_activity_rows_slot
                ON activity_rows(block_name, years, weeks);

                CREATE TABLE IF NOT EXISTS land_prep_rows (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    partition_name TEXT NOT NULL,
                    crop TEXT,
                    action_type TEXT NOT NULL DEFAULT 'PLANTING',
                    planting_date TEXT NOT NULL,
                    ready_for_planting INTEGER NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1
                );
                "#,
            )
            .map_err(|e| SourceError::database(format!("Failed to create schema: {e}")))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one activity row, returning its id
    pub fn insert_activity(&self, record: &ActivityRecord, active: bool) -> Result<i64, SourceError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activity_rows
                 (block_name, area, crop, color_code, action_type, years, weeks, total_yeild, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.block_id,
                record.area.map(|a| a.to_string()),
                record.crop,
                record.color_code,
                record.action_type.as_str(),
                record.year,
                record.iso_week,
                record.yield_value.map(|y| y.to_string()),
                active,
            ],
        )
        .map_err(|e| SourceError::database(format!("Failed to insert activity: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Insert one planting event for the land preparation report
    pub fn insert_land_prep(&self, record: &LandPrepRecord) -> Result<i64, SourceError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO land_prep_rows (partition_name, crop, planting_date, ready_for_planting)
             VALUES (?, ?, ?, ?)",
            params![
                record.partition,
                record.crop,
                record.planting_date.format("%Y-%m-%d").to_string(),
                record.ready_for_planting,
            ],
        )
        .map_err(|e| SourceError::database(format!("Failed to insert land prep row: {e}")))?;

        Ok(conn.last_insert_rowid())
    }
}

impl ActivitySource for SqliteSource {
    /// Active, non-nursery rows ordered by block, year, week, then insertion.
    /// Event lines sharing a block, area, crop, color, action and week come
    /// back as one record carrying their summed yield.
    fn fetch_activities(&self) -> Result<Vec<ActivityRecord>, SourceError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT block_name, area, crop, color_code, action_type, years, weeks, total_yeild
                 FROM activity_rows
                 WHERE (?1 OR is_active = 1)
                   AND UPPER(action_type) <> 'NURSERY'
                   AND (?2 IS NULL OR years >= ?2)
                 ORDER BY block_name, years, weeks, id",
            )
            .map_err(|e| SourceError::database(format!("Failed to prepare activity query: {e}")))?;

        let raw = stmt
            .query_map(
                params![self.options.include_inactive, self.options.from_year],
                |row| {
                    Ok(RawActivity {
                        block_name: row.get(0)?,
                        area: row.get(1)?,
                        crop: row.get(2)?,
                        color_code: row.get(3)?,
                        action_type: row.get(4)?,
                        years: row.get(5)?,
                        weeks: row.get(6)?,
                        total_yeild: row.get(7)?,
                    })
                },
            )
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| SourceError::database(format!("Failed to read activities: {e}")))?;

        let rows = raw
            .into_iter()
            .enumerate()
            .map(|(row, raw)| raw.into_record(row))
            .collect::<Result<Vec<_>, _>>()?;

        let fetched = rows.len();
        let records = sum_yields(rows);
        debug!(rows = fetched, records = records.len(), "activities fetched");
        Ok(records)
    }

    /// Active planting events ordered by planting date
    fn fetch_land_prep(&self) -> Result<Vec<LandPrepRecord>, SourceError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT partition_name, crop, planting_date, ready_for_planting
                 FROM land_prep_rows
                 WHERE (?1 OR is_active = 1)
                   AND UPPER(action_type) = 'PLANTING'
                 ORDER BY planting_date, id",
            )
            .map_err(|e| SourceError::database(format!("Failed to prepare land prep query: {e}")))?;

        let raw = stmt
            .query_map(params![self.options.include_inactive], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| SourceError::database(format!("Failed to read land prep rows: {e}")))?;

        raw.into_iter()
            .enumerate()
            .map(|(row, (partition, crop, date, ready))| {
                let planting_date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                    .map_err(|e| SourceError::invalid_row(row, format!("planting_date {date:?}: {e}")))?;
                Ok(LandPrepRecord {
                    partition,
                    crop,
                    planting_date,
                    ready_for_planting: ready.unwrap_or(0) != 0,
                })
            })
            .collect()
    }
}

struct RawActivity {
    block_name: String,
    area: Value,
    crop: Option<String>,
    color_code: Option<String>,
    action_type: String,
    years: i32,
    weeks: u32,
    total_yeild: Value,
}

impl RawActivity {
    fn into_record(self, row: usize) -> Result<ActivityRecord, SourceError> {
        Ok(ActivityRecord {
            block_id: self.block_name,
            area: decimal(self.area, row, "area")?,
            crop: self.crop,
            color_code: self.color_code,
            action_type: ActionType::from(self.action_type.as_str()),
            year: self.years,
            iso_week: self.weeks,
            yield_value: decimal(self.total_yeild, row, "total_yeild")?,
        })
    }
}

type EventKey = (
    String,
    Option<Decimal>,
    Option<String>,
    Option<String>,
    ActionType,
    i32,
    u32,
);

/// Collapse event lines of the same activity into one record.
///
/// Groups keep the position of their first line. Yields are summed exactly;
/// a group whose lines all lack a yield stays without one.
fn sum_yields(rows: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    let mut records: Vec<ActivityRecord> = Vec::with_capacity(rows.len());
    let mut groups: HashMap<EventKey, usize> = HashMap::new();

    for row in rows {
        let key: EventKey = (
            row.block_id.clone(),
            row.area,
            row.crop.clone(),
            row.color_code.clone(),
            row.action_type.clone(),
            row.year,
            row.iso_week,
        );
        match groups.get(&key) {
            Some(&at) => {
                let record = &mut records[at];
                record.yield_value = match (record.yield_value, row.yield_value) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                };
            }
            None => {
                groups.insert(key, records.len());
                records.push(row);
            }
        }
    }
    records
}

/// Numeric columns may hold integers, reals or decimal text
fn decimal(value: Value, row: usize, column: &str) -> Result<Option<Decimal>, SourceError> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(Decimal::from(i))),
        Value::Real(f) => Decimal::try_from(f)
            .map(Some)
            .map_err(|e| SourceError::invalid_row(row, format!("{column}: {e}"))),
        Value::Text(text) if text.trim().is_empty() => Ok(None),
        Value::Text(text) => text
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| SourceError::invalid_row(row, format!("{column} {text:?}: {e}"))),
        Value::Blob(_) => Err(SourceError::invalid_row(row, format!("{column}: unexpected blob"))),
    }
}

fn connect(path: &Path, retry: &RetryPolicy) -> Result<Connection, SourceError> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match try_connect(path) {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < attempts => {
                let delay = retry.delay(attempt);
                warn!(
                    path = %path.display(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "database open failed, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                return Err(SourceError::database(format!(
                    "Failed to open {} after {attempt} attempt(s): {e}",
                    path.display()
                )))
            }
        }
    }
}

fn try_connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    // SQLite opens lazily; touch the schema so a non-database file fails here
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))?;
    Ok(conn)
}
