//! ISO-8601 time axis
//!
//! Derives the year → month → week column layout of the calendar. Each year
//! has as many columns as it has ISO weeks (the ISO week number of
//! December 28th: 52 or 53). A week belongs to the month its Monday falls in,
//! so months come out 4 or 5 columns wide and the widths have to be computed.
//!
//! Week 1 can start in the previous December (2020-W01 starts on
//! 2019-12-30). Such a week is grouped under January so that month groups
//! stay contiguous and weeks stay strictly increasing within a year.

use chrono::{Datelike, NaiveDate, Weekday};
use farmcal_core::{GridError, HeaderLayout, HeaderSpan, TimeColumn};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Smallest year accepted by the default builder
pub const MIN_YEAR: i32 = 1;
/// Largest year accepted by the default builder
pub const MAX_YEAR: i32 = 9999;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for 1-12
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

/// Number of ISO weeks in `year` (52 or 53)
pub fn iso_weeks_in_year(year: i32) -> Result<u32, GridError> {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .ok_or(GridError::InvalidYear { year })
}

/// Month (1-12) that ISO week `week` of `year` is grouped under
///
/// Returns `None` when the week does not exist in that ISO year.
pub fn grouping_month(year: i32, week: u32) -> Option<u32> {
    let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
    if monday.year() < year {
        Some(1)
    } else {
        Some(monday.month())
    }
}

/// Consecutive weeks grouped under one month
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthGroup {
    pub month: u32,
    /// ISO week numbers, ascending and contiguous
    pub weeks: Vec<u32>,
}

impl MonthGroup {
    pub fn name(&self) -> &'static str {
        month_name(self.month)
    }
}

/// Column layout of a single year
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearAxis {
    pub year: i32,
    pub week_count: u32,
    pub months: Vec<MonthGroup>,
}

impl YearAxis {
    /// Lay out one year. The year must already be range-checked.
    pub fn build(year: i32) -> Result<Self, GridError> {
        let week_count = iso_weeks_in_year(year)?;
        let mut months: Vec<MonthGroup> = Vec::with_capacity(12);

        for week in 1..=week_count {
            let month = grouping_month(year, week).ok_or(GridError::InvalidYear { year })?;
            match months.last_mut() {
                Some(group) if group.month == month => group.weeks.push(week),
                _ => months.push(MonthGroup {
                    month,
                    weeks: vec![week],
                }),
            }
        }

        Ok(Self {
            year,
            week_count,
            months,
        })
    }

    /// Columns of this year in display order
    pub fn columns(&self) -> impl Iterator<Item = TimeColumn> + '_ {
        self.months.iter().flat_map(move |group| {
            group
                .weeks
                .iter()
                .map(move |&week| TimeColumn::new(self.year, group.month, week))
        })
    }
}

/// Builds a [`TimeAxis`] for a set of years
#[derive(Clone, Debug)]
pub struct TimeAxisBuilder {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for TimeAxisBuilder {
    fn default() -> Self {
        Self {
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
        }
    }
}

impl TimeAxisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the accepted year range (inclusive)
    pub fn year_range(mut self, min_year: i32, max_year: i32) -> Self {
        self.min_year = min_year;
        self.max_year = max_year;
        self
    }

    /// Build the axis. Years are deduplicated and sorted; any year outside
    /// the accepted range fails the whole build.
    pub fn build<I>(&self, years: I) -> Result<TimeAxis, GridError>
    where
        I: IntoIterator<Item = i32>,
    {
        let years: Vec<i32> = years.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        if let Some(&year) = years
            .iter()
            .find(|&&y| y < self.min_year || y > self.max_year)
        {
            return Err(GridError::InvalidYear { year });
        }

        let years = years
            .par_iter()
            .map(|&year| YearAxis::build(year))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TimeAxis::from_years(years))
    }
}

/// Ordered week columns for one or more years
#[derive(Clone, Debug, Default)]
pub struct TimeAxis {
    years: Vec<YearAxis>,
    columns: Vec<TimeColumn>,
    positions: HashMap<(i32, u32), usize>,
}

impl TimeAxis {
    fn from_years(years: Vec<YearAxis>) -> Self {
        let columns: Vec<TimeColumn> = years.iter().flat_map(|y| y.columns()).collect();
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, c)| ((c.year, c.iso_week), i))
            .collect();
        Self {
            years,
            columns,
            positions,
        }
    }

    pub fn years(&self) -> &[YearAxis] {
        &self.years
    }

    pub fn year(&self, year: i32) -> Option<&YearAxis> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn columns(&self) -> &[TimeColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column index of (year, ISO week), if the axis has it
    pub fn position(&self, year: i32, iso_week: u32) -> Option<usize> {
        self.positions.get(&(year, iso_week)).copied()
    }

    pub fn column(&self, year: i32, iso_week: u32) -> Option<TimeColumn> {
        self.position(year, iso_week).map(|i| self.columns[i])
    }

    /// Year spans, month spans and week labels for the exporter
    pub fn header(&self) -> HeaderLayout {
        let mut header = HeaderLayout {
            weeks: self.columns.iter().map(TimeColumn::label).collect(),
            ..HeaderLayout::default()
        };

        let mut first_column = 0;
        for year in &self.years {
            header.years.push(HeaderSpan {
                label: year.year.to_string(),
                first_column,
                width: year.week_count as usize,
            });
            for group in &year.months {
                header.months.push(HeaderSpan {
                    label: group.name().to_string(),
                    first_column,
                    width: group.weeks.len(),
                });
                first_column += group.weeks.len();
            }
        }

        header
    }
}
