//! Reporting periods and lookback windows
//!
//! Environmental and consultation tables are keyed by a period label: a
//! calendar year (`2023`) or an ISO week (`2023-W14`). The join counts
//! recalls inside a lookback window that ends where the period ends.

use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PipelineError, Result};

/// Granularity of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PeriodKind {
    /// Whole calendar year
    Year,
    /// ISO 8601 week
    Week(u32),
}

/// A reporting period with its inclusive date bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    year: i32,
    kind: PeriodKind,
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Calendar year period
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PipelineError::validation(format!("invalid year {year}")))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| PipelineError::validation(format!("invalid year {year}")))?;
        Ok(Self {
            year,
            kind: PeriodKind::Year,
            start,
            end,
        })
    }

    /// ISO week period (`week` in 1..=52 or 53 when the ISO year has one)
    pub fn iso_week(year: i32, week: u32) -> Result<Self> {
        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .ok_or_else(|| PipelineError::validation(format!("invalid ISO week {year}-W{week:02}")))?;
        let end = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)
            .ok_or_else(|| PipelineError::validation(format!("invalid ISO week {year}-W{week:02}")))?;
        Ok(Self {
            year,
            kind: PeriodKind::Week(week),
            start,
            end,
        })
    }

    /// Year the period belongs to (ISO year for weeks)
    #[must_use]
    pub const fn year_number(&self) -> i32 {
        self.year
    }

    /// First day of the period
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the period
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PeriodKind::Year => write!(f, "{}", self.year),
            PeriodKind::Week(week) => write!(f, "{}-W{week:02}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = PipelineError;

    /// Accepts `2023`, `2023.0` (a year read through a float column),
    /// `2023-W14`, `2023W14` and `2023-w14`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || PipelineError::validation(format!("unrecognised period '{s}'"));

        let year_part = s.strip_suffix(".0").unwrap_or(s);
        if year_part.len() == 4 && year_part.chars().all(|c| c.is_ascii_digit()) {
            let year = year_part.parse().map_err(|_| invalid())?;
            return Self::year(year);
        }

        let upper = s.to_ascii_uppercase();
        let (year, week) = upper.split_once('W').ok_or_else(invalid)?;
        let year = year.trim_end_matches('-');
        if year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::iso_week(year, week)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Trailing span of recall dates that contributes to one period's row
///
/// The default is the period itself: one ISO week for weekly tables, the
/// whole calendar year for yearly ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookbackWindow {
    /// `n` weeks ending on the period's last day, inclusive
    Weeks(u32),
    /// Exactly the period's own dates
    #[default]
    WholePeriod,
}

impl LookbackWindow {
    /// Inclusive date range for `period`, `None` for an empty window
    ///
    /// Windows reaching past the earliest representable date start there.
    #[must_use]
    pub fn range(&self, period: &Period) -> Option<RangeInclusive<NaiveDate>> {
        match *self {
            Self::Weeks(0) => None,
            Self::Weeks(weeks) => {
                let end = period.end_date();
                let start = Duration::try_days(i64::from(weeks) * 7 - 1)
                    .and_then(|span| end.checked_sub_signed(span))
                    .unwrap_or(NaiveDate::MIN);
                Some(start..=end)
            }
            Self::WholePeriod => Some(period.start_date()..=period.end_date()),
        }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weeks(weeks) => write!(f, "{weeks}w"),
            Self::WholePeriod => f.write_str("period"),
        }
    }
}

impl FromStr for LookbackWindow {
    type Err = PipelineError;

    /// Accepts `4`, `4w`, `period` or `whole`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "period" || s == "whole" {
            return Ok(Self::WholePeriod);
        }
        s.trim_end_matches('w')
            .parse()
            .map(Self::Weeks)
            .map_err(|_| PipelineError::validation(format!("unrecognised lookback window '{s}'")))
    }
}
