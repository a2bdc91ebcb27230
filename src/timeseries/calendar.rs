//! CF calendars and time coordinate encoding
//!
//! Climate model output uses calendars that differ from the civil one
//! (`noleap`, `360_day`, ...). Day arithmetic is therefore done on plain
//! year/month/day triples per calendar; only the final timestamps are turned
//! into [`NaiveDate`] values. Days that do not exist in the proleptic Gregorian
//! calendar (e.g. 30 February in a `360_day` calendar) are clamped to the last
//! valid day of the month; year and month are always exact.

use crate::errors::{CodeBaseError, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

const CUMULATIVE_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
/// Largest distance from year 0, in days, that still maps onto a [`NaiveDate`]
const MAX_EPOCH_DAY: i64 = 262_000 * 366;
#[allow(clippy::cast_precision_loss)]
const MAX_OFFSET_DAYS: f64 = MAX_EPOCH_DAY as f64;

/// Calendars defined by the CF conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    /// `standard` / `gregorian`, treated as proleptic Gregorian
    #[default]
    Standard,
    /// `proleptic_gregorian`
    ProlepticGregorian,
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`, twelve months of 30 days
    Day360,
    /// `julian`, a leap year every four years
    Julian,
}

impl Calendar {
    /// Name used in the `calendar` attribute of a CF time coordinate
    #[must_use]
    pub const fn cf_name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ProlepticGregorian => "proleptic_gregorian",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
            Self::Julian => "julian",
        }
    }

    /// Whether `year` has 29 February in this calendar
    #[must_use]
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            Self::Standard | Self::ProlepticGregorian => {
                year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
            }
            Self::Julian => year.rem_euclid(4) == 0,
            Self::AllLeap => true,
            Self::NoLeap | Self::Day360 => false,
        }
    }

    /// Number of days of `month` (1-based) in `year`
    #[must_use]
    pub fn days_in_month(self, year: i32, month: u32) -> u32 {
        if self == Self::Day360 {
            return 30;
        }
        let index = (month.clamp(1, 12) - 1) as usize;
        if index == 1 && self.is_leap_year(year) {
            29
        } else {
            MONTH_LENGTHS[index]
        }
    }

    /// Number of days in `year`
    #[must_use]
    pub fn days_in_year(self, year: i32) -> u32 {
        match self {
            Self::Day360 => 360,
            _ if self.is_leap_year(year) => 366,
            _ => 365,
        }
    }

    /// Days elapsed from 1 January of year 0 to the given date.
    fn epoch_day(self, date: CalendarDate) -> i64 {
        let y = i64::from(date.year);
        let day_in_month = i64::from(date.day) - 1;
        match self {
            Self::Day360 => 360 * y + 30 * (i64::from(date.month) - 1) + day_in_month,
            _ => {
                let leap_days = match self {
                    Self::Standard | Self::ProlepticGregorian => {
                        (y + 3).div_euclid(4) - (y + 99).div_euclid(100) + (y + 399).div_euclid(400)
                    }
                    Self::Julian => (y + 3).div_euclid(4),
                    Self::AllLeap => y,
                    Self::NoLeap | Self::Day360 => 0,
                };
                let month_index = (date.month.clamp(1, 12) - 1) as usize;
                let leap_shift = i64::from(month_index >= 2 && self.is_leap_year(date.year));
                365 * y + leap_days + CUMULATIVE_DAYS[month_index] + leap_shift + day_in_month
            }
        }
    }

    /// Inverse of [`Calendar::epoch_day`].
    fn date_from_epoch_day(self, day: i64) -> CalendarDate {
        let mean_year = match self {
            Self::Day360 => 360.0,
            Self::NoLeap => 365.0,
            Self::AllLeap => 366.0,
            Self::Julian => 365.25,
            Self::Standard | Self::ProlepticGregorian => 365.2425,
        };
        #[allow(clippy::cast_possible_truncation)]
        let mut year = (day as f64 / mean_year).floor() as i32;
        while self.epoch_day(CalendarDate::new(year, 1, 1)) > day {
            year -= 1;
        }
        while self.epoch_day(CalendarDate::new(year + 1, 1, 1)) <= day {
            year += 1;
        }

        let mut remaining = day - self.epoch_day(CalendarDate::new(year, 1, 1));
        let mut month = 1;
        while month < 12 && remaining >= i64::from(self.days_in_month(year, month)) {
            remaining -= i64::from(self.days_in_month(year, month));
            month += 1;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        CalendarDate::new(year, month, remaining as u32 + 1)
    }

    /// Date `days` days after `reference` in this calendar
    ///
    /// # Errors
    ///
    /// Returns an error if the date lies outside the range of [`NaiveDate`].
    pub fn add_days(self, reference: CalendarDate, days: i64) -> Result<CalendarDate> {
        let day = self
            .epoch_day(reference)
            .checked_add(days)
            .filter(|day| (-MAX_EPOCH_DAY..=MAX_EPOCH_DAY).contains(day))
            .ok_or_else(|| {
                CodeBaseError::TimeError(format!(
                    "{days} days after {reference} is out of range"
                ))
            })?;
        Ok(self.date_from_epoch_day(day))
    }

    /// Whole days between `reference` and `date` in this calendar
    #[must_use]
    pub fn days_between(self, reference: CalendarDate, date: CalendarDate) -> i64 {
        self.epoch_day(date) - self.epoch_day(reference)
    }
}

impl FromStr for Calendar {
    type Err = CodeBaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Self::Standard),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            "noleap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            "julian" => Ok(Self::Julian),
            other => Err(CodeBaseError::TimeError(format!(
                "Unsupported calendar '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cf_name())
    }
}

/// A year/month/day triple that may not exist in the civil calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Closest [`NaiveDate`]: the day is clamped to the length of the civil month.
    ///
    /// # Errors
    ///
    /// Returns an error if the year is out of chrono's range.
    pub fn to_naive_date(self) -> Result<NaiveDate> {
        let month = self.month.clamp(1, 12);
        let last_day = Calendar::ProlepticGregorian.days_in_month(self.year, month);
        NaiveDate::from_ymd_opt(self.year, month, self.day.clamp(1, last_day)).ok_or_else(|| {
            CodeBaseError::TimeError(format!("Date {self} cannot be represented"))
        })
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month(), date.day())
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Step unit of a CF time coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    const fn seconds(self) -> f64 {
        match self {
            Self::Days => 86_400.0,
            Self::Hours => 3_600.0,
            Self::Minutes => 60.0,
            Self::Seconds => 1.0,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }
}

/// Parsed `"<unit> since <reference date>"` attribute of a time coordinate.
///
/// The time of day of the reference is ignored; timestamps have daily resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: CalendarDate,
}

impl TimeUnits {
    /// Units counting days since 1 January of `year`
    #[must_use]
    pub const fn days_since_year(year: i32) -> Self {
        Self {
            unit: TimeUnit::Days,
            reference: CalendarDate::new(year, 1, 1),
        }
    }

    /// Decode numeric offsets into timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite offsets or unrepresentable dates.
    pub fn decode(&self, offsets: &[f64], calendar: Calendar) -> Result<Vec<NaiveDate>> {
        offsets
            .iter()
            .map(|&offset| {
                if !offset.is_finite() {
                    return Err(CodeBaseError::TimeError(format!(
                        "Cannot decode time offset {offset}"
                    )));
                }
                let days = (offset * self.unit.seconds() / 86_400.0).floor();
                if days.abs() > MAX_OFFSET_DAYS {
                    return Err(CodeBaseError::TimeError(format!(
                        "Time offset {offset} is out of range"
                    )));
                }
                #[allow(clippy::cast_possible_truncation)]
                let days = days as i64;
                calendar.add_days(self.reference, days)?.to_naive_date()
            })
            .collect()
    }

    /// Encode timestamps as offsets from the reference date.
    #[must_use]
    pub fn encode(&self, times: &[NaiveDate], calendar: Calendar) -> Vec<f64> {
        times
            .iter()
            .map(|&t| {
                #[allow(clippy::cast_precision_loss)]
                let days = calendar.days_between(self.reference, t.into()) as f64;
                days * 86_400.0 / self.unit.seconds()
            })
            .collect()
    }
}

impl FromStr for TimeUnits {
    type Err = CodeBaseError;

    fn from_str(s: &str) -> Result<Self> {
        let (unit, reference) = s.split_once(" since ").ok_or_else(|| {
            CodeBaseError::TimeError(format!("Expected '<unit> since <date>', got '{s}'"))
        })?;

        let unit = match unit.trim().to_lowercase().as_str() {
            "days" | "day" | "d" => TimeUnit::Days,
            "hours" | "hour" | "h" => TimeUnit::Hours,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "seconds" | "second" | "s" => TimeUnit::Seconds,
            other => {
                return Err(CodeBaseError::TimeError(format!(
                    "Unsupported time unit '{other}'"
                )))
            }
        };

        let date_part = reference
            .trim()
            .split(|c: char| c.is_whitespace() || c == 'T')
            .next()
            .unwrap_or_default();
        let fields: Vec<&str> = date_part.split('-').collect();
        let parse_field = |field: Option<&&str>, name: &str| -> Result<i64> {
            field
                .ok_or_else(|| CodeBaseError::TimeError(format!("Missing {name} in '{s}'")))?
                .parse::<i64>()
                .map_err(|_| CodeBaseError::TimeError(format!("Invalid {name} in '{s}'")))
        };
        let year = parse_field(fields.first(), "year")?;
        let month = parse_field(fields.get(1), "month")?;
        let day = parse_field(fields.get(2), "day")?;

        let reference = CalendarDate::new(
            i32::try_from(year).map_err(|_| CodeBaseError::TimeError(format!("Year out of range in '{s}'")))?,
            u32::try_from(month).ok().filter(|m| (1..=12).contains(m)).ok_or_else(|| {
                CodeBaseError::TimeError(format!("Invalid month in '{s}'"))
            })?,
            u32::try_from(day).ok().filter(|d| (1..=31).contains(d)).ok_or_else(|| {
                CodeBaseError::TimeError(format!("Invalid day in '{s}'"))
            })?,
        );
        Ok(Self { unit, reference })
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} since {}", self.unit.as_str(), self.reference)
    }
}
