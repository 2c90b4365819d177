//! Core type definitions with validation.
//!
//! Times of day are plain `i32` minutes from midnight (0..=1440); calendar
//! dates are `chrono::NaiveDate`. Keeping the unit explicit avoids mixing
//! durations and clock times with timezone-aware timestamps.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of minutes in a calendar day.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The month was outside 1..=12.
    #[error("month must be between 1 and 12, got {value}")]
    MonthOutOfRange { value: u32 },

    /// A year-month string could not be parsed.
    #[error("invalid year-month: {value}")]
    InvalidYearMonth { value: String },

    /// A clock time string could not be parsed.
    #[error("invalid time of day: {value}")]
    InvalidTimeOfDay { value: String },

    /// An interval end preceded its start.
    #[error("interval end {end} precedes start {start}")]
    InvertedInterval { start: i32, end: i32 },

    /// Invalid error-code value.
    #[error("invalid error code: {value}")]
    InvalidErrorCode { value: String },

    /// Invalid posting-source value.
    #[error("invalid posting source: {value}")]
    InvalidPostingSource { value: String },

    /// Invalid booking-category value.
    #[error("invalid booking category: {value}")]
    InvalidBookingCategory { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated employee identifier.
    ///
    /// Employee IDs must be non-empty strings. Uniqueness across tenants is
    /// the caller's concern; the engine treats them as opaque keys.
    EmployeeId, "employee ID"
);

define_string_id!(
    /// A validated booking identifier.
    BookingId, "booking ID"
);

define_string_id!(
    /// A validated ledger account identifier (e.g. "flextime", "overtime").
    AccountId, "account ID"
);

define_string_id!(
    /// A validated order identifier for order-linked bookings.
    OrderId, "order ID"
);

/// A calendar month of a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a year-month after validating the month is in 1..=12.
    pub const fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if month < 1 || month > 12 {
            return Err(ValidationError::MonthOutOfRange { value: month });
        }
        Ok(Self { year, month })
    }

    /// The year-month containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the month (1..=12).
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of the month.
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("validated month always yields a first day")
    }

    /// Last day of the month.
    pub fn last_day(self) -> NaiveDate {
        self.next().first_day().pred_opt().expect("month start has a predecessor")
    }

    /// Whether the date falls inside this month.
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Iterates all dates of the month in order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.first_day()
            .iter_days()
            .take_while(move |d| self.contains(*d))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidYearMonth {
            value: s.to_string(),
        };
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

/// A half-open span of minutes within one day: `[start, end)`.
///
/// Used both for paired booking intervals and for configured rule windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    start: i32,
    end: i32,
}

impl Interval {
    /// Creates an interval, rejecting `end < start`.
    ///
    /// Zero-length intervals are allowed; booking pairs at identical minutes
    /// are valid and contribute no time.
    pub const fn new(start: i32, end: i32) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Start minute (inclusive).
    #[must_use]
    pub const fn start(self) -> i32 {
        self.start
    }

    /// End minute (exclusive).
    #[must_use]
    pub const fn end(self) -> i32 {
        self.end
    }

    /// Length in minutes.
    #[must_use]
    pub const fn minutes(self) -> i32 {
        self.end - self.start
    }

    /// Whether the two intervals share at least one minute.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this interval.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Parses a `HH:MM` clock time into minutes from midnight.
///
/// Accepts `00:00` through `24:00`; `24:00` denotes end of day and is useful
/// for window bounds.
pub fn parse_hhmm(s: &str) -> Result<i32, ValidationError> {
    let invalid = || ValidationError::InvalidTimeOfDay {
        value: s.to_string(),
    };
    let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
    if hours.is_empty() || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    let total = hours * 60 + minutes;
    if total > MINUTES_PER_DAY {
        return Err(invalid());
    }
    Ok(total)
}

/// Formats minutes from midnight as `HH:MM`.
#[must_use]
pub fn format_hhmm(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
