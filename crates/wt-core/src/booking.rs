//! Raw clock events and their edit semantics.
//!
//! A booking keeps three times: the terminal-reported `original_time` (set
//! once, never changed), the correctable `edited_time`, and the derived
//! `calculated_time` written back by the daily calculation. Editing the time
//! invalidates the derived value; editing anything else does not.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BookingId, EmployeeId, OrderId, ValidationError};

/// Which interval kind a booking belongs to once paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairKind {
    /// Regular work interval.
    Work,
    /// Break interval.
    Break,
    /// Order-linked work interval.
    Order,
}

impl PairKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
            Self::Order => "order",
        }
    }

    /// Whether intervals of this kind count toward gross work time.
    #[must_use]
    pub const fn is_work_time(self) -> bool {
        matches!(self, Self::Work | Self::Order)
    }
}

/// The category of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingCategory {
    /// Start of a work interval (come).
    WorkStart,
    /// Start of an order-linked work interval.
    OrderStart,
    /// Start of a break.
    BreakStart,
    /// End of a break.
    BreakEnd,
    /// End of an order-linked work interval.
    OrderEnd,
    /// End of a work interval (go).
    WorkEnd,
}

impl BookingCategory {
    /// The interval kind this category opens or closes.
    #[must_use]
    pub const fn kind(self) -> PairKind {
        match self {
            Self::WorkStart | Self::WorkEnd => PairKind::Work,
            Self::BreakStart | Self::BreakEnd => PairKind::Break,
            Self::OrderStart | Self::OrderEnd => PairKind::Order,
        }
    }

    /// Whether this category opens an interval.
    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(self, Self::WorkStart | Self::BreakStart | Self::OrderStart)
    }

    /// Deterministic ordering for bookings sharing the same minute.
    ///
    /// Starts sort before ends, and outer kinds open first and close last, so
    /// a break starting the minute work starts nests inside the work interval:
    /// work-start, order-start, break-start, break-end, order-end, work-end.
    #[must_use]
    pub const fn sort_rank(self) -> u8 {
        match self {
            Self::WorkStart => 0,
            Self::OrderStart => 1,
            Self::BreakStart => 2,
            Self::BreakEnd => 3,
            Self::OrderEnd => 4,
            Self::WorkEnd => 5,
        }
    }

    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkStart => "work_start",
            Self::OrderStart => "order_start",
            Self::BreakStart => "break_start",
            Self::BreakEnd => "break_end",
            Self::OrderEnd => "order_end",
            Self::WorkEnd => "work_end",
        }
    }
}

impl std::str::FromStr for BookingCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work_start" => Ok(Self::WorkStart),
            "order_start" => Ok(Self::OrderStart),
            "break_start" => Ok(Self::BreakStart),
            "break_end" => Ok(Self::BreakEnd),
            "order_end" => Ok(Self::OrderEnd),
            "work_end" => Ok(Self::WorkEnd),
            _ => Err(ValidationError::InvalidBookingCategory {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for BookingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single clock event for an employee on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier.
    pub id: BookingId,
    /// The employee who clocked.
    pub employee: EmployeeId,
    /// The calendar date the event belongs to.
    pub date: NaiveDate,
    /// The event category.
    pub category: BookingCategory,
    /// Order linked to an order-category booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderId>,
    // The terminal-reported time. Set once in the constructor; there is no
    // mutator, which is what keeps it immutable across all update paths.
    original_time: i32,
    edited_time: i32,
    calculated_time: Option<i32>,
    /// The counterpart booking once paired, symmetric or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<BookingId>,
    /// Free-form annotation; editing it never touches the time fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Booking {
    /// Creates a booking from a terminal event.
    ///
    /// `edited_time` starts equal to `original_time`.
    pub fn new(
        id: BookingId,
        employee: EmployeeId,
        date: NaiveDate,
        category: BookingCategory,
        original_time: i32,
    ) -> Self {
        Self {
            id,
            employee,
            date,
            category,
            order: None,
            original_time,
            edited_time: original_time,
            calculated_time: None,
            pair_id: None,
            note: None,
        }
    }

    /// Restores a booking from storage with all time fields explicit.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: BookingId,
        employee: EmployeeId,
        date: NaiveDate,
        category: BookingCategory,
        order: Option<OrderId>,
        original_time: i32,
        edited_time: i32,
        calculated_time: Option<i32>,
        pair_id: Option<BookingId>,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            employee,
            date,
            category,
            order,
            original_time,
            edited_time,
            calculated_time,
            pair_id,
            note,
        }
    }

    /// The time reported by the terminal, in minutes from midnight.
    #[must_use]
    pub const fn original_time(&self) -> i32 {
        self.original_time
    }

    /// The corrected time, defaulting to the original.
    #[must_use]
    pub const fn edited_time(&self) -> i32 {
        self.edited_time
    }

    /// The derived time written back by the last calculation, if any.
    #[must_use]
    pub const fn calculated_time(&self) -> Option<i32> {
        self.calculated_time
    }

    /// The time the current calculation stage should use:
    /// calculated if present, otherwise edited.
    #[must_use]
    pub const fn effective_time(&self) -> i32 {
        match self.calculated_time {
            Some(t) => t,
            None => self.edited_time,
        }
    }

    /// Corrects the booking time.
    ///
    /// Clears `calculated_time`: a stale derived value must never survive a
    /// manual correction.
    pub fn set_edited_time(&mut self, minutes: i32) {
        self.edited_time = minutes;
        self.calculated_time = None;
    }

    /// Replaces the annotation without touching any time field.
    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
    }

    /// Applies the calculation write-back: derived time and pair link.
    pub fn apply_calculation(&mut self, calculated_time: Option<i32>, pair_id: Option<BookingId>) {
        self.calculated_time = calculated_time;
        self.pair_id = pair_id;
    }
}
