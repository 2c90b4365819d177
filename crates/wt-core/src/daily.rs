//! Daily calculation: raw bookings to one validated `DailyValue`.
//!
//! # Pipeline
//!
//! 1. Credited days (holiday, crediting absence, auto-credit mode) skip
//!    booking processing and take the target minutes directly.
//! 2. Otherwise: pair bookings, adjust each work-pair boundary (tolerance
//!    snap, then rounding), sum gross time, resolve breaks, clamp to the
//!    net-time cap, derive overtime/undertime.
//! 3. Error detection always runs last; data-quality findings ride along in
//!    the result and never abort the calculation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::Booking;
use crate::breaks::resolve_breaks;
use crate::dayplan::{DayPlan, MissingBookingCredit};
use crate::errors::{ErrorCode, ErrorContext, detect};
use crate::pairing::{BookingPair, pair_bookings};
use crate::types::{BookingId, EmployeeId, Interval, OrderId};

/// How much of the daily target an absence credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsenceCredit {
    /// The absence credits the full target (vacation, paid sick leave).
    Full,
    /// The absence credits half the target.
    Half,
    /// The absence does not credit hours (unpaid leave).
    None,
}

impl AbsenceCredit {
    /// Credited minutes for a given daily target, if the absence credits any.
    #[must_use]
    pub const fn credited_minutes(self, target: i32) -> Option<i32> {
        match self {
            Self::Full => Some(target),
            Self::Half => Some(target / 2),
            Self::None => None,
        }
    }
}

/// An absence recorded for an employee-date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    /// How the absence counts toward the target.
    pub credit: AbsenceCredit,
}

/// A request for an auto-generated order booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookingRequest {
    /// The employee the booking is for.
    pub employee: EmployeeId,
    /// The date being credited.
    pub date: NaiveDate,
    /// The order to book against.
    pub order: OrderId,
    /// Credited minutes.
    pub minutes: i32,
}

/// Failure reported by the order subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The subsystem could not be reached.
    #[error("order subsystem unavailable")]
    Unavailable,
    /// The subsystem rejected the booking.
    #[error("order booking rejected: {reason}")]
    Rejected {
        /// Reason given by the subsystem.
        reason: String,
    },
}

/// Sink for auto-generated order bookings.
///
/// Injected as an optional dependency: the calculator runs without one, and
/// a missing or failing sink degrades to a warning code on the day, never a
/// hard failure.
pub trait OrderSink {
    /// Delivers an order-booking request. Fire-and-forget semantics.
    fn create_order_booking(&self, request: &OrderBookingRequest) -> Result<(), OrderError>;
}

/// Computed work metrics for one employee-date.
///
/// Created or replaced wholesale on every (re)calculation, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyValue {
    /// The employee.
    pub employee: EmployeeId,
    /// The date.
    pub date: NaiveDate,
    /// Worked minutes before break deduction.
    pub gross_time: i32,
    /// Worked minutes after break deduction (and the net cap).
    pub net_time: i32,
    /// Contractual target minutes.
    pub target_time: i32,
    /// `max(0, net − target)`.
    pub overtime: i32,
    /// `max(0, target − net)`.
    pub undertime: i32,
    /// Deducted break minutes.
    pub break_time: i32,
    /// Whether any error code was detected.
    pub has_error: bool,
    /// Detected codes in stable order.
    pub error_codes: Vec<ErrorCode>,
    /// When the value was computed; `None` only for never-calculated rows.
    pub calculated_at: Option<DateTime<Utc>>,
}

/// Write-back for one booking after calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingUpdate {
    /// The booking to update.
    pub booking_id: BookingId,
    /// New derived time (`None` clears a stale one).
    pub calculated_time: Option<i32>,
    /// New pair link (`None` clears a stale one).
    pub pair_id: Option<BookingId>,
}

/// Input of one daily calculation.
#[derive(Debug, Clone, Copy)]
pub struct DayInput<'a> {
    /// The employee.
    pub employee: &'a EmployeeId,
    /// The date.
    pub date: NaiveDate,
    /// Resolved plan for the date.
    pub plan: &'a DayPlan,
    /// All of the day's bookings, any order.
    pub bookings: &'a [Booking],
    /// Absence recorded for the date, if any.
    pub absence: Option<&'a Absence>,
    /// Whether the date is a public holiday.
    pub is_holiday: bool,
}

/// Result of one daily calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCalculation {
    /// The computed daily value.
    pub value: DailyValue,
    /// Booking write-backs (derived times, pair links).
    pub booking_updates: Vec<BookingUpdate>,
}

/// Runs the daily calculation with the current wall clock.
pub fn calculate(input: &DayInput<'_>, orders: Option<&dyn OrderSink>) -> DayCalculation {
    calculate_at(input, orders, Utc::now())
}

/// Runs the daily calculation with an explicit timestamp.
///
/// `now` only lands in `calculated_at`; injecting it keeps recalculation
/// byte-identical for unchanged inputs.
pub fn calculate_at(
    input: &DayInput<'_>,
    orders: Option<&dyn OrderSink>,
    now: DateTime<Utc>,
) -> DayCalculation {
    let plan = input.plan;

    if input.is_holiday {
        return credited(input, plan.target_minutes, Vec::new(), now);
    }
    if let Some(absence) = input.absence {
        if let Some(minutes) = absence.credit.credited_minutes(plan.target_minutes) {
            return credited(input, minutes, Vec::new(), now);
        }
    }

    let has_work_bookings = input
        .bookings
        .iter()
        .any(|b| b.category.kind().is_work_time());
    if plan.missing_booking_credit == MissingBookingCredit::CreditTargetWithOrder
        && !has_work_bookings
    {
        let (missing_default_order, order_booking_failed) = request_order_booking(input, orders);
        let codes = detect(&ErrorContext {
            missing_default_order,
            order_booking_failed,
            ..ErrorContext::default()
        });
        return credited(input, plan.target_minutes, codes, now);
    }

    let pairing = pair_bookings(input.bookings);

    // Adjust each work-kind pair: come boundary on the start, go boundary on
    // the end. Mid-day pairs sit outside the tolerance windows and only see
    // rounding. Breaks are never adjusted.
    let mut work_intervals = Vec::new();
    let mut adjusted_come: Option<i32> = None;
    let mut adjusted_go: Option<i32> = None;
    let mut updates = Vec::new();
    for pair in &pairing.pairs {
        if pair.kind.is_work_time() {
            let start = plan.come.adjust(pair.start);
            // Rounding both boundaries of a short pair can cross them over;
            // the interval floor is the adjusted start.
            let end = plan.go.adjust(pair.end).max(start);
            work_intervals
                .push(Interval::new(start, end).expect("adjusted end is floored at start"));
            adjusted_come = Some(adjusted_come.map_or(start, |c: i32| c.min(start)));
            adjusted_go = Some(adjusted_go.map_or(end, |g: i32| g.max(end)));
            updates.extend(pair_update(pair, Some(start), Some(end)));
        } else {
            updates.extend(pair_update(pair, None, None));
        }
    }
    for unpaired in &pairing.unpaired {
        updates.push(BookingUpdate {
            booking_id: unpaired.booking_id.clone(),
            calculated_time: None,
            pair_id: None,
        });
    }
    let booking_updates = updates;

    let gross_time: i32 = work_intervals.iter().map(|i| i.minutes()).sum();
    let resolution = resolve_breaks(&work_intervals, &pairing.break_intervals(), &plan.break_rules);

    let mut net_time = resolution.net_minutes;
    let mut exceeded_max_net = false;
    if let Some(cap) = plan.max_net_minutes {
        if net_time > cap {
            net_time = cap;
            exceeded_max_net = true;
        }
    }

    let target_time = plan.target_minutes;
    let error_codes = detect(&ErrorContext {
        pairing: Some(&pairing),
        adjusted_come,
        adjusted_go,
        plan: Some(plan),
        exceeded_max_net,
        missing_default_order: false,
        order_booking_failed: false,
    });

    tracing::debug!(
        employee = %input.employee,
        date = %input.date,
        gross_time,
        net_time,
        break_time = resolution.break_minutes,
        error_count = error_codes.len(),
        "daily calculation complete"
    );

    DayCalculation {
        value: DailyValue {
            employee: input.employee.clone(),
            date: input.date,
            gross_time,
            net_time,
            target_time,
            overtime: (net_time - target_time).max(0),
            undertime: (target_time - net_time).max(0),
            break_time: resolution.break_minutes,
            has_error: !error_codes.is_empty(),
            error_codes,
            calculated_at: Some(now),
        },
        booking_updates,
    }
}

/// Builds a credited day: gross, net and target all equal the credited
/// minutes, so over- and undertime are zero by construction.
fn credited(
    input: &DayInput<'_>,
    minutes: i32,
    error_codes: Vec<ErrorCode>,
    now: DateTime<Utc>,
) -> DayCalculation {
    DayCalculation {
        value: DailyValue {
            employee: input.employee.clone(),
            date: input.date,
            gross_time: minutes,
            net_time: minutes,
            target_time: minutes,
            overtime: 0,
            undertime: 0,
            break_time: 0,
            has_error: !error_codes.is_empty(),
            error_codes,
            calculated_at: Some(now),
        },
        booking_updates: Vec::new(),
    }
}

/// Requests the order-booking side effect for an auto-credited day.
///
/// Never blocks the credit: every failure mode maps to a warning flag for
/// the error detector. Returns `(missing_default_order, booking_failed)`.
fn request_order_booking(
    input: &DayInput<'_>,
    orders: Option<&dyn OrderSink>,
) -> (bool, bool) {
    let Some(order) = input.plan.default_order.clone() else {
        return (true, false);
    };
    let request = OrderBookingRequest {
        employee: input.employee.clone(),
        date: input.date,
        order,
        minutes: input.plan.target_minutes,
    };
    match orders {
        Some(sink) => match sink.create_order_booking(&request) {
            Ok(()) => (false, false),
            Err(error) => {
                tracing::warn!(
                    employee = %input.employee,
                    date = %input.date,
                    %error,
                    "order booking could not be created"
                );
                (false, true)
            }
        },
        None => (false, true),
    }
}

/// Write-backs for both sides of a pair.
fn pair_update(
    pair: &BookingPair,
    start_time: Option<i32>,
    end_time: Option<i32>,
) -> [BookingUpdate; 2] {
    [
        BookingUpdate {
            booking_id: pair.start_id.clone(),
            calculated_time: start_time,
            pair_id: Some(pair.end_id.clone()),
        },
        BookingUpdate {
            booking_id: pair.end_id.clone(),
            calculated_time: end_time,
            pair_id: Some(pair.start_id.clone()),
        },
    ]
}
