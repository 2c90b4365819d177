//! Core calculation engine for the worktime platform.
//!
//! This crate turns raw clock events into validated daily work metrics and
//! rolls them into monthly balances:
//! - Pairing: matching a day's bookings into work/break intervals
//! - Adjustment: tolerance snapping and rounding of paired boundaries
//! - Breaks: fixed/variable/minimum deduction rules
//! - Daily calculation: gross/net/target/overtime with error detection
//! - Monthly aggregation: sums plus capped flextime carryover
//! - Ledger derivation: mapping computed metrics onto accounts
//!
//! Everything here is pure computation over resolved configuration; storage,
//! plan resolution and the closing gate live in the surrounding crates.

pub mod booking;
pub mod breaks;
pub mod daily;
pub mod dayplan;
pub mod errors;
pub mod ledger;
pub mod monthly;
pub mod pairing;
pub mod rounding;
pub mod tolerance;
pub mod types;

pub use booking::{Booking, BookingCategory, PairKind};
pub use breaks::{BreakResolution, BreakRule, resolve_breaks};
pub use daily::{
    Absence, AbsenceCredit, BookingUpdate, DailyValue, DayCalculation, DayInput,
    OrderBookingRequest, OrderError, OrderSink, calculate, calculate_at,
};
pub use dayplan::{Boundary, DayPlan, MissingBookingCredit};
pub use errors::{ErrorCode, ErrorContext, detect};
pub use ledger::{AccountMapping, AccountMetric, AccountPosting, PostingSource, derive_postings};
pub use monthly::{FlextimeCaps, MonthlyValue, aggregate};
pub use pairing::{BookingPair, Pairing, Unpaired, UnpairedReason, pair_bookings};
pub use rounding::{RoundingMode, RoundingPolicy};
pub use tolerance::snap_to_expected;
pub use types::{
    AccountId, BookingId, EmployeeId, Interval, OrderId, ValidationError, YearMonth, format_hhmm,
    parse_hhmm,
};
