//! Data-quality error codes.
//!
//! These codes are advisory: they flag a day for the external correction
//! workflow but never block the calculation. Infrastructure failures use the
//! error types of the storage and engine crates instead.

use serde::{Deserialize, Serialize};

use crate::dayplan::DayPlan;
use crate::pairing::{Pairing, UnpairedReason};
use crate::types::ValidationError;

/// A rule violation detected during daily calculation.
///
/// The declaration order is the stable emission order of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A work or break interval ended without a matching start.
    MissingCome,
    /// A work or break interval was still open at the end of the day.
    MissingGo,
    /// A second start arrived while an interval of the same kind was open.
    OverlappingBookings,
    /// Net time exceeded the plan's cap and was clamped.
    ExceededMaxNetTime,
    /// Adjusted come time was earlier than the plan allows.
    CameBeforeAllowed,
    /// Adjusted go time was later than the plan allows.
    LeftAfterAllowed,
    /// Auto-credit mode had no default order to book against.
    NoDefaultOrder,
    /// The order subsystem rejected or never received the order booking.
    OrderBookingCreateFailed,
}

impl ErrorCode {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCome => "MISSING_COME",
            Self::MissingGo => "MISSING_GO",
            Self::OverlappingBookings => "OVERLAPPING_BOOKINGS",
            Self::ExceededMaxNetTime => "EXCEEDED_MAX_NET_TIME",
            Self::CameBeforeAllowed => "CAME_BEFORE_ALLOWED",
            Self::LeftAfterAllowed => "LEFT_AFTER_ALLOWED",
            Self::NoDefaultOrder => "NO_DEFAULT_ORDER",
            Self::OrderBookingCreateFailed => "ORDER_BOOKING_CREATE_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ErrorCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MISSING_COME" => Ok(Self::MissingCome),
            "MISSING_GO" => Ok(Self::MissingGo),
            "OVERLAPPING_BOOKINGS" => Ok(Self::OverlappingBookings),
            "EXCEEDED_MAX_NET_TIME" => Ok(Self::ExceededMaxNetTime),
            "CAME_BEFORE_ALLOWED" => Ok(Self::CameBeforeAllowed),
            "LEFT_AFTER_ALLOWED" => Ok(Self::LeftAfterAllowed),
            "NO_DEFAULT_ORDER" => Ok(Self::NoDefaultOrder),
            "ORDER_BOOKING_CREATE_FAILED" => Ok(Self::OrderBookingCreateFailed),
            _ => Err(ValidationError::InvalidErrorCode {
                value: s.to_string(),
            }),
        }
    }
}

/// Everything the detector inspects after a day has been computed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorContext<'a> {
    /// Pairing outcome for the day, if booking processing ran.
    pub pairing: Option<&'a Pairing>,
    /// Adjusted come time of the first work pair.
    pub adjusted_come: Option<i32>,
    /// Adjusted go time of the last work pair.
    pub adjusted_go: Option<i32>,
    /// The day plan in effect.
    pub plan: Option<&'a DayPlan>,
    /// Net time was clamped to the plan's cap.
    pub exceeded_max_net: bool,
    /// Auto-credit mode found no default order.
    pub missing_default_order: bool,
    /// The order-booking side effect could not be delivered.
    pub order_booking_failed: bool,
}

/// Inspects computed state and returns error codes in stable order.
///
/// Each code appears at most once regardless of how many findings map to it.
pub fn detect(ctx: &ErrorContext<'_>) -> Vec<ErrorCode> {
    let mut codes = Vec::new();

    if let Some(pairing) = ctx.pairing {
        if pairing.has_unpaired(UnpairedReason::EndWithoutStart) {
            codes.push(ErrorCode::MissingCome);
        }
        if pairing.has_unpaired(UnpairedReason::StartWithoutEnd) {
            codes.push(ErrorCode::MissingGo);
        }
        if pairing.has_unpaired(UnpairedReason::Overlapping) {
            codes.push(ErrorCode::OverlappingBookings);
        }
    }

    if ctx.exceeded_max_net {
        codes.push(ErrorCode::ExceededMaxNetTime);
    }

    if let Some(plan) = ctx.plan {
        if let (Some(come), Some(earliest)) = (ctx.adjusted_come, plan.earliest_come) {
            if come < earliest {
                codes.push(ErrorCode::CameBeforeAllowed);
            }
        }
        if let (Some(go), Some(latest)) = (ctx.adjusted_go, plan.latest_go) {
            if go > latest {
                codes.push(ErrorCode::LeftAfterAllowed);
            }
        }
    }

    if ctx.missing_default_order {
        codes.push(ErrorCode::NoDefaultOrder);
    }
    if ctx.order_booking_failed {
        codes.push(ErrorCode::OrderBookingCreateFailed);
    }

    codes.sort_unstable();
    codes.dedup();
    codes
}
