//! Resolved day-plan configuration.
//!
//! A [`DayPlan`] is the effective configuration for one employee-date,
//! already resolved from tariffs and week plans by an external collaborator.
//! It is plain data consumed by pure functions; the calculation pipeline
//! never reaches back into configuration sources.

use serde::{Deserialize, Serialize};

use crate::breaks::BreakRule;
use crate::rounding::RoundingPolicy;
use crate::tolerance::snap_to_expected;
use crate::types::OrderId;

/// Tolerance and rounding for one boundary (come or go).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// The expected clock time for this boundary, if the plan defines one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<i32>,
    /// Snap window around `expected`, in minutes.
    #[serde(default)]
    pub tolerance: i32,
    /// Rounding applied after the tolerance snap.
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

impl Boundary {
    /// Adjusts a paired time: tolerance snap first, then rounding.
    #[must_use]
    pub fn adjust(&self, time: i32) -> i32 {
        let snapped = match self.expected {
            Some(expected) => snap_to_expected(time, expected, self.tolerance),
            None => time,
        };
        self.rounding.apply(snapped)
    }
}

/// Behavior for days without qualifying bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBookingCredit {
    /// A day without bookings yields zero time (plus missing-booking errors
    /// when the plan expects attendance).
    #[default]
    Off,
    /// Credit the target time and request an order booking from the order
    /// subsystem, as for standing-order personnel without terminals.
    CreditTargetWithOrder,
}

/// Resolved, read-only configuration for one employee-date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Come boundary: expected time, tolerance, rounding.
    pub come: Boundary,
    /// Go boundary: expected time, tolerance, rounding.
    pub go: Boundary,
    /// Earliest allowed (adjusted) come time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_come: Option<i32>,
    /// Latest allowed (adjusted) go time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_go: Option<i32>,
    /// Contractual target minutes for the day.
    pub target_minutes: i32,
    /// Cap on net work time, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_net_minutes: Option<i32>,
    /// Break deduction rules, evaluated in this order.
    #[serde(default)]
    pub break_rules: Vec<BreakRule>,
    /// Handling of days without qualifying bookings.
    #[serde(default)]
    pub missing_booking_credit: MissingBookingCredit,
    /// Default order for auto-generated order bookings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_order: Option<OrderId>,
}
