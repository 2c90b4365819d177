//! Monthly aggregation with capped flextime carryover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::daily::DailyValue;
use crate::types::{EmployeeId, YearMonth};

/// Bounds on the running flextime balance.
///
/// `lower` is at most zero, `upper` at least zero; anything clamped away at
/// month end is forfeited, not deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlextimeCaps {
    /// Most negative allowed balance, in minutes.
    pub lower: i32,
    /// Most positive allowed balance, in minutes.
    pub upper: i32,
}

impl FlextimeCaps {
    /// Caps wide enough to never clamp.
    pub const UNBOUNDED: Self = Self {
        lower: i32::MIN,
        upper: i32::MAX,
    };

    /// Clamps a balance into the cap range.
    #[must_use]
    pub const fn clamp(self, balance: i32) -> i32 {
        if balance < self.lower {
            self.lower
        } else if balance > self.upper {
            self.upper
        } else {
            balance
        }
    }
}

/// Aggregated work metrics for one employee-month.
///
/// Created or replaced wholesale by aggregation; the closing flags are
/// managed by the close/reopen operations, never by aggregation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyValue {
    /// The employee.
    pub employee: EmployeeId,
    /// The month.
    pub month: YearMonth,
    /// Sum of daily gross minutes.
    pub gross_time: i32,
    /// Sum of daily net minutes.
    pub net_time: i32,
    /// Sum of daily target minutes.
    pub target_time: i32,
    /// Sum of daily overtime minutes.
    pub overtime: i32,
    /// Sum of daily undertime minutes.
    pub undertime: i32,
    /// Sum of daily break minutes.
    pub break_time: i32,
    /// Number of days carrying at least one error code.
    pub error_days: i32,
    /// Balance carried in from the previous month.
    pub flextime_start: i32,
    /// This month's net-minus-target delta.
    pub flextime_change: i32,
    /// `start + change`, clamped into the caps.
    pub flextime_end: i32,
    /// Minutes clamped away by the caps (signed), reported for audit.
    pub forfeited: i32,
    /// Whether the month is closed against mutation.
    pub is_closed: bool,
    /// When the month was closed.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Sums a month of daily values and rolls the flextime balance forward.
///
/// Days absent from `days` simply contribute nothing; completeness of the
/// input is the caller's concern. `previous_flextime_end` is the prior
/// month's `flextime_end` (zero for the first tracked month).
pub fn aggregate(
    employee: &EmployeeId,
    month: YearMonth,
    days: &[DailyValue],
    previous_flextime_end: i32,
    caps: FlextimeCaps,
) -> MonthlyValue {
    let mut gross_time = 0;
    let mut net_time = 0;
    let mut target_time = 0;
    let mut overtime = 0;
    let mut undertime = 0;
    let mut break_time = 0;
    let mut error_days = 0;

    for day in days {
        gross_time += day.gross_time;
        net_time += day.net_time;
        target_time += day.target_time;
        overtime += day.overtime;
        undertime += day.undertime;
        break_time += day.break_time;
        if day.has_error {
            error_days += 1;
        }
    }

    let flextime_change = net_time - target_time;
    let unclamped = previous_flextime_end + flextime_change;
    let flextime_end = caps.clamp(unclamped);

    MonthlyValue {
        employee: employee.clone(),
        month,
        gross_time,
        net_time,
        target_time,
        overtime,
        undertime,
        break_time,
        error_days,
        flextime_start: previous_flextime_end,
        flextime_change,
        flextime_end,
        forfeited: unclamped - flextime_end,
        is_closed: false,
        closed_at: None,
    }
}
