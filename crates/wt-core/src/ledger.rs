//! Deriving account postings from daily results.
//!
//! The ledger itself (running balances, delete-and-replace on recalculation)
//! lives in the storage layer; this module only maps a computed day onto the
//! configured accounts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::daily::DailyValue;
use crate::types::{AccountId, EmployeeId, ValidationError};

/// Where a posting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingSource {
    /// Derived from a daily calculation; replaced on every recalculation.
    DailyCalc,
    /// Entered by an administrator.
    Manual,
    /// Granted as a bonus.
    Bonus,
}

impl PostingSource {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyCalc => "daily_calc",
            Self::Manual => "manual",
            Self::Bonus => "bonus",
        }
    }
}

impl std::str::FromStr for PostingSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_calc" => Ok(Self::DailyCalc),
            "manual" => Ok(Self::Manual),
            "bonus" => Ok(Self::Bonus),
            _ => Err(ValidationError::InvalidPostingSource {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PostingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which computed metric feeds an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMetric {
    /// Daily overtime minutes (non-negative).
    Overtime,
    /// Daily undertime minutes posted as a negative delta.
    Undertime,
    /// Net worked minutes.
    NetTime,
    /// Signed `net − target` delta (the daily flextime movement).
    FlextimeDelta,
}

impl AccountMetric {
    /// The signed minutes this metric contributes for a day.
    #[must_use]
    pub const fn minutes(self, day: &DailyValue) -> i32 {
        match self {
            Self::Overtime => day.overtime,
            Self::Undertime => -day.undertime,
            Self::NetTime => day.net_time,
            Self::FlextimeDelta => day.net_time - day.target_time,
        }
    }
}

/// Maps one metric onto one ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMapping {
    /// Target account.
    pub account: AccountId,
    /// Source metric.
    pub metric: AccountMetric,
}

/// A signed minute delta on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosting {
    /// The employee.
    pub employee: EmployeeId,
    /// The account.
    pub account: AccountId,
    /// The date the delta belongs to.
    pub date: NaiveDate,
    /// Signed minutes.
    pub minutes: i32,
    /// Origin of the posting.
    pub source: PostingSource,
}

/// Derives the `daily_calc` postings for one computed day.
///
/// Zero-minute deltas are skipped: with delete-and-replace semantics an
/// absent posting and a zero posting are indistinguishable, and balances
/// stay free of noise rows.
pub fn derive_postings(day: &DailyValue, mappings: &[AccountMapping]) -> Vec<AccountPosting> {
    mappings
        .iter()
        .filter_map(|mapping| {
            let minutes = mapping.metric.minutes(day);
            if minutes == 0 {
                return None;
            }
            Some(AccountPosting {
                employee: day.employee.clone(),
                account: mapping.account.clone(),
                date: day.date,
                minutes,
                source: PostingSource::DailyCalc,
            })
        })
        .collect()
}
