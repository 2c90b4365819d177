//! Configuration loading and management.
//!
//! The config file stands in for the external collaborators the engine
//! expects: a resolved day plan, flextime caps, account mappings and the
//! holiday calendar. Times are written as `HH:MM` strings and parsed into
//! minutes on load.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use wt_core::breaks::BreakRule;
use wt_core::dayplan::Boundary;
use wt_core::ledger::AccountMetric;
use wt_core::rounding::{RoundingMode, RoundingPolicy};
use wt_core::{
    Absence, AccountId, AccountMapping, DayPlan, EmployeeId, FlextimeCaps, Interval, OrderId,
    parse_hhmm,
};
use wt_engine::Calendar;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Flextime caps in minutes.
    #[serde(default)]
    pub caps: CapsConfig,

    /// Account mappings fed by daily calculations.
    #[serde(default = "default_accounts")]
    pub accounts: Vec<AccountConfig>,

    /// Public holidays.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// The day plan applied to every employee-date.
    #[serde(default)]
    pub plan: PlanConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("holidays", &self.holidays.len())
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("wt.db"),
            caps: CapsConfig::default(),
            accounts: default_accounts(),
            holidays: Vec::new(),
            plan: PlanConfig::default(),
        }
    }
}

/// Flextime cap bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CapsConfig {
    /// Most negative allowed balance, in minutes.
    pub lower: i32,
    /// Most positive allowed balance, in minutes.
    pub upper: i32,
}

impl Default for CapsConfig {
    fn default() -> Self {
        // Two target days in either direction.
        Self {
            lower: -960,
            upper: 960,
        }
    }
}

impl From<CapsConfig> for FlextimeCaps {
    fn from(caps: CapsConfig) -> Self {
        Self {
            lower: caps.lower,
            upper: caps.upper,
        }
    }
}

/// One account fed by the daily calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account ID.
    pub account: String,
    /// The metric posted to it.
    pub metric: AccountMetric,
}

fn default_accounts() -> Vec<AccountConfig> {
    vec![
        AccountConfig {
            account: "flextime".to_string(),
            metric: AccountMetric::FlextimeDelta,
        },
        AccountConfig {
            account: "overtime".to_string(),
            metric: AccountMetric::Overtime,
        },
    ]
}

/// One boundary of the configured day plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Expected clock time (`HH:MM`).
    pub expected: Option<String>,
    /// Snap window in minutes.
    #[serde(default)]
    pub tolerance: i32,
    /// Rounding mode.
    #[serde(default)]
    pub rounding: RoundingMode,
    /// Rounding interval in minutes.
    #[serde(default)]
    pub rounding_interval: i32,
}

impl BoundaryConfig {
    fn to_boundary(&self) -> Result<Boundary> {
        Ok(Boundary {
            expected: self.parse_expected()?,
            tolerance: self.tolerance,
            rounding: RoundingPolicy::new(self.rounding, self.rounding_interval),
        })
    }

    fn parse_expected(&self) -> Result<Option<i32>> {
        self.expected
            .as_deref()
            .map(|s| parse_hhmm(s).with_context(|| format!("invalid boundary time {s:?}")))
            .transpose()
    }
}

/// One configured break rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakRuleConfig {
    /// Deduct unconditionally when work touches the window.
    Fixed {
        /// Window start (`HH:MM`).
        from: String,
        /// Window end (`HH:MM`).
        to: String,
        /// Minutes to deduct.
        minutes: i32,
    },
    /// Prefer a booked break in the window, else deduct the default.
    Variable {
        /// Window start (`HH:MM`).
        from: String,
        /// Window end (`HH:MM`).
        to: String,
        /// Default minutes.
        minutes: i32,
    },
    /// Ensure a minimum total break after a worked-time threshold.
    Minimum {
        /// Worked-minutes threshold.
        after_minutes: i32,
        /// Minimum total break minutes.
        minutes: i32,
    },
}

impl BreakRuleConfig {
    fn to_rule(&self) -> Result<BreakRule> {
        Ok(match self {
            Self::Fixed { from, to, minutes } => BreakRule::Fixed {
                window: parse_window(from, to)?,
                minutes: *minutes,
            },
            Self::Variable { from, to, minutes } => BreakRule::Variable {
                window: parse_window(from, to)?,
                minutes: *minutes,
            },
            Self::Minimum {
                after_minutes,
                minutes,
            } => BreakRule::Minimum {
                after_minutes: *after_minutes,
                minutes: *minutes,
            },
        })
    }
}

fn parse_window(from: &str, to: &str) -> Result<Interval> {
    let start = parse_hhmm(from).with_context(|| format!("invalid window start {from:?}"))?;
    let end = parse_hhmm(to).with_context(|| format!("invalid window end {to:?}"))?;
    Interval::new(start, end).with_context(|| format!("invalid window {from:?}..{to:?}"))
}

/// The configured day plan, applied to every date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Come boundary.
    #[serde(default)]
    pub come: BoundaryConfig,
    /// Go boundary.
    #[serde(default)]
    pub go: BoundaryConfig,
    /// Earliest allowed come (`HH:MM`).
    pub earliest_come: Option<String>,
    /// Latest allowed go (`HH:MM`).
    pub latest_go: Option<String>,
    /// Daily target minutes.
    pub target_minutes: i32,
    /// Net-time cap in minutes.
    pub max_net_minutes: Option<i32>,
    /// Break rules in evaluation order.
    #[serde(default)]
    pub breaks: Vec<BreakRuleConfig>,
    /// Credit the target with an order booking on days without bookings.
    #[serde(default)]
    pub credit_missing_with_order: bool,
    /// Default order for auto-generated order bookings.
    pub default_order: Option<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            come: BoundaryConfig::default(),
            go: BoundaryConfig::default(),
            earliest_come: None,
            latest_go: None,
            target_minutes: 480,
            max_net_minutes: None,
            breaks: Vec::new(),
            credit_missing_with_order: false,
            default_order: None,
        }
    }
}

impl PlanConfig {
    /// Resolves the configuration into an engine day plan.
    pub fn to_day_plan(&self) -> Result<DayPlan> {
        let missing_booking_credit = if self.credit_missing_with_order {
            wt_core::MissingBookingCredit::CreditTargetWithOrder
        } else {
            wt_core::MissingBookingCredit::Off
        };
        Ok(DayPlan {
            come: self.come.to_boundary()?,
            go: self.go.to_boundary()?,
            earliest_come: self
                .earliest_come
                .as_deref()
                .map(|s| parse_hhmm(s).with_context(|| format!("invalid earliest come {s:?}")))
                .transpose()?,
            latest_go: self
                .latest_go
                .as_deref()
                .map(|s| parse_hhmm(s).with_context(|| format!("invalid latest go {s:?}")))
                .transpose()?,
            target_minutes: self.target_minutes,
            max_net_minutes: self.max_net_minutes,
            break_rules: self
                .breaks
                .iter()
                .map(BreakRuleConfig::to_rule)
                .collect::<Result<_>>()?,
            missing_booking_credit,
            default_order: self
                .default_order
                .as_deref()
                .map(|o| OrderId::new(o).context("invalid default order"))
                .transpose()?,
        })
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }

    /// The configured account mappings.
    pub fn account_mappings(&self) -> Result<Vec<AccountMapping>> {
        self.accounts
            .iter()
            .map(|a| {
                Ok(AccountMapping {
                    account: AccountId::new(&a.account)
                        .with_context(|| format!("invalid account {:?}", a.account))?,
                    metric: a.metric,
                })
            })
            .collect()
    }
}

/// Calendar backed by the configured holiday list.
///
/// Absence management lives outside this CLI; it answers none.
#[derive(Debug, Clone)]
pub struct ConfigCalendar {
    holidays: Vec<NaiveDate>,
}

impl ConfigCalendar {
    /// Creates a calendar from the configured holidays.
    #[must_use]
    pub fn new(holidays: Vec<NaiveDate>) -> Self {
        Self { holidays }
    }
}

impl Calendar for ConfigCalendar {
    fn absence(&self, _employee: &EmployeeId, _date: NaiveDate) -> Option<Absence> {
        None
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

/// Returns the platform-specific data directory for wt.
///
/// On Linux: `~/.local/share/wt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wt"))
}
