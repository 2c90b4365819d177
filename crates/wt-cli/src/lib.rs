//! Worktime CLI library.
//!
//! This crate provides the CLI interface for the worktime calculation
//! engine. The config file stands in for the external collaborators (plan
//! resolution, calendar, account definitions); everything else goes through
//! `wt-engine`.

mod cli;
pub mod commands;
mod config;

pub use cli::{BookingAction, Cli, Commands, MonthAction};
pub use config::{Config, ConfigCalendar};

/// The engine as assembled by this CLI: one configured plan for every date,
/// a holiday calendar from the config file, no absence source.
pub type WtEngine = wt_engine::Engine<wt_engine::StaticPlan, ConfigCalendar>;
