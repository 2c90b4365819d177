//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use wt_core::{BookingCategory, YearMonth};

/// Workforce time tracking.
///
/// Records clock bookings, runs the daily and monthly calculation pipeline
/// and manages month closing and account balances.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage clock bookings.
    Booking {
        #[command(subcommand)]
        action: BookingAction,
    },

    /// Recalculate a day or a whole month.
    Recalc {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// A single date (YYYY-MM-DD).
        #[arg(long, conflicts_with = "month")]
        date: Option<NaiveDate>,

        /// A whole month (YYYY-MM).
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Aggregate, close, reopen or show a month.
    Month {
        #[command(subcommand)]
        action: MonthAction,
    },

    /// Show one day's calculated value with its warnings.
    Day {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a running account balance.
    Balance {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// Account ID (e.g. flextime, overtime).
        #[arg(long)]
        account: String,

        /// Balance as of this date (YYYY-MM-DD).
        #[arg(long)]
        as_of: NaiveDate,
    },
}

/// Booking subcommands.
#[derive(Debug, Subcommand)]
pub enum BookingAction {
    /// Record a new booking.
    Add {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Category: work_start, work_end, break_start, break_end,
        /// order_start, order_end.
        #[arg(long)]
        category: BookingCategory,

        /// Clock time (HH:MM).
        #[arg(long)]
        time: String,

        /// Optional note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Correct a booking's time.
    Edit {
        /// Booking ID.
        id: String,

        /// New clock time (HH:MM).
        #[arg(long)]
        time: String,
    },

    /// Set or clear a booking's note.
    Note {
        /// Booking ID.
        id: String,

        /// The note; omit to clear.
        #[arg(long)]
        note: Option<String>,
    },

    /// List one day's bookings.
    List {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,
    },
}

/// Month subcommands.
#[derive(Debug, Subcommand)]
pub enum MonthAction {
    /// Aggregate a month from its daily values.
    Aggregate {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The month (YYYY-MM).
        #[arg(long)]
        month: YearMonth,
    },

    /// Close a month against further changes.
    Close {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The month (YYYY-MM).
        #[arg(long)]
        month: YearMonth,
    },

    /// Reopen a closed month.
    Reopen {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The month (YYYY-MM).
        #[arg(long)]
        month: YearMonth,
    },

    /// Show an aggregated month.
    Show {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// The month (YYYY-MM).
        #[arg(long)]
        month: YearMonth,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
