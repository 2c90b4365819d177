//! Storage layer for the worktime calculation engine.
//!
//! Provides persistence for bookings, daily and monthly values and account
//! postings using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared without external synchronization; the engine crate serializes
//! access behind a `Mutex<Database>`.
//!
//! # Closed months
//!
//! Every mutating operation checks the closing state of the affected
//! (employee, year, month) before touching a row and fails with
//! [`StoreError::MonthClosed`] while the month is closed. The check runs
//! inside the same transaction as the write, so a close racing a
//! recalculation can never leave partial state.
//!
//! # Schema
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` form; lexicographic ordering
//! matches chronological ordering, which keeps range queries on TEXT columns
//! correct. Timestamps are TEXT in RFC 3339 (always UTC). Error-code lists
//! are stored as a JSON array in a TEXT column.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use wt_core::daily::BookingUpdate;
use wt_core::ledger::{AccountPosting, PostingSource};
use wt_core::{
    AccountId, Booking, BookingCategory, BookingId, DailyValue, EmployeeId, ErrorCode,
    MonthlyValue, OrderId, YearMonth,
};

/// Storage errors.
///
/// All variants are infrastructure failures: they abort the write and
/// propagate to the caller, unlike the advisory [`ErrorCode`]s that ride
/// inside a [`DailyValue`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The month is closed; an explicit reopen is required before mutation.
    #[error("month {year:04}-{month:02} is closed for employee {employee}; reopen required")]
    MonthClosed {
        employee: String,
        year: i32,
        month: u32,
    },
    /// The month has never been aggregated, so it cannot be closed.
    #[error("month {year:04}-{month:02} has not been aggregated for employee {employee}")]
    MonthNotAggregated {
        employee: String,
        year: i32,
        month: u32,
    },
    /// A booking ID did not resolve to a stored booking.
    #[error("unknown booking: {id}")]
    UnknownBooking { id: String },
    /// A stored date could not be parsed.
    #[error("invalid stored date: {value}")]
    DateParse { value: String },
    /// A stored timestamp could not be parsed.
    #[error("invalid stored timestamp: {value}")]
    TimestampParse { value: String },
    /// A stored enum or ID column held an unexpected value.
    #[error("invalid stored {column}: {value}")]
    InvalidColumn { column: &'static str, value: String },
    /// Error-code list could not be (de)serialized.
    #[error("invalid error-code list: {0}")]
    ErrorCodes(#[from] serde_json::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- Raw clock events. original_time is written once on insert and
            -- never updated by any statement in this crate.
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                employee TEXT NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                order_id TEXT,
                original_time INTEGER NOT NULL,
                edited_time INTEGER NOT NULL,
                calculated_time INTEGER,
                pair_id TEXT,
                note TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_bookings_day ON bookings(employee, date);

            -- One row per employee-date, replaced wholesale on recalculation.
            CREATE TABLE IF NOT EXISTS daily_values (
                employee TEXT NOT NULL,
                date TEXT NOT NULL,
                gross_time INTEGER NOT NULL,
                net_time INTEGER NOT NULL,
                target_time INTEGER NOT NULL,
                overtime INTEGER NOT NULL,
                undertime INTEGER NOT NULL,
                break_time INTEGER NOT NULL,
                has_error INTEGER NOT NULL,
                error_codes TEXT NOT NULL,
                calculated_at TEXT,
                PRIMARY KEY (employee, date)
            );

            -- One row per employee-month; is_closed gates all mutation of
            -- the month's bookings, daily values and postings.
            CREATE TABLE IF NOT EXISTS monthly_values (
                employee TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                gross_time INTEGER NOT NULL,
                net_time INTEGER NOT NULL,
                target_time INTEGER NOT NULL,
                overtime INTEGER NOT NULL,
                undertime INTEGER NOT NULL,
                break_time INTEGER NOT NULL,
                error_days INTEGER NOT NULL,
                flextime_start INTEGER NOT NULL,
                flextime_change INTEGER NOT NULL,
                flextime_end INTEGER NOT NULL,
                forfeited INTEGER NOT NULL,
                is_closed INTEGER NOT NULL DEFAULT 0,
                closed_at TEXT,
                PRIMARY KEY (employee, year, month)
            );

            -- Signed minute deltas per account; daily_calc rows are replaced
            -- as a set whenever their date is recalculated.
            CREATE TABLE IF NOT EXISTS account_values (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee TEXT NOT NULL,
                account TEXT NOT NULL,
                date TEXT NOT NULL,
                minutes INTEGER NOT NULL,
                source TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_account_values_balance
                ON account_values(employee, account, date);
            CREATE INDEX IF NOT EXISTS idx_account_values_day
                ON account_values(employee, date, source);
            ",
        )?;
        Ok(())
    }

    // ========== Bookings ==========

    /// Inserts a new booking. The month must be open.
    pub fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        ensure_month_open(&tx, &booking.employee, YearMonth::of(booking.date))?;
        tx.execute(
            "
            INSERT INTO bookings
            (id, employee, date, category, order_id, original_time, edited_time, calculated_time, pair_id, note)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                booking.id.as_str(),
                booking.employee.as_str(),
                format_date(booking.date),
                booking.category.as_str(),
                booking.order.as_ref().map(OrderId::as_str),
                booking.original_time(),
                booking.edited_time(),
                booking.calculated_time(),
                booking.pair_id.as_ref().map(BookingId::as_str),
                booking.note.as_deref(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Fetches one booking by ID.
    pub fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, employee, date, category, order_id, original_time, edited_time,
                       calculated_time, pair_id, note
                FROM bookings WHERE id = ?
                ",
                params![id.as_str()],
                booking_row,
            )
            .optional()?;
        row.map(BookingRow::into_booking).transpose()
    }

    /// Lists one employee-day's bookings ordered by edited time, then ID.
    pub fn bookings_for_day(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee, date, category, order_id, original_time, edited_time,
                   calculated_time, pair_id, note
            FROM bookings
            WHERE employee = ? AND date = ?
            ORDER BY edited_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![employee.as_str(), format_date(date)], booking_row)?;
        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?.into_booking()?);
        }
        Ok(bookings)
    }

    /// Corrects a booking's time.
    ///
    /// Sets `edited_time` and clears `calculated_time`; the stale derived
    /// value must not survive a manual correction. The month must be open.
    pub fn update_booking_time(&mut self, id: &BookingId, minutes: i32) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let (employee, date) = booking_day(&tx, id)?;
        ensure_month_open(&tx, &employee, YearMonth::of(date))?;
        tx.execute(
            "UPDATE bookings SET edited_time = ?, calculated_time = NULL WHERE id = ?",
            params![minutes, id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Replaces a booking's note. Touches no time field. The month must be
    /// open.
    pub fn update_booking_note(
        &mut self,
        id: &BookingId,
        note: Option<&str>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let (employee, date) = booking_day(&tx, id)?;
        ensure_month_open(&tx, &employee, YearMonth::of(date))?;
        tx.execute(
            "UPDATE bookings SET note = ? WHERE id = ?",
            params![note, id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ========== Daily values and postings ==========

    /// Commits one day's calculation atomically.
    ///
    /// In a single transaction: rejects closed months, replaces the
    /// [`DailyValue`] wholesale, deletes the date's `daily_calc` postings and
    /// inserts the new set, and writes derived times and pair links back to
    /// the bookings. Running it twice with the same inputs leaves identical
    /// state - recalculation never appends duplicates.
    pub fn apply_day_calculation(
        &mut self,
        daily: &DailyValue,
        postings: &[AccountPosting],
        booking_updates: &[BookingUpdate],
    ) -> Result<(), StoreError> {
        let date = format_date(daily.date);
        let error_codes = serde_json::to_string(&daily.error_codes)?;
        let tx = self.conn.transaction()?;
        ensure_month_open(&tx, &daily.employee, YearMonth::of(daily.date))?;

        tx.execute(
            "
            INSERT OR REPLACE INTO daily_values
            (employee, date, gross_time, net_time, target_time, overtime, undertime,
             break_time, has_error, error_codes, calculated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                daily.employee.as_str(),
                date,
                daily.gross_time,
                daily.net_time,
                daily.target_time,
                daily.overtime,
                daily.undertime,
                daily.break_time,
                daily.has_error,
                error_codes,
                daily.calculated_at.map(format_timestamp),
            ],
        )?;

        tx.execute(
            "DELETE FROM account_values WHERE employee = ? AND date = ? AND source = ?",
            params![daily.employee.as_str(), date, PostingSource::DailyCalc.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO account_values (employee, account, date, minutes, source)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for posting in postings {
                stmt.execute(params![
                    posting.employee.as_str(),
                    posting.account.as_str(),
                    format_date(posting.date),
                    posting.minutes,
                    posting.source.as_str(),
                ])?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "UPDATE bookings SET calculated_time = ?, pair_id = ? WHERE id = ?",
            )?;
            for update in booking_updates {
                stmt.execute(params![
                    update.calculated_time,
                    update.pair_id.as_ref().map(BookingId::as_str),
                    update.booking_id.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            employee = %daily.employee,
            date = %daily.date,
            postings = postings.len(),
            "day calculation committed"
        );
        Ok(())
    }

    /// Fetches one daily value.
    pub fn get_daily_value(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<DailyValue>, StoreError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT employee, date, gross_time, net_time, target_time, overtime, undertime,
                       break_time, has_error, error_codes, calculated_at
                FROM daily_values WHERE employee = ? AND date = ?
                ",
                params![employee.as_str(), format_date(date)],
                daily_row,
            )
            .optional()?;
        row.map(DailyRow::into_value).transpose()
    }

    /// Lists one employee-month's daily values in date order.
    pub fn daily_values_for_month(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<Vec<DailyValue>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT employee, date, gross_time, net_time, target_time, overtime, undertime,
                   break_time, has_error, error_codes, calculated_at
            FROM daily_values
            WHERE employee = ? AND date >= ? AND date <= ?
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                employee.as_str(),
                format_date(month.first_day()),
                format_date(month.last_day()),
            ],
            daily_row,
        )?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?.into_value()?);
        }
        Ok(values)
    }

    // ========== Monthly values and closing ==========

    /// Replaces a monthly value wholesale. Rejected while the month is
    /// closed; a fresh aggregation always writes the month as open.
    pub fn replace_monthly_value(&mut self, value: &MonthlyValue) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        ensure_month_open(&tx, &value.employee, value.month)?;
        tx.execute(
            "
            INSERT OR REPLACE INTO monthly_values
            (employee, year, month, gross_time, net_time, target_time, overtime, undertime,
             break_time, error_days, flextime_start, flextime_change, flextime_end, forfeited,
             is_closed, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL)
            ",
            params![
                value.employee.as_str(),
                value.month.year(),
                value.month.month(),
                value.gross_time,
                value.net_time,
                value.target_time,
                value.overtime,
                value.undertime,
                value.break_time,
                value.error_days,
                value.flextime_start,
                value.flextime_change,
                value.flextime_end,
                value.forfeited,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Fetches one monthly value.
    pub fn get_monthly_value(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<Option<MonthlyValue>, StoreError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT employee, year, month, gross_time, net_time, target_time, overtime,
                       undertime, break_time, error_days, flextime_start, flextime_change,
                       flextime_end, forfeited, is_closed, closed_at
                FROM monthly_values WHERE employee = ? AND year = ? AND month = ?
                ",
                params![employee.as_str(), month.year(), month.month()],
                monthly_row,
            )
            .optional()?;
        row.map(MonthlyRow::into_value).transpose()
    }

    /// Whether the month is closed for the employee.
    ///
    /// A month with no aggregated row is open.
    pub fn is_month_closed(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<bool, StoreError> {
        month_closed(&self.conn, employee, month)
    }

    /// Closes a month against further mutation.
    ///
    /// The month must have been aggregated. Closing an already-closed month
    /// is a no-op, so retries are safe.
    pub fn close_month(
        &mut self,
        employee: &EmployeeId,
        month: YearMonth,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "
            UPDATE monthly_values SET is_closed = 1, closed_at = ?
            WHERE employee = ? AND year = ? AND month = ? AND is_closed = 0
            ",
            params![
                format_timestamp(now),
                employee.as_str(),
                month.year(),
                month.month()
            ],
        )?;
        if updated == 0 && self.get_monthly_value(employee, month)?.is_none() {
            return Err(StoreError::MonthNotAggregated {
                employee: employee.to_string(),
                year: month.year(),
                month: month.month(),
            });
        }
        Ok(())
    }

    /// Reopens a closed month. Explicit administrative action; reopening an
    /// open month is a no-op.
    pub fn reopen_month(
        &mut self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "
            UPDATE monthly_values SET is_closed = 0, closed_at = NULL
            WHERE employee = ? AND year = ? AND month = ?
            ",
            params![employee.as_str(), month.year(), month.month()],
        )?;
        Ok(())
    }

    // ========== Account ledger ==========

    /// Posts a manual or bonus account value. The month must be open.
    pub fn post_account_value(&mut self, posting: &AccountPosting) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        ensure_month_open(&tx, &posting.employee, YearMonth::of(posting.date))?;
        tx.execute(
            "
            INSERT INTO account_values (employee, account, date, minutes, source)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                posting.employee.as_str(),
                posting.account.as_str(),
                format_date(posting.date),
                posting.minutes,
                posting.source.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Running balance of one account up to and including `as_of`.
    pub fn account_balance(
        &self,
        employee: &EmployeeId,
        account: &AccountId,
        as_of: NaiveDate,
    ) -> Result<i64, StoreError> {
        let balance = self.conn.query_row(
            "
            SELECT COALESCE(SUM(minutes), 0)
            FROM account_values
            WHERE employee = ? AND account = ? AND date <= ?
            ",
            params![employee.as_str(), account.as_str(), format_date(as_of)],
            |row| row.get(0),
        )?;
        Ok(balance)
    }

    /// Lists one employee-day's postings in insertion order.
    pub fn account_values_for_day(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<AccountPosting>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT employee, account, date, minutes, source
            FROM account_values
            WHERE employee = ? AND date = ?
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map(params![employee.as_str(), format_date(date)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i32>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut postings = Vec::new();
        for row in rows {
            let (employee, account, date, minutes, source) = row?;
            postings.push(AccountPosting {
                employee: parse_id::<EmployeeId>(&employee, "employee")?,
                account: parse_id::<AccountId>(&account, "account")?,
                date: parse_date(&date)?,
                minutes,
                source: source
                    .parse::<PostingSource>()
                    .map_err(|_| StoreError::InvalidColumn {
                        column: "source",
                        value: source,
                    })?,
            });
        }
        Ok(postings)
    }
}

/// Fails with [`StoreError::MonthClosed`] when the month is closed.
///
/// Takes the connection (or an open transaction, which derefs to it) so the
/// check shares the writer's transaction.
fn ensure_month_open(
    conn: &Connection,
    employee: &EmployeeId,
    month: YearMonth,
) -> Result<(), StoreError> {
    if month_closed(conn, employee, month)? {
        return Err(StoreError::MonthClosed {
            employee: employee.to_string(),
            year: month.year(),
            month: month.month(),
        });
    }
    Ok(())
}

fn month_closed(
    conn: &Connection,
    employee: &EmployeeId,
    month: YearMonth,
) -> Result<bool, StoreError> {
    let closed: Option<bool> = conn
        .query_row(
            "SELECT is_closed FROM monthly_values WHERE employee = ? AND year = ? AND month = ?",
            params![employee.as_str(), month.year(), month.month()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(closed.unwrap_or(false))
}

fn booking_day(
    conn: &Connection,
    id: &BookingId,
) -> Result<(EmployeeId, NaiveDate), StoreError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT employee, date FROM bookings WHERE id = ?",
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (employee, date) = row.ok_or_else(|| StoreError::UnknownBooking {
        id: id.to_string(),
    })?;
    Ok((parse_id::<EmployeeId>(&employee, "employee")?, parse_date(&date)?))
}

// ========== Row mapping ==========

struct BookingRow {
    id: String,
    employee: String,
    date: String,
    category: String,
    order: Option<String>,
    original_time: i32,
    edited_time: i32,
    calculated_time: Option<i32>,
    pair_id: Option<String>,
    note: Option<String>,
}

fn booking_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        employee: row.get(1)?,
        date: row.get(2)?,
        category: row.get(3)?,
        order: row.get(4)?,
        original_time: row.get(5)?,
        edited_time: row.get(6)?,
        calculated_time: row.get(7)?,
        pair_id: row.get(8)?,
        note: row.get(9)?,
    })
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let category =
            self.category
                .parse::<BookingCategory>()
                .map_err(|_| StoreError::InvalidColumn {
                    column: "category",
                    value: self.category.clone(),
                })?;
        Ok(Booking::from_parts(
            parse_id::<BookingId>(&self.id, "booking id")?,
            parse_id::<EmployeeId>(&self.employee, "employee")?,
            parse_date(&self.date)?,
            category,
            self.order
                .as_deref()
                .map(|o| parse_id::<OrderId>(o, "order id"))
                .transpose()?,
            self.original_time,
            self.edited_time,
            self.calculated_time,
            self.pair_id
                .as_deref()
                .map(|p| parse_id::<BookingId>(p, "pair id"))
                .transpose()?,
            self.note,
        ))
    }
}

struct DailyRow {
    employee: String,
    date: String,
    gross_time: i32,
    net_time: i32,
    target_time: i32,
    overtime: i32,
    undertime: i32,
    break_time: i32,
    has_error: bool,
    error_codes: String,
    calculated_at: Option<String>,
}

fn daily_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyRow> {
    Ok(DailyRow {
        employee: row.get(0)?,
        date: row.get(1)?,
        gross_time: row.get(2)?,
        net_time: row.get(3)?,
        target_time: row.get(4)?,
        overtime: row.get(5)?,
        undertime: row.get(6)?,
        break_time: row.get(7)?,
        has_error: row.get(8)?,
        error_codes: row.get(9)?,
        calculated_at: row.get(10)?,
    })
}

impl DailyRow {
    fn into_value(self) -> Result<DailyValue, StoreError> {
        let error_codes: Vec<ErrorCode> = serde_json::from_str(&self.error_codes)?;
        Ok(DailyValue {
            employee: parse_id::<EmployeeId>(&self.employee, "employee")?,
            date: parse_date(&self.date)?,
            gross_time: self.gross_time,
            net_time: self.net_time,
            target_time: self.target_time,
            overtime: self.overtime,
            undertime: self.undertime,
            break_time: self.break_time,
            has_error: self.has_error,
            error_codes,
            calculated_at: self.calculated_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

struct MonthlyRow {
    employee: String,
    year: i32,
    month: u32,
    gross_time: i32,
    net_time: i32,
    target_time: i32,
    overtime: i32,
    undertime: i32,
    break_time: i32,
    error_days: i32,
    flextime_start: i32,
    flextime_change: i32,
    flextime_end: i32,
    forfeited: i32,
    is_closed: bool,
    closed_at: Option<String>,
}

fn monthly_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonthlyRow> {
    Ok(MonthlyRow {
        employee: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        gross_time: row.get(3)?,
        net_time: row.get(4)?,
        target_time: row.get(5)?,
        overtime: row.get(6)?,
        undertime: row.get(7)?,
        break_time: row.get(8)?,
        error_days: row.get(9)?,
        flextime_start: row.get(10)?,
        flextime_change: row.get(11)?,
        flextime_end: row.get(12)?,
        forfeited: row.get(13)?,
        is_closed: row.get(14)?,
        closed_at: row.get(15)?,
    })
}

impl MonthlyRow {
    fn into_value(self) -> Result<MonthlyValue, StoreError> {
        let month = YearMonth::new(self.year, self.month).map_err(|_| StoreError::InvalidColumn {
            column: "month",
            value: format!("{:04}-{:02}", self.year, self.month),
        })?;
        Ok(MonthlyValue {
            employee: parse_id::<EmployeeId>(&self.employee, "employee")?,
            month,
            gross_time: self.gross_time,
            net_time: self.net_time,
            target_time: self.target_time,
            overtime: self.overtime,
            undertime: self.undertime,
            break_time: self.break_time,
            error_days: self.error_days,
            flextime_start: self.flextime_start,
            flextime_change: self.flextime_change,
            flextime_end: self.flextime_end,
            forfeited: self.forfeited,
            is_closed: self.is_closed,
            closed_at: self.closed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

// ========== Value formatting ==========

fn parse_id<T>(value: &str, column: &'static str) -> Result<T, StoreError>
where
    T: TryFrom<String, Error = wt_core::ValidationError>,
{
    T::try_from(value.to_string()).map_err(|_| StoreError::InvalidColumn {
        column,
        value: value.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| StoreError::DateParse {
        value: value.to_string(),
    })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::TimestampParse {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wt_core::ledger::AccountMetric;
    use wt_core::{AccountMapping, derive_postings};

    fn employee() -> EmployeeId {
        EmployeeId::new("emp-1").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn month() -> YearMonth {
        YearMonth::new(2025, 3).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    }

    fn booking(id: &str, category: BookingCategory, time: i32) -> Booking {
        Booking::new(
            BookingId::new(id).unwrap(),
            employee(),
            date(),
            category,
            time,
        )
    }

    fn daily(net: i32, target: i32) -> DailyValue {
        DailyValue {
            employee: employee(),
            date: date(),
            gross_time: net,
            net_time: net,
            target_time: target,
            overtime: (net - target).max(0),
            undertime: (target - net).max(0),
            break_time: 0,
            has_error: false,
            error_codes: Vec::new(),
            calculated_at: Some(now()),
        }
    }

    fn monthly(flextime_end: i32) -> MonthlyValue {
        MonthlyValue {
            employee: employee(),
            month: month(),
            gross_time: 0,
            net_time: 0,
            target_time: 0,
            overtime: 0,
            undertime: 0,
            break_time: 0,
            error_days: 0,
            flextime_start: 0,
            flextime_change: flextime_end,
            flextime_end,
            forfeited: 0,
            is_closed: false,
            closed_at: None,
        }
    }

    fn flextime_mapping() -> Vec<AccountMapping> {
        vec![AccountMapping {
            account: AccountId::new("flextime").unwrap(),
            metric: AccountMetric::FlextimeDelta,
        }]
    }

    #[test]
    fn booking_roundtrip_preserves_all_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let mut b = booking("b1", BookingCategory::BreakStart, 720);
        b.set_note(Some("lunch".to_string()));
        db.insert_booking(&b).unwrap();

        let fetched = db.get_booking(&b.id).unwrap().unwrap();
        assert_eq!(fetched, b);
    }

    #[test]
    fn open_on_disk_initializes_schema() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wt.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_booking(&booking("b1", BookingCategory::WorkStart, 480))
                .unwrap();
        }
        // Re-opening the same file finds the data; init is idempotent.
        let db = Database::open(&path).unwrap();
        assert!(db.get_booking(&BookingId::new("b1").unwrap()).unwrap().is_some());
    }

    #[test]
    fn bookings_for_day_sorts_by_time() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_booking(&booking("b2", BookingCategory::WorkEnd, 1020))
            .unwrap();
        db.insert_booking(&booking("b1", BookingCategory::WorkStart, 480))
            .unwrap();
        let bookings = db.bookings_for_day(&employee(), date()).unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].id.as_str(), "b1");
    }

    #[test]
    fn update_booking_time_clears_calculated_and_keeps_original() {
        let mut db = Database::open_in_memory().unwrap();
        let b = booking("b1", BookingCategory::WorkStart, 478);
        db.insert_booking(&b).unwrap();
        db.apply_day_calculation(
            &daily(480, 480),
            &[],
            &[BookingUpdate {
                booking_id: b.id.clone(),
                calculated_time: Some(480),
                pair_id: None,
            }],
        )
        .unwrap();
        assert_eq!(
            db.get_booking(&b.id).unwrap().unwrap().calculated_time(),
            Some(480)
        );

        db.update_booking_time(&b.id, 475).unwrap();
        let fetched = db.get_booking(&b.id).unwrap().unwrap();
        assert_eq!(fetched.edited_time(), 475);
        assert_eq!(fetched.calculated_time(), None, "edit clears derived time");
        assert_eq!(fetched.original_time(), 478, "original is immutable");
    }

    #[test]
    fn update_booking_note_keeps_calculated_time() {
        let mut db = Database::open_in_memory().unwrap();
        let b = booking("b1", BookingCategory::WorkStart, 478);
        db.insert_booking(&b).unwrap();
        db.apply_day_calculation(
            &daily(480, 480),
            &[],
            &[BookingUpdate {
                booking_id: b.id.clone(),
                calculated_time: Some(480),
                pair_id: None,
            }],
        )
        .unwrap();

        db.update_booking_note(&b.id, Some("terminal offline")).unwrap();
        let fetched = db.get_booking(&b.id).unwrap().unwrap();
        assert_eq!(fetched.calculated_time(), Some(480));
        assert_eq!(fetched.note.as_deref(), Some("terminal offline"));
    }

    #[test]
    fn update_unknown_booking_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let result = db.update_booking_time(&BookingId::new("ghost").unwrap(), 480);
        assert!(matches!(result, Err(StoreError::UnknownBooking { .. })));
    }

    #[test]
    fn daily_value_roundtrip_with_error_codes() {
        let mut db = Database::open_in_memory().unwrap();
        let mut value = daily(480, 480);
        value.has_error = true;
        value.error_codes = vec![ErrorCode::MissingGo, ErrorCode::ExceededMaxNetTime];
        db.apply_day_calculation(&value, &[], &[]).unwrap();

        let fetched = db.get_daily_value(&employee(), date()).unwrap().unwrap();
        assert_eq!(fetched, value);
    }

    #[test]
    fn recalculation_replaces_postings_without_duplicates() {
        let mut db = Database::open_in_memory().unwrap();
        let first = daily(540, 480);
        db.apply_day_calculation(&first, &derive_postings(&first, &flextime_mapping()), &[])
            .unwrap();
        let second = daily(510, 480);
        db.apply_day_calculation(&second, &derive_postings(&second, &flextime_mapping()), &[])
            .unwrap();

        let postings = db.account_values_for_day(&employee(), date()).unwrap();
        assert_eq!(postings.len(), 1, "delete-and-replace, no duplicates");
        assert_eq!(postings[0].minutes, 30);
        let balance = db
            .account_balance(&employee(), &AccountId::new("flextime").unwrap(), date())
            .unwrap();
        assert_eq!(balance, 30);
    }

    #[test]
    fn recalculation_preserves_manual_postings() {
        let mut db = Database::open_in_memory().unwrap();
        db.post_account_value(&AccountPosting {
            employee: employee(),
            account: AccountId::new("flextime").unwrap(),
            date: date(),
            minutes: 15,
            source: PostingSource::Manual,
        })
        .unwrap();

        let value = daily(540, 480);
        db.apply_day_calculation(&value, &derive_postings(&value, &flextime_mapping()), &[])
            .unwrap();

        let postings = db.account_values_for_day(&employee(), date()).unwrap();
        assert_eq!(postings.len(), 2, "manual posting survives recalculation");
        let balance = db
            .account_balance(&employee(), &AccountId::new("flextime").unwrap(), date())
            .unwrap();
        assert_eq!(balance, 75);
    }

    #[test]
    fn account_balance_respects_as_of_cutoff() {
        let mut db = Database::open_in_memory().unwrap();
        let account = AccountId::new("overtime").unwrap();
        for (day, minutes) in [(10, 30), (11, 20), (12, 10)] {
            db.post_account_value(&AccountPosting {
                employee: employee(),
                account: account.clone(),
                date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                minutes,
                source: PostingSource::Bonus,
            })
            .unwrap();
        }
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(db.account_balance(&employee(), &account, as_of).unwrap(), 50);
    }

    #[test]
    fn daily_values_for_month_is_range_limited() {
        let mut db = Database::open_in_memory().unwrap();
        let mut in_month = daily(480, 480);
        in_month.date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        db.apply_day_calculation(&in_month, &[], &[]).unwrap();
        let mut next_month = daily(480, 480);
        next_month.date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        db.apply_day_calculation(&next_month, &[], &[]).unwrap();

        let values = db.daily_values_for_month(&employee(), month()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].date, in_month.date);
    }

    #[test]
    fn monthly_value_roundtrip() {
        let mut db = Database::open_in_memory().unwrap();
        let value = monthly(120);
        db.replace_monthly_value(&value).unwrap();
        let fetched = db.get_monthly_value(&employee(), month()).unwrap().unwrap();
        assert_eq!(fetched, value);
    }

    #[test]
    fn close_requires_aggregated_month() {
        let mut db = Database::open_in_memory().unwrap();
        let result = db.close_month(&employee(), month(), now());
        assert!(matches!(result, Err(StoreError::MonthNotAggregated { .. })));
    }

    #[test]
    fn closed_month_rejects_all_writes() {
        let mut db = Database::open_in_memory().unwrap();
        let b = booking("b1", BookingCategory::WorkStart, 480);
        db.insert_booking(&b).unwrap();
        db.replace_monthly_value(&monthly(0)).unwrap();
        db.close_month(&employee(), month(), now()).unwrap();
        assert!(db.is_month_closed(&employee(), month()).unwrap());

        let closed = |r: Result<(), StoreError>| matches!(r, Err(StoreError::MonthClosed { .. }));
        assert!(closed(db.update_booking_time(&b.id, 490)));
        assert!(closed(db.update_booking_note(&b.id, Some("note"))));
        assert!(closed(db.insert_booking(&booking("b2", BookingCategory::WorkEnd, 1020))));
        assert!(closed(db.apply_day_calculation(&daily(480, 480), &[], &[])));
        assert!(closed(db.replace_monthly_value(&monthly(1))));
        assert!(closed(db.post_account_value(&AccountPosting {
            employee: employee(),
            account: AccountId::new("flextime").unwrap(),
            date: date(),
            minutes: 5,
            source: PostingSource::Manual,
        })));
    }

    #[test]
    fn reopen_allows_the_same_write_again() {
        let mut db = Database::open_in_memory().unwrap();
        let b = booking("b1", BookingCategory::WorkStart, 480);
        db.insert_booking(&b).unwrap();
        db.replace_monthly_value(&monthly(0)).unwrap();

        // Several close/reopen cycles; behavior must not depend on the count.
        for _ in 0..3 {
            db.close_month(&employee(), month(), now()).unwrap();
            assert!(matches!(
                db.update_booking_time(&b.id, 490),
                Err(StoreError::MonthClosed { .. })
            ));
            db.reopen_month(&employee(), month()).unwrap();
            db.update_booking_time(&b.id, 490).unwrap();
        }
        let fetched = db.get_monthly_value(&employee(), month()).unwrap().unwrap();
        assert!(!fetched.is_closed);
        assert!(fetched.closed_at.is_none());
    }

    #[test]
    fn close_is_idempotent_and_stamps_time() {
        let mut db = Database::open_in_memory().unwrap();
        db.replace_monthly_value(&monthly(0)).unwrap();
        db.close_month(&employee(), month(), now()).unwrap();
        // Second close keeps the original timestamp.
        let later = Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap();
        db.close_month(&employee(), month(), later).unwrap();
        let fetched = db.get_monthly_value(&employee(), month()).unwrap().unwrap();
        assert!(fetched.is_closed);
        assert_eq!(fetched.closed_at, Some(now()));
    }

    #[test]
    fn closed_month_aborts_before_any_mutation() {
        let mut db = Database::open_in_memory().unwrap();
        let value = daily(540, 480);
        db.apply_day_calculation(&value, &derive_postings(&value, &flextime_mapping()), &[])
            .unwrap();
        db.replace_monthly_value(&monthly(60)).unwrap();
        db.close_month(&employee(), month(), now()).unwrap();

        // A recalculation attempt must leave the stored state untouched.
        let attempt = daily(600, 480);
        let result = db.apply_day_calculation(
            &attempt,
            &derive_postings(&attempt, &flextime_mapping()),
            &[],
        );
        assert!(matches!(result, Err(StoreError::MonthClosed { .. })));
        let stored = db.get_daily_value(&employee(), date()).unwrap().unwrap();
        assert_eq!(stored.net_time, 540, "no partial write happened");
        let postings = db.account_values_for_day(&employee(), date()).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].minutes, 60);
    }
}
