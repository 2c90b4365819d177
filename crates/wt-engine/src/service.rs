//! The recalculation service.
//!
//! Wires the pure calculation pipeline to storage: every mutating operation
//! checks the closing gate first, runs under the per-day lock, and commits
//! its results in one transaction. Recalculation is idempotent, so callers
//! may simply retry on infrastructure failures.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use thiserror::Error;

use wt_core::ledger::AccountPosting;
use wt_core::{
    AccountId, AccountMapping, Booking, BookingId, DailyValue, DayInput, EmployeeId, FlextimeCaps,
    MonthlyValue, OrderSink, YearMonth, aggregate, calculate_at, derive_postings,
};
use wt_db::{Database, StoreError};

use crate::lock::DayLock;
use crate::providers::{Calendar, PlanError, PlanSource};

/// Engine failures.
///
/// These are infrastructure conditions that abort the operation; data-quality
/// findings never surface here - they ride inside the returned [`DailyValue`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage failed or the month is closed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The day plan could not be resolved.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The calculation engine over one database.
///
/// Plan resolution and the absence/holiday calendar are injected; the order
/// sink is optional and its absence degrades to warning codes on auto-credit
/// days.
pub struct Engine<P, C> {
    db: Mutex<Database>,
    plans: P,
    calendar: C,
    mappings: Vec<AccountMapping>,
    orders: Option<Box<dyn OrderSink + Send + Sync>>,
    locks: DayLock,
}

impl<P, C> Engine<P, C>
where
    P: PlanSource + Sync,
    C: Calendar + Sync,
{
    /// Creates an engine over the given database and collaborators.
    pub fn new(db: Database, plans: P, calendar: C, mappings: Vec<AccountMapping>) -> Self {
        Self {
            db: Mutex::new(db),
            plans,
            calendar,
            mappings,
            orders: None,
            locks: DayLock::new(),
        }
    }

    /// Attaches the order subsystem.
    #[must_use]
    pub fn with_order_sink(mut self, orders: Box<dyn OrderSink + Send + Sync>) -> Self {
        self.orders = Some(orders);
        self
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().expect("database mutex poisoned")
    }

    /// Recalculates one employee-day with the current wall clock.
    pub fn recalculate_day(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<DailyValue, EngineError> {
        self.recalculate_day_at(employee, date, Utc::now())
    }

    /// Recalculates one employee-day with an explicit timestamp.
    ///
    /// Holds the per-day lock across load, computation and commit, so two
    /// recalculations of the same day can never interleave their writes.
    /// Aborts before computing anything when the month is closed.
    pub fn recalculate_day_at(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyValue, EngineError> {
        let _guard = self.locks.acquire(employee, date);

        let month = YearMonth::of(date);
        if self.db().is_month_closed(employee, month)? {
            return Err(month_closed(employee, month));
        }

        let bookings = self.db().bookings_for_day(employee, date)?;
        let plan = self.plans.day_plan(employee, date)?;
        let absence = self.calendar.absence(employee, date);
        let input = DayInput {
            employee,
            date,
            plan: &plan,
            bookings: &bookings,
            absence: absence.as_ref(),
            is_holiday: self.calendar.is_holiday(date),
        };
        let orders = self.orders.as_deref().map(|sink| sink as &dyn OrderSink);
        let calc = calculate_at(&input, orders, now);
        let postings = derive_postings(&calc.value, &self.mappings);

        self.db()
            .apply_day_calculation(&calc.value, &postings, &calc.booking_updates)?;
        Ok(calc.value)
    }

    /// Recalculates every day of an employee-month.
    ///
    /// Days are computed in parallel; each one runs through the same locked
    /// load-compute-commit cycle as [`Self::recalculate_day_at`]. Fails fast
    /// without touching anything when the month is closed.
    pub fn recalculate_month_at(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyValue>, EngineError> {
        if self.db().is_month_closed(employee, month)? {
            return Err(month_closed(employee, month));
        }
        let dates: Vec<NaiveDate> = month.days().collect();
        let values = dates
            .par_iter()
            .map(|&date| self.recalculate_day_at(employee, date, now))
            .collect::<Result<Vec<_>, EngineError>>()?;
        tracing::info!(employee = %employee, month = %month, days = values.len(), "month recalculated");
        Ok(values)
    }

    /// Aggregates an employee-month from its stored daily values.
    ///
    /// Carries the previous month's `flextime_end` forward (zero when the
    /// previous month was never aggregated) and replaces the monthly value
    /// wholesale. Daily values must be current; that ordering is the
    /// caller's responsibility.
    pub fn aggregate_month(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
        caps: FlextimeCaps,
    ) -> Result<MonthlyValue, EngineError> {
        let mut db = self.db();
        let days = db.daily_values_for_month(employee, month)?;
        let previous = db
            .get_monthly_value(employee, month.prev())?
            .map_or(0, |m| m.flextime_end);
        let value = aggregate(employee, month, &days, previous, caps);
        db.replace_monthly_value(&value)?;
        tracing::info!(
            employee = %employee,
            month = %month,
            flextime_end = value.flextime_end,
            forfeited = value.forfeited,
            "month aggregated"
        );
        Ok(value)
    }

    /// Closes a month against further mutation.
    pub fn close_month(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<(), EngineError> {
        self.close_month_at(employee, month, Utc::now())
    }

    /// Closes a month with an explicit timestamp.
    pub fn close_month_at(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.db().close_month(employee, month, now)?;
        tracing::info!(employee = %employee, month = %month, "month closed");
        Ok(())
    }

    /// Reopens a closed month. Explicit administrative action.
    pub fn reopen_month(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<(), EngineError> {
        self.db().reopen_month(employee, month)?;
        tracing::info!(employee = %employee, month = %month, "month reopened");
        Ok(())
    }

    /// Ingests a new booking. The month must be open.
    pub fn insert_booking(&self, booking: &Booking) -> Result<(), EngineError> {
        self.db().insert_booking(booking)?;
        Ok(())
    }

    /// Corrects a booking's time, clearing its derived time. The month must
    /// be open; the caller decides when to trigger recalculation.
    pub fn edit_booking_time(&self, id: &BookingId, minutes: i32) -> Result<(), EngineError> {
        self.db().update_booking_time(id, minutes)?;
        Ok(())
    }

    /// Replaces a booking's note. The month must be open.
    pub fn edit_booking_note(&self, id: &BookingId, note: Option<&str>) -> Result<(), EngineError> {
        self.db().update_booking_note(id, note)?;
        Ok(())
    }

    /// Fetches one booking.
    pub fn booking(&self, id: &BookingId) -> Result<Option<Booking>, EngineError> {
        Ok(self.db().get_booking(id)?)
    }

    /// Lists one employee-day's bookings.
    pub fn bookings_for_day(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, EngineError> {
        Ok(self.db().bookings_for_day(employee, date)?)
    }

    /// Posts a manual or bonus account value.
    pub fn post_account_value(&self, posting: &AccountPosting) -> Result<(), EngineError> {
        self.db().post_account_value(posting)?;
        Ok(())
    }

    /// Running balance of one account up to `as_of`.
    pub fn account_balance(
        &self,
        employee: &EmployeeId,
        account: &AccountId,
        as_of: NaiveDate,
    ) -> Result<i64, EngineError> {
        Ok(self.db().account_balance(employee, account, as_of)?)
    }

    /// Read access for reporting callers.
    pub fn daily_value(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<DailyValue>, EngineError> {
        Ok(self.db().get_daily_value(employee, date)?)
    }

    /// Read access for reporting callers.
    pub fn monthly_value(
        &self,
        employee: &EmployeeId,
        month: YearMonth,
    ) -> Result<Option<MonthlyValue>, EngineError> {
        Ok(self.db().get_monthly_value(employee, month)?)
    }
}

fn month_closed(employee: &EmployeeId, month: YearMonth) -> EngineError {
    EngineError::Store(StoreError::MonthClosed {
        employee: employee.to_string(),
        year: month.year(),
        month: month.month(),
    })
}
