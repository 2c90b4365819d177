//! Month aggregation, closing and reopening.

use std::io::Write;

use anyhow::{Context, Result};

use wt_core::{EmployeeId, FlextimeCaps, MonthlyValue, YearMonth};

use crate::Config;
use crate::WtEngine;
use crate::commands::util::fmt_minutes;

/// Aggregates a month from its stored daily values.
pub fn aggregate<W: Write>(
    engine: &WtEngine,
    config: &Config,
    writer: &mut W,
    employee: &str,
    month: YearMonth,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    let caps = FlextimeCaps::from(config.caps);
    let value = engine.aggregate_month(&employee, month, caps)?;
    write!(writer, "{}", format_monthly(&value))?;
    Ok(())
}

/// Closes a month.
pub fn close<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    month: YearMonth,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    engine.close_month(&employee, month)?;
    writeln!(writer, "Month {month} closed for {employee}.")?;
    Ok(())
}

/// Reopens a closed month.
pub fn reopen<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    month: YearMonth,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    engine.reopen_month(&employee, month)?;
    writeln!(writer, "Month {month} reopened for {employee}.")?;
    Ok(())
}

/// Shows an aggregated month.
pub fn show<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    month: YearMonth,
    json: bool,
) -> Result<()> {
    let employee_id = EmployeeId::new(employee).context("invalid employee ID")?;
    let Some(value) = engine.monthly_value(&employee_id, month)? else {
        writeln!(writer, "Month {month} has not been aggregated for {employee}.")?;
        return Ok(());
    };
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        write!(writer, "{}", format_monthly(&value))?;
    }
    Ok(())
}

/// Renders a monthly value.
fn format_monthly(value: &MonthlyValue) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let state = if value.is_closed { "closed" } else { "open" };
    let _ = writeln!(out, "Month {} for {} ({state}):", value.month, value.employee);
    let _ = writeln!(
        out,
        "  worked   gross {}, break {}, net {}",
        fmt_minutes(value.gross_time.into()),
        fmt_minutes(value.break_time.into()),
        fmt_minutes(value.net_time.into()),
    );
    let _ = writeln!(
        out,
        "  target   {} (overtime {}, undertime {})",
        fmt_minutes(value.target_time.into()),
        fmt_minutes(value.overtime.into()),
        fmt_minutes(value.undertime.into()),
    );
    let _ = writeln!(
        out,
        "  flextime {} -> {} (change {})",
        fmt_minutes(value.flextime_start.into()),
        fmt_minutes(value.flextime_end.into()),
        fmt_minutes(value.flextime_change.into()),
    );
    if value.forfeited != 0 {
        let _ = writeln!(
            out,
            "  forfeited at cap: {}",
            fmt_minutes(value.forfeited.into())
        );
    }
    if value.error_days > 0 {
        let _ = writeln!(out, "  {} day(s) with warnings", value.error_days);
    }
    out
}
