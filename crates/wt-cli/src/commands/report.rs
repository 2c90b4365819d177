//! Day and balance reports.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use wt_core::{AccountId, DailyValue, EmployeeId};

use crate::WtEngine;
use crate::commands::util::fmt_minutes;

/// Shows one day's calculated value with its warnings.
///
/// Days with errors still display their computed values; the warning list
/// points at the external correction workflow.
pub fn day<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let employee_id = EmployeeId::new(employee).context("invalid employee ID")?;
    let Some(value) = engine.daily_value(&employee_id, date)? else {
        writeln!(writer, "No calculated value for {employee} on {date}.")?;
        return Ok(());
    };
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        write!(writer, "{}", format_daily(&value))?;
    }
    Ok(())
}

/// Shows a running account balance.
pub fn balance<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    account: &str,
    as_of: NaiveDate,
) -> Result<()> {
    let employee_id = EmployeeId::new(employee).context("invalid employee ID")?;
    let account_id = AccountId::new(account).context("invalid account ID")?;
    let balance = engine.account_balance(&employee_id, &account_id, as_of)?;
    writeln!(
        writer,
        "{account} balance for {employee} as of {as_of}: {} ({balance} min)",
        fmt_minutes(balance)
    )?;
    Ok(())
}

/// Renders a daily value.
fn format_daily(value: &DailyValue) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "{} on {}:", value.employee, value.date);
    let _ = writeln!(
        out,
        "  gross {}  break {}  net {}",
        fmt_minutes(value.gross_time.into()),
        fmt_minutes(value.break_time.into()),
        fmt_minutes(value.net_time.into()),
    );
    let _ = writeln!(
        out,
        "  target {}  overtime {}  undertime {}",
        fmt_minutes(value.target_time.into()),
        fmt_minutes(value.overtime.into()),
        fmt_minutes(value.undertime.into()),
    );
    match value.calculated_at {
        Some(at) => {
            let _ = writeln!(out, "  calculated at {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            let _ = writeln!(out, "  not yet calculated");
        }
    }
    if value.has_error {
        let _ = writeln!(out, "  warnings:");
        for code in &value.error_codes {
            let _ = writeln!(out, "    {code}");
        }
    }
    out
}
