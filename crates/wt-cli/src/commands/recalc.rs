//! Recalculation commands.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use wt_core::{DailyValue, EmployeeId, YearMonth};

use crate::WtEngine;
use crate::commands::util::fmt_minutes;

/// Recalculates one day or a whole month.
pub fn run<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    date: Option<NaiveDate>,
    month: Option<YearMonth>,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    match (date, month) {
        (Some(date), None) => {
            let value = engine.recalculate_day(&employee, date)?;
            write!(writer, "{}", summarize_day(&value))?;
        }
        (None, Some(month)) => {
            let values = engine.recalculate_month_at(&employee, month, chrono::Utc::now())?;
            let flagged: Vec<&DailyValue> = values.iter().filter(|v| v.has_error).collect();
            writeln!(writer, "Recalculated {} day(s) of {month}.", values.len())?;
            if !flagged.is_empty() {
                writeln!(writer, "{} day(s) need attention:", flagged.len())?;
                for value in flagged {
                    write!(writer, "{}", summarize_day(value))?;
                }
            }
        }
        _ => bail!("pass exactly one of --date or --month"),
    }
    Ok(())
}

/// One-line day summary plus its warnings.
fn summarize_day(value: &DailyValue) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: gross {}, break {}, net {} (target {}, overtime {}, undertime {})",
        value.date,
        fmt_minutes(value.gross_time.into()),
        fmt_minutes(value.break_time.into()),
        fmt_minutes(value.net_time.into()),
        fmt_minutes(value.target_time.into()),
        fmt_minutes(value.overtime.into()),
        fmt_minutes(value.undertime.into()),
    );
    for code in &value.error_codes {
        let _ = writeln!(out, "  warning: {code}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use wt_core::ErrorCode;

    fn value() -> DailyValue {
        DailyValue {
            employee: EmployeeId::new("emp-1").unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            gross_time: 540,
            net_time: 510,
            target_time: 480,
            overtime: 30,
            undertime: 0,
            break_time: 30,
            has_error: false,
            error_codes: Vec::new(),
            calculated_at: None,
        }
    }

    #[test]
    fn summarizes_clean_day() {
        assert_snapshot!(
            summarize_day(&value()),
            @"2025-03-10: gross 9:00, break 0:30, net 8:30 (target 8:00, overtime 0:30, undertime 0:00)"
        );
    }

    #[test]
    fn summarizes_day_with_warnings() {
        let mut value = value();
        value.has_error = true;
        value.error_codes = vec![ErrorCode::MissingGo, ErrorCode::ExceededMaxNetTime];
        assert_snapshot!(summarize_day(&value), @r"
        2025-03-10: gross 9:00, break 0:30, net 8:30 (target 8:00, overtime 0:30, undertime 0:00)
          warning: MISSING_GO
          warning: EXCEEDED_MAX_NET_TIME
        ");
    }
}
