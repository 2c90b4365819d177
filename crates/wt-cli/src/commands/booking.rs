//! Booking management commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use wt_core::{Booking, BookingCategory, BookingId, EmployeeId, format_hhmm, parse_hhmm};

use crate::WtEngine;

/// Records a new booking and prints its generated ID.
pub fn add<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    date: NaiveDate,
    category: BookingCategory,
    time: &str,
    note: Option<String>,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    let minutes = parse_hhmm(time).with_context(|| format!("invalid time {time:?}"))?;
    let id = BookingId::new(Uuid::new_v4().to_string()).expect("uuid is never empty");

    let mut booking = Booking::new(id.clone(), employee, date, category, minutes);
    booking.set_note(note);
    engine.insert_booking(&booking)?;

    writeln!(
        writer,
        "Recorded {} at {} on {date}: {id}",
        category,
        format_hhmm(minutes)
    )?;
    Ok(())
}

/// Corrects a booking's time.
pub fn edit<W: Write>(engine: &WtEngine, writer: &mut W, id: &str, time: &str) -> Result<()> {
    let id = BookingId::new(id).context("invalid booking ID")?;
    let minutes = parse_hhmm(time).with_context(|| format!("invalid time {time:?}"))?;
    engine.edit_booking_time(&id, minutes)?;
    writeln!(
        writer,
        "Booking {id} set to {}. Run 'wt recalc' to refresh the day.",
        format_hhmm(minutes)
    )?;
    Ok(())
}

/// Sets or clears a booking's note.
pub fn note<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    id: &str,
    note: Option<&str>,
) -> Result<()> {
    let id = BookingId::new(id).context("invalid booking ID")?;
    engine.edit_booking_note(&id, note)?;
    if note.is_some() {
        writeln!(writer, "Note set on booking {id}.")?;
    } else {
        writeln!(writer, "Note cleared on booking {id}.")?;
    }
    Ok(())
}

/// Lists one day's bookings.
pub fn list<W: Write>(
    engine: &WtEngine,
    writer: &mut W,
    employee: &str,
    date: NaiveDate,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee ID")?;
    let bookings = engine.bookings_for_day(&employee, date)?;
    write!(writer, "{}", format_bookings(date, &bookings))?;
    Ok(())
}

/// Renders one day's bookings, edited and derived times side by side.
fn format_bookings(date: NaiveDate, bookings: &[Booking]) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    if bookings.is_empty() {
        let _ = writeln!(out, "No bookings on {date}.");
        return out;
    }
    let _ = writeln!(out, "Bookings on {date}:");
    for booking in bookings {
        let calculated = booking
            .calculated_time()
            .map_or_else(|| "    -".to_string(), format_hhmm);
        let _ = writeln!(
            out,
            "  {}  {:<11}  calc {}  {}{}",
            format_hhmm(booking.edited_time()),
            booking.category.as_str(),
            calculated,
            booking.id,
            booking
                .note
                .as_deref()
                .map(|n| format!("  ({n})"))
                .unwrap_or_default(),
        );
    }
    out
}
