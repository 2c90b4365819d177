//! Shared output helpers.

/// Formats minutes as `H:MM`, with a sign for negative values.
#[must_use]
pub fn fmt_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let abs = minutes.abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}
