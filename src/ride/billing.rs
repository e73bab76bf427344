//! Ride billing and display formats

use chrono::{DateTime, TimeZone};

/// Minutes charged for a ride: every started minute counts, with a minimum of one
pub fn billed_minutes(elapsed_seconds: u64) -> u64 {
    elapsed_seconds.div_ceil(60).max(1)
}

/// Total price in RSD
pub fn total_price(elapsed_seconds: u64, price_per_minute: i64) -> i64 {
    billed_minutes(elapsed_seconds) as i64 * price_per_minute
}

/// `MM:SS`; minutes keep counting past an hour
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    format!("{:02}:{:02}", elapsed_seconds / 60, elapsed_seconds % 60)
}

/// Rental date, `DD.MM.YYYY.`
pub fn format_date<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%d.%m.%Y.").to_string()
}

/// Rental time span, `HH:MM - HH:MM`
pub fn format_time_range<Tz>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}
