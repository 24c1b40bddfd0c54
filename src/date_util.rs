use std::fmt::Display;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};

/// Step back `months` calendar months from `(year, month)`, rolling into
/// earlier years as needed. `month` is 1-based.
pub fn months_before(year: i32, month: u32, months: u32) -> (i32, u32) {
    let index = year as i64 * 12 + (month as i64 - 1) - months as i64;
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

/// First day of the month `months` before the month containing `date`.
pub fn first_of_month_before(date: NaiveDate, months: u32) -> NaiveDate {
    let (year, month) = months_before(date.year(), date.month(), months);
    NaiveDate::from_ymd_opt(year, month, 1).expect("day 1 exists in every month")
}

/// Midnight of `date` in the zone `tz`, as a UTC instant.
///
/// When local midnight does not exist (a DST gap), the first valid instant
/// of the day is used instead.
pub fn local_midnight_utc<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(hour)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Parse a user-supplied date the way a browser date input is read.
///
/// Accepts `YYYY-MM-DD` (UTC midnight), RFC 3339 date-times, and
/// `YYYY-MM-DDTHH:MM[:SS]` without an offset (read in `tz`). Returns `None`
/// for anything else.
pub fn parse_date_input<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(d) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(d.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant the way the API expects query timestamps
/// (`2024-03-01T00:00:00.000Z`).
pub fn to_query_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar day (`YYYY-MM-DD`) of `dt` in its own offset.
pub fn day_key<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    dt.format("%Y-%m-%d").to_string()
}

/// Parse an event date as the server writes it, keeping its offset.
///
/// Accepts RFC 3339, a datetime without offset (read as UTC), or a bare
/// `YYYY-MM-DD` (UTC midnight).
pub fn parse_event_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}
