use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

// e.g. "Mon Jan 02 15:04:05 UTC 2006", or "Tue Mar  5 14:07:09 UTC 2024" for single-digit days
const SYNCHRONIZER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";
const DISPLAY_FORMAT: &str = "%m/%d/%y %H:%M:%S";
pub const INVALID_DATE: &str = "Invalid date";

pub fn parse_last_modified(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), SYNCHRONIZER_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Renders a synchronizer date as `MM/DD/YY HH:mm:ss` in `tz`.
pub fn format_last_modified_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match parse_last_modified(raw) {
        Some(utc) => utc.with_timezone(tz).format(DISPLAY_FORMAT).to_string(),
        None => INVALID_DATE.to_string(),
    }
}

pub fn format_last_modified(raw: &str) -> String {
    format_last_modified_in(raw, &Local)
}

/// Short human form of an uptime in seconds, e.g. `2d 3h 4m 5s`.
pub fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, secs) = (rest / 60, rest % 60);

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, _) => format!("{minutes}m {secs}s"),
        (0, _, _) => format!("{hours}h {minutes}m {secs}s"),
        _ => format!("{days}d {hours}h {minutes}m {secs}s"),
    }
}
