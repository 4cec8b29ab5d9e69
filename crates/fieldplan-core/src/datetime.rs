//! Civil date/time helpers for the scheduling core.
//!
//! All dates are timezone-naive: a task's `dueDate` is a (year, month, day)
//! triple used verbatim, never reinterpreted across timezones.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Days in a month under the proleptic Gregorian rule. Returns 0 for a
/// month outside 1-12; callers validate the month before doing arithmetic.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Day-of-week of day 1 of the month, 0 = Sunday .. 6 = Saturday.
/// `None` only when chrono cannot represent the date (year out of range).
pub fn first_weekday_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.weekday().num_days_from_sunday())
}

/// Parse an upstream `timeline.dueDate` string into a civil date.
///
/// Accepts `YYYY-MM-DD`, or a datetime string whose date part precedes a
/// `T` separator; the date part is taken verbatim (no offset math).
/// Impossible civil dates ("2025-02-30") are rejected.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(date);
    }

    if let Some((date_part, _)) = token.split_once('T')
        && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
    {
        return Some(date);
    }

    None
}

/// Parse an upstream `timeline.dueTime` string: `HH:MM`, `HH:MM:SS`, or
/// `h:MMam`/`h:MMpm`.
pub fn parse_due_time(raw: &str) -> Option<NaiveTime> {
    static CLOCK_RE: OnceLock<Regex> = OnceLock::new();
    let clock_re = CLOCK_RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<ampm>[ap]m)?$")
            .expect("clock regex is valid")
    });
    let captures = clock_re.captures(raw.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    let second = match captures.name("second") {
        Some(m) => m.as_str().parse::<u32>().ok()?,
        None => 0,
    };

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        raw_hour
    };

    NaiveTime::from_hms_opt(hour, minute, second)
}
