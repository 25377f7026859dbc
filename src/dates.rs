//! Natural-language date parsing for command arguments.

use crate::error::{PimError, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use regex::Regex;
use std::sync::LazyLock;

static IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^in\s+(\d+)\s+(days?|weeks?|hours?|minutes?|mins?)$").unwrap()
});

static WEEKDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:next\s+)?([a-z]+)$").unwrap());

static TIME_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+(?:at\s+)?(\d{1,2}(?::\d{2})?\s*(?:am|pm)?)$").unwrap()
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a date relative to the local clock.
pub fn parse_date(input: &str) -> Result<NaiveDateTime> {
    parse_date_at(input, Local::now().naive_local())
}

/// Parse `input` relative to `now`. Day phrases resolve to midnight unless
/// followed by a time of day.
pub fn parse_date_at(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let trimmed = input.trim();
    let invalid = || PimError::InvalidDate(trimmed.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    // Before lowercasing: the ISO `T` separator is case-sensitive.
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    let text = trimmed.to_lowercase();

    if let Some(day) = parse_day(&text, now.date()) {
        return Ok(day.and_time(NaiveTime::MIN));
    }

    if let Some(dt) = parse_offset(&text, now) {
        return Ok(dt);
    }

    if let Some(caps) = TIME_SUFFIX_RE.captures(&text) {
        if let (Some(day), Some(time)) = (parse_day(&caps[1], now.date()), parse_time(&caps[2])) {
            return Ok(day.and_time(time));
        }
    }

    Err(invalid())
}

fn parse_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    match text {
        "today" => return Some(today),
        "tomorrow" => return shift_day(today, TimeDelta::try_days(1)),
        "yesterday" => return shift_day(today, TimeDelta::try_days(-1)),
        "next week" => return shift_day(today, TimeDelta::try_days(7)),
        _ => {}
    }

    if let Some(caps) = WEEKDAY_RE.captures(text) {
        if let Some(target) = weekday(&caps[1]) {
            let current = today.weekday().num_days_from_monday() as i64;
            let wanted = target.num_days_from_monday() as i64;
            let mut ahead = (wanted - current).rem_euclid(7);
            if ahead == 0 {
                ahead = 7;
            }
            return shift_day(today, TimeDelta::try_days(ahead));
        }
    }

    if let Some(caps) = IN_RE.captures(text) {
        let n: i64 = caps[1].parse().ok()?;
        let unit = &caps[2];
        if unit.starts_with("day") {
            return shift_day(today, TimeDelta::try_days(n));
        }
        if unit.starts_with("week") {
            return shift_day(today, TimeDelta::try_weeks(n));
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_offset(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if text == "now" {
        return Some(now);
    }
    let caps = IN_RE.captures(text)?;
    let n: i64 = caps[1].parse().ok()?;
    let unit = &caps[2];
    let delta = if unit.starts_with("hour") {
        TimeDelta::try_hours(n)?
    } else if unit.starts_with("min") {
        TimeDelta::try_minutes(n)?
    } else {
        return None;
    };
    now.checked_add_signed(delta)
}

/// `None` when the offset is out of range for a date.
fn shift_day(day: NaiveDate, delta: Option<TimeDelta>) -> Option<NaiveDate> {
    day.checked_add_signed(delta?)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(text.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let hour = match caps.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (meridiem, hour) {
                ("am", 12) => 0,
                ("am", h) => h,
                ("pm", 12) => 12,
                (_, h) => h + 12,
            }
        }
        // A bare number is too ambiguous to read as a time.
        None if caps.get(2).is_none() => return None,
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn weekday(name: &str) -> Option<Weekday> {
    let day = match name {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    // Sunday 18 October 2026, 10:15
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn fixed_phrases() {
        assert_eq!(parse_date_at("today", now()).unwrap(), at(2026, 10, 18, 0, 0));
        assert_eq!(parse_date_at("Tomorrow", now()).unwrap(), at(2026, 10, 19, 0, 0));
        assert_eq!(parse_date_at(" yesterday ", now()).unwrap(), at(2026, 10, 17, 0, 0));
        assert_eq!(parse_date_at("next week", now()).unwrap(), at(2026, 10, 25, 0, 0));
    }

    #[test]
    fn next_weekday_is_strictly_after_today() {
        assert_eq!(parse_date_at("next monday", now()).unwrap(), at(2026, 10, 19, 0, 0));
        assert_eq!(parse_date_at("next sunday", now()).unwrap(), at(2026, 10, 25, 0, 0));
        assert_eq!(parse_date_at("fri", now()).unwrap(), at(2026, 10, 23, 0, 0));
    }

    #[test]
    fn in_n_units() {
        assert_eq!(parse_date_at("in 3 days", now()).unwrap(), at(2026, 10, 21, 0, 0));
        assert_eq!(parse_date_at("in 1 day", now()).unwrap(), at(2026, 10, 19, 0, 0));
        assert_eq!(parse_date_at("in 2 weeks", now()).unwrap(), at(2026, 11, 1, 0, 0));
        assert_eq!(parse_date_at("in 2 hours", now()).unwrap(), at(2026, 10, 18, 12, 15));
        assert_eq!(parse_date_at("in 30 minutes", now()).unwrap(), at(2026, 10, 18, 10, 45));
        assert_eq!(parse_date_at("now", now()).unwrap(), now());
    }

    #[test]
    fn generic_formats() {
        assert_eq!(parse_date_at("2026-12-01", now()).unwrap(), at(2026, 12, 1, 0, 0));
        assert_eq!(parse_date_at("2026-12-01 14:30", now()).unwrap(), at(2026, 12, 1, 14, 30));
        assert_eq!(parse_date_at("2026-12-01T08:00:00", now()).unwrap(), at(2026, 12, 1, 8, 0));
        assert_eq!(parse_date_at("12/24/2026", now()).unwrap(), at(2026, 12, 24, 0, 0));
        assert_eq!(parse_date_at("December 5, 2026", now()).unwrap(), at(2026, 12, 5, 0, 0));
        assert_eq!(parse_date_at("5 Nov 2026", now()).unwrap(), at(2026, 11, 5, 0, 0));
    }

    #[test]
    fn phrase_with_time_of_day() {
        assert_eq!(parse_date_at("tomorrow 3pm", now()).unwrap(), at(2026, 10, 19, 15, 0));
        assert_eq!(parse_date_at("tomorrow at 9:30 am", now()).unwrap(), at(2026, 10, 19, 9, 30));
        assert_eq!(parse_date_at("next friday 17:45", now()).unwrap(), at(2026, 10, 23, 17, 45));
        assert_eq!(parse_date_at("today 12am", now()).unwrap(), at(2026, 10, 18, 0, 0));
        assert_eq!(parse_date_at("in 2 days at 12pm", now()).unwrap(), at(2026, 10, 20, 12, 0));
    }

    #[test]
    fn iso_datetime_keeps_case_of_separator() {
        assert_eq!(parse_date_at("2026-12-01T08:00", now()).unwrap(), at(2026, 12, 1, 8, 0));
        assert_eq!(parse_date_at(" 2026-12-01T08:00:30 ", now()).unwrap().second(), 30);
    }

    #[test]
    fn huge_offsets_are_invalid_not_panics() {
        for input in [
            "in 999999999 days",
            "in 99999999999 weeks",
            "in 99999999999999 hours",
            "in 9999999999999999 minutes",
            "in 99999999999999999999 days",
            "in 999999999 days at 9am",
        ] {
            assert!(
                matches!(parse_date_at(input, now()), Err(PimError::InvalidDate(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn rejects_nonsense() {
        for input in ["", "someday", "tomorrow 9", "next blursday", "tomorrow 25:00", "in x days"] {
            assert!(
                matches!(parse_date_at(input, now()), Err(PimError::InvalidDate(_))),
                "accepted {:?}",
                input
            );
        }
    }
}
