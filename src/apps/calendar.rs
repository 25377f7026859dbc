use super::{fetch, fetch_names, require_text, resolve_or_bail, run_targeted, NOT_FOUND};
use crate::error::{PimError, Result};
use crate::model::CalendarEvent;
use crate::script::{date_assignment, quote, ScriptRunner};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub calendar: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub all_day: bool,
}

impl NewEvent {
    /// Start and end as they will be sent. All-day events span whole days.
    fn span(&self) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let (start, end) = if self.all_day {
            let start = self.start.date().and_time(NaiveTime::MIN);
            let last_day = self.end.map_or(start, |end| end.date().and_time(NaiveTime::MIN));
            (start, range_end(last_day, 1)?)
        } else {
            let end = match self.end {
                Some(end) => end,
                None => {
                    let minutes = self.duration_minutes.unwrap_or(60);
                    TimeDelta::try_minutes(minutes)
                        .and_then(|d| self.start.checked_add_signed(d))
                        .ok_or_else(|| {
                            PimError::InvalidArgument(format!(
                                "duration out of range: {} minutes",
                                minutes
                            ))
                        })?
                }
            };
            (self.start, end)
        };
        if end <= start {
            return Err(PimError::InvalidArgument(
                "event must end after it starts".to_string(),
            ));
        }
        Ok((start, end))
    }
}

fn calendar_source(calendar: Option<&str>) -> String {
    match calendar {
        Some(name) => format!("{{calendar {}}}", quote(name)),
        None => "calendars".to_string(),
    }
}

fn event_loop(
    from: NaiveDateTime,
    to: NaiveDateTime,
    calendar: Option<&str>,
    title_filter: Option<&str>,
) -> String {
    let extra = title_filter
        .map(|q| format!(" and summary contains {}", quote(q)))
        .unwrap_or_default();
    format!(
        r#"{start}{end}tell application "Calendar"
    set out to ""
    repeat with c in {source}
        set evs to (every event of c whose start date is greater than or equal to startD and start date is less than endD{extra})
        repeat with e in evs
            set out to out & my clean(uid of e) & "|" & my clean(summary of e) & "|" & my isoDate(start date of e) & "|" & my isoDate(end date of e) & "|" & my clean(location of e) & "|" & my clean(name of c) & "|" & (allday event of e as text) & "|" & my clean(description of e) & linefeed
        end repeat
    end repeat
    return out
end tell"#,
        start = date_assignment("startD", from),
        end = date_assignment("endD", to),
        source = calendar_source(calendar),
    )
}

pub fn calendars(runner: &dyn ScriptRunner) -> Result<Vec<String>> {
    fetch_names(
        runner,
        r#"tell application "Calendar"
    set out to ""
    repeat with c in calendars
        set out to out & my clean(name of c) & linefeed
    end repeat
    return out
end tell"#,
    )
}

/// Events starting in `[from, to)`, ordered by start.
pub fn events(
    runner: &dyn ScriptRunner,
    from: NaiveDateTime,
    to: NaiveDateTime,
    calendar: Option<&str>,
) -> Result<Vec<CalendarEvent>> {
    query(runner, from, to, calendar, None)
}

/// Events of the day containing `now`.
pub fn today(
    runner: &dyn ScriptRunner,
    now: NaiveDateTime,
    calendar: Option<&str>,
) -> Result<Vec<CalendarEvent>> {
    let from = now.date().and_time(NaiveTime::MIN);
    events(runner, from, range_end(from, 1)?, calendar)
}

pub fn search(
    runner: &dyn ScriptRunner,
    text: &str,
    from: NaiveDateTime,
    days: i64,
    calendar: Option<&str>,
) -> Result<Vec<CalendarEvent>> {
    require_text(text, "search query")?;
    query(runner, from, range_end(from, days)?, calendar, Some(text))
}

/// `from` plus `days` whole days, rejecting counts outside the calendar's range.
pub fn range_end(from: NaiveDateTime, days: i64) -> Result<NaiveDateTime> {
    TimeDelta::try_days(days)
        .and_then(|d| from.checked_add_signed(d))
        .ok_or_else(|| PimError::InvalidArgument(format!("day count out of range: {}", days)))
}

fn query(
    runner: &dyn ScriptRunner,
    from: NaiveDateTime,
    to: NaiveDateTime,
    calendar: Option<&str>,
    title_filter: Option<&str>,
) -> Result<Vec<CalendarEvent>> {
    if to <= from {
        return Err(PimError::InvalidArgument(
            "end of range must be after its start".to_string(),
        ));
    }
    let body = event_loop(from, to, calendar, title_filter);
    let mut found = fetch(runner, &body, CalendarEvent::FIELDS, CalendarEvent::from_fields)?;
    found.sort_by(|a, b| a.start.cmp(&b.start));
    Ok(found)
}

/// Create an event and return its uid.
pub fn add(runner: &dyn ScriptRunner, event: &NewEvent) -> Result<String> {
    require_text(&event.title, "event title")?;
    let (start, end) = event.span()?;

    let (target, what) = match &event.calendar {
        Some(name) => (format!("calendar {}", quote(name)), format!("calendar {}", name)),
        None => (
            "first calendar whose writable is true".to_string(),
            "writable calendar".to_string(),
        ),
    };

    let body = format!(
        r#"{start}{end}tell application "Calendar"
    {resolve}    set e to make new event at end of events of c with properties {{summary:{title}, start date:startD, end date:endD, allday event:{all_day}, location:{location}, description:{notes}}}
    return uid of e
end tell"#,
        start = date_assignment("startD", start),
        end = date_assignment("endD", end),
        resolve = resolve_or_bail("c", &target),
        title = quote(&event.title),
        all_day = event.all_day,
        location = quote(event.location.as_deref().unwrap_or("")),
        notes = quote(event.notes.as_deref().unwrap_or("")),
    );
    tracing::info!(title = %event.title, %start, %end, "creating event");
    let uid = run_targeted(runner, &body, &what)?;
    Ok(uid.trim().to_string())
}

pub fn delete(runner: &dyn ScriptRunner, uid: &str, calendar: Option<&str>) -> Result<()> {
    require_text(uid, "event uid")?;
    let body = format!(
        r#"tell application "Calendar"
    repeat with c in {source}
        set hits to (every event of c whose uid is {uid})
        if (count of hits) > 0 then
            delete item 1 of hits
            return "ok"
        end if
    end repeat
    return "{NOT_FOUND}"
end tell"#,
        source = calendar_source(calendar),
        uid = quote(uid),
    );
    run_targeted(runner, &body, &format!("event {}", uid))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing::MockRunner;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn event(start: NaiveDateTime) -> NewEvent {
        NewEvent {
            title: "Standup".to_string(),
            start,
            end: None,
            duration_minutes: None,
            calendar: None,
            location: None,
            notes: None,
            all_day: false,
        }
    }

    #[test]
    fn events_sorted_by_start() {
        let runner = MockRunner::replying(&[
            "u2|Lunch|2026-10-18T12:00:00|2026-10-18T13:00:00|Cafe|Home|false|\n\
             u1|Standup|2026-10-18T09:00:00|2026-10-18T09:15:00||Work|false|daily\n",
        ]);
        let found = events(&runner, at(18, 0), at(19, 0), None).unwrap();
        assert_eq!(found[0].title, "Standup");
        assert_eq!(found[0].notes, "daily");
        assert_eq!(found[1].location, "Cafe");
    }

    #[test]
    fn range_is_sent_as_numeric_dates() {
        let runner = MockRunner::replying(&[""]);
        events(&runner, at(18, 0), at(25, 0), Some("Work")).unwrap();
        let script = runner.last_script();
        assert!(script.contains("set day of startD to 18"));
        assert!(script.contains("set day of endD to 25"));
        assert!(script.contains("repeat with c in {calendar \"Work\"}"));
    }

    #[test]
    fn empty_range_rejected() {
        let runner = MockRunner::default();
        assert!(events(&runner, at(18, 0), at(18, 0), None).is_err());
    }

    #[test]
    fn today_spans_one_day() {
        let runner = MockRunner::replying(&[""]);
        today(&runner, at(18, 15), None).unwrap();
        let script = runner.last_script();
        assert!(script.contains("set day of startD to 18"));
        assert!(script.contains("set time of startD to 0"));
        assert!(script.contains("set day of endD to 19"));
    }

    #[test]
    fn search_filters_by_title() {
        let runner = MockRunner::replying(&[""]);
        search(&runner, "review", at(18, 0), 30, None).unwrap();
        assert!(runner
            .last_script()
            .contains("and summary contains \"review\")"));
    }

    #[test]
    fn add_defaults_to_one_hour() {
        let runner = MockRunner::replying(&["NEW-UID\n"]);
        let uid = add(&runner, &event(at(20, 9))).unwrap();
        assert_eq!(uid, "NEW-UID");
        let script = runner.last_script();
        assert!(script.contains("set time of endD to 36000"));
        assert!(script.contains("first calendar whose writable is true"));
        assert!(script.contains("summary:\"Standup\""));
    }

    #[test]
    fn all_day_event_covers_whole_day() {
        let mut e = event(at(20, 9));
        e.all_day = true;
        let (start, end) = e.span().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap().and_time(NaiveTime::MIN));
        assert_eq!(end, start + TimeDelta::days(1));
    }

    #[test]
    fn huge_duration_is_invalid() {
        let runner = MockRunner::default();
        let mut e = event(at(20, 9));
        e.duration_minutes = Some(1_000_000_000_000);
        assert!(matches!(add(&runner, &e), Err(PimError::InvalidArgument(_))));
        e.duration_minutes = Some(i64::MAX);
        assert!(matches!(e.span(), Err(PimError::InvalidArgument(_))));
        assert!(runner.scripts.borrow().is_empty());
    }

    #[test]
    fn huge_search_window_is_invalid() {
        let runner = MockRunner::default();
        assert!(matches!(
            search(&runner, "review", at(18, 0), 1_000_000_000, None),
            Err(PimError::InvalidArgument(_))
        ));
        assert!(matches!(range_end(at(18, 0), i64::MAX), Err(PimError::InvalidArgument(_))));
        assert_eq!(range_end(at(18, 0), 7).unwrap(), at(25, 0));
        assert!(runner.scripts.borrow().is_empty());
    }

    #[test]
    fn end_before_start_rejected() {
        let mut e = event(at(20, 9));
        e.end = Some(at(20, 8));
        assert!(matches!(e.span(), Err(PimError::InvalidArgument(_))));
    }

    #[test]
    fn add_to_missing_calendar() {
        let runner = MockRunner::replying(&["NOT_FOUND"]);
        let mut e = event(at(20, 9));
        e.calendar = Some("Nope".to_string());
        assert!(matches!(add(&runner, &e), Err(PimError::NotFound(_))));
    }

    #[test]
    fn delete_missing_event() {
        let runner = MockRunner::replying(&["NOT_FOUND"]);
        assert!(matches!(
            delete(&runner, "abc", None),
            Err(PimError::NotFound(what)) if what == "event abc"
        ));
        let script = runner.last_script();
        assert!(script.starts_with("on clean(v)"));
        assert!(script.contains("    return \"NOT_FOUND\"\nend tell"));
        let runner = MockRunner::replying(&["ok"]);
        delete(&runner, "abc", Some("Work")).unwrap();
    }
}
