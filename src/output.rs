//! Terminal and JSON rendering of records.

use crate::error::{PimError, Result};
use crate::model::{CalendarEvent, Contact, MailMessage, Note, Reminder};
use chrono::NaiveDateTime;
use serde::Serialize;

const STAMP: &str = "%Y-%m-%d %H:%M";

pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PimError::Other(format!("json: {}", e)))
}

/// One line per item, or a "no ... found" line when empty.
pub fn list<T: Serialize>(
    items: &[T],
    as_json: bool,
    what: &str,
    line: fn(&T) -> String,
) -> Result<String> {
    if as_json {
        return json(items);
    }
    if items.is_empty() {
        return Ok(format!("no {} found", what));
    }
    Ok(items.iter().map(line).collect::<Vec<_>>().join("\n"))
}

pub fn one<T: Serialize>(item: &T, as_json: bool, detail: fn(&T) -> String) -> Result<String> {
    if as_json {
        return json(item);
    }
    Ok(detail(item))
}

pub fn names(items: &[String], as_json: bool, what: &str) -> Result<String> {
    list(items, as_json, what, |s| s.clone())
}

fn stamp(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format(STAMP).to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn message_line(m: &MailMessage) -> String {
    let flag = if m.read { " " } else { "*" };
    format!(
        "{} {:>6}  {}  {:<28}  {}",
        flag,
        m.id,
        stamp(m.date),
        truncate(&m.sender, 28),
        m.subject
    )
}

pub fn message_detail(m: &MailMessage) -> String {
    let mut out = format!(
        "Subject: {}\nFrom:    {}\nDate:    {}\nMailbox: {}\nId:      {}\n",
        m.subject,
        m.sender,
        stamp(m.date),
        m.mailbox,
        m.id
    );
    if let Some(content) = &m.content {
        out.push('\n');
        out.push_str(content.trim_end());
    }
    out
}

pub fn event_line(e: &CalendarEvent) -> String {
    let when = if e.all_day {
        format!(
            "{} (all day)",
            e.start
                .map(|s| s.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    } else {
        let end = e
            .end
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default();
        format!("{}-{}", stamp(e.start), end)
    };
    let mut line = format!("{}  {}", when, e.title);
    if !e.location.is_empty() {
        line.push_str(&format!("  @{}", e.location));
    }
    line.push_str(&format!("  [{}]", e.calendar));
    line
}

pub fn contact_line(c: &Contact) -> String {
    let mut line = c.name.clone();
    if !c.organization.is_empty() {
        line.push_str(&format!(" ({})", c.organization));
    }
    if let Some(email) = c.emails.first() {
        line.push_str(&format!("  {}", email));
    }
    if let Some(phone) = c.phones.first() {
        line.push_str(&format!("  {}", phone));
    }
    line
}

pub fn contact_detail(c: &Contact) -> String {
    let mut out = format!("Name:  {}\n", c.name);
    if !c.organization.is_empty() {
        out.push_str(&format!("Org:   {}\n", c.organization));
    }
    for email in &c.emails {
        out.push_str(&format!("Email: {}\n", email));
    }
    for phone in &c.phones {
        out.push_str(&format!("Phone: {}\n", phone));
    }
    if !c.note.is_empty() {
        out.push_str(&format!("Note:  {}\n", c.note));
    }
    out.push_str(&format!("Id:    {}\n", c.id));
    out
}

pub fn reminder_line(r: &Reminder) -> String {
    let check = if r.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{} {}{}", check, r.priority.marker(), r.name);
    if r.due.is_some() {
        line.push_str(&format!(" (due {})", stamp(r.due)));
    }
    line.push_str(&format!("  [{}]  {}", r.list, r.id));
    line
}

pub fn reminder_detail(r: &Reminder) -> String {
    let mut out = format!(
        "Name:     {}\nList:     {}\nDue:      {}\nStatus:   {}\nPriority: {:?}\nId:       {}\n",
        r.name,
        r.list,
        stamp(r.due),
        if r.completed { "done" } else { "open" },
        r.priority,
        r.id
    );
    if !r.notes.is_empty() {
        out.push_str(&format!("Notes:    {}\n", r.notes));
    }
    out
}

pub fn note_line(n: &Note) -> String {
    format!("{}  {}  [{}]  {}", stamp(n.modified), n.name, n.folder, n.id)
}

pub fn note_detail(n: &Note) -> String {
    let mut out = format!(
        "Name:     {}\nFolder:   {}\nCreated:  {}\nModified: {}\nId:       {}\n",
        n.name,
        n.folder,
        stamp(n.created),
        stamp(n.modified),
        n.id
    );
    if let Some(body) = &n.body {
        out.push('\n');
        out.push_str(body.trim_end());
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn reminder() -> Reminder {
        Reminder {
            id: "r1".to_string(),
            name: "Buy milk".to_string(),
            list: "Errands".to_string(),
            due: Some(at(17, 0)),
            completed: false,
            priority: Priority::High,
            notes: String::new(),
        }
    }

    #[test]
    fn reminder_line_shows_due_and_priority() {
        assert_eq!(
            reminder_line(&reminder()),
            "[ ] !!! Buy milk (due 2026-10-18 17:00)  [Errands]  r1"
        );
    }

    #[test]
    fn empty_list_message() {
        let items: Vec<Reminder> = Vec::new();
        assert_eq!(
            list(&items, false, "reminders", reminder_line).unwrap(),
            "no reminders found"
        );
    }

    #[test]
    fn json_list() {
        let out = list(&[reminder()], true, "reminders", reminder_line).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["name"], "Buy milk");
        assert_eq!(value[0]["priority"], "high");
        assert_eq!(value[0]["due"], "2026-10-18T17:00:00");
    }

    #[test]
    fn event_lines() {
        let mut e = CalendarEvent {
            uid: "u".to_string(),
            title: "Standup".to_string(),
            start: Some(at(9, 0)),
            end: Some(at(9, 15)),
            location: "Room 1".to_string(),
            calendar: "Work".to_string(),
            all_day: false,
            notes: String::new(),
        };
        assert_eq!(event_line(&e), "2026-10-18 09:00-09:15  Standup  @Room 1  [Work]");
        e.all_day = true;
        e.location.clear();
        assert_eq!(event_line(&e), "2026-10-18 (all day)  Standup  [Work]");
    }

    #[test]
    fn unread_marker_and_truncation() {
        let m = MailMessage {
            id: "7".to_string(),
            subject: "Hi".to_string(),
            sender: "A very long sender name <someone@example.org>".to_string(),
            date: Some(at(8, 5)),
            read: false,
            mailbox: "INBOX".to_string(),
            content: None,
        };
        let line = message_line(&m);
        assert!(line.starts_with("*      7  2026-10-18 08:05  "));
        assert!(line.contains('…'));
        assert!(line.ends_with("Hi"));
    }

    #[test]
    fn contact_detail_lists_everything() {
        let c = Contact {
            id: "p1".to_string(),
            name: "Ada".to_string(),
            organization: String::new(),
            emails: vec!["a@x.org".to_string(), "b@x.org".to_string()],
            phones: vec![],
            note: String::new(),
        };
        let out = contact_detail(&c);
        assert!(out.contains("Email: a@x.org\nEmail: b@x.org\n"));
        assert!(!out.contains("Org:"));
    }
}
