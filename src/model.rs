//! Records mirrored from the host applications.

use crate::error::{PimError, Result};
use crate::protocol::{parse_bool, parse_int, parse_timestamp, split_list};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: Option<NaiveDateTime>,
    pub read: bool,
    pub mailbox: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl MailMessage {
    pub const FIELDS: usize = 6;

    pub fn from_fields(f: &[String]) -> Result<Self> {
        expect_fields(f, Self::FIELDS, "message")?;
        Ok(Self {
            id: f[0].clone(),
            subject: f[1].clone(),
            sender: f[2].clone(),
            date: parse_timestamp(&f[3])?,
            read: parse_bool(&f[4])?,
            mailbox: f[5].clone(),
            content: None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub location: String,
    pub calendar: String,
    pub all_day: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl CalendarEvent {
    pub const FIELDS: usize = 8;

    pub fn from_fields(f: &[String]) -> Result<Self> {
        expect_fields(f, Self::FIELDS, "event")?;
        Ok(Self {
            uid: f[0].clone(),
            title: f[1].clone(),
            start: parse_timestamp(&f[2])?,
            end: parse_timestamp(&f[3])?,
            location: f[4].clone(),
            calendar: f[5].clone(),
            all_day: parse_bool(&f[6])?,
            notes: f[7].clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl Contact {
    pub const FIELDS: usize = 6;

    pub fn from_fields(f: &[String]) -> Result<Self> {
        expect_fields(f, Self::FIELDS, "contact")?;
        Ok(Self {
            id: f[0].clone(),
            name: f[1].clone(),
            organization: f[2].clone(),
            emails: split_list(&f[3]),
            phones: split_list(&f[4]),
            note: f[5].clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    None,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Reminders stores priority as 0 (none), 1-4 (high), 5 (medium), 6-9 (low).
    pub fn from_level(level: i64) -> Self {
        match level {
            1..=4 => Priority::High,
            5 => Priority::Medium,
            6..=9 => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn level(self) -> i64 {
        match self {
            Priority::None => 0,
            Priority::High => 1,
            Priority::Medium => 5,
            Priority::Low => 9,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Priority::None => "",
            Priority::High => "!!! ",
            Priority::Medium => "!! ",
            Priority::Low => "! ",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reminder {
    pub id: String,
    pub name: String,
    pub list: String,
    pub due: Option<NaiveDateTime>,
    pub completed: bool,
    pub priority: Priority,
    pub notes: String,
}

impl Reminder {
    pub const FIELDS: usize = 7;

    pub fn from_fields(f: &[String]) -> Result<Self> {
        expect_fields(f, Self::FIELDS, "reminder")?;
        Ok(Self {
            id: f[0].clone(),
            name: f[1].clone(),
            list: f[2].clone(),
            due: parse_timestamp(&f[3])?,
            completed: parse_bool(&f[4])?,
            priority: Priority::from_level(parse_int(&f[5])?),
            notes: f[6].clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Note {
    pub const FIELDS: usize = 5;

    pub fn from_fields(f: &[String]) -> Result<Self> {
        expect_fields(f, Self::FIELDS, "note")?;
        Ok(Self {
            id: f[0].clone(),
            name: f[1].clone(),
            folder: f[2].clone(),
            created: parse_timestamp(&f[3])?,
            modified: parse_timestamp(&f[4])?,
            body: None,
        })
    }
}

fn expect_fields(f: &[String], n: usize, what: &str) -> Result<()> {
    if f.len() < n {
        return Err(PimError::Parse(format!(
            "{} record has {} fields, expected {}",
            what,
            f.len(),
            n
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_line;

    #[test]
    fn reminder_from_record() {
        let f = decode_line("x-apple-reminder://1|Buy milk|Errands|2026-10-19T09:00:00|false|1|2 litres", 7)
            .unwrap();
        let r = Reminder::from_fields(&f).unwrap();
        assert_eq!(r.name, "Buy milk");
        assert_eq!(r.priority, Priority::High);
        assert!(!r.completed);
        assert!(r.due.is_some());
    }

    #[test]
    fn contact_lists_are_split() {
        let f = decode_line("p1|Ada Lovelace|Analytical|ada@x.org;ada@y.org|+44 1;|", 6).unwrap();
        let c = Contact::from_fields(&f).unwrap();
        assert_eq!(c.emails, vec!["ada@x.org", "ada@y.org"]);
        assert_eq!(c.phones, vec!["+44 1"]);
    }

    #[test]
    fn priority_levels() {
        assert_eq!(Priority::from_level(0), Priority::None);
        assert_eq!(Priority::from_level(3), Priority::High);
        assert_eq!(Priority::from_level(5), Priority::Medium);
        assert_eq!(Priority::from_level(9), Priority::Low);
        assert_eq!(Priority::Medium.level(), 5);
    }

    #[test]
    fn bad_flag_is_parse_error() {
        let f = decode_line("1|s|a|2026-10-18T10:00:00|maybe|INBOX", 6).unwrap();
        assert!(matches!(MailMessage::from_fields(&f), Err(PimError::Parse(_))));
    }

    #[test]
    fn short_slice_is_parse_error() {
        let f = vec!["only".to_string()];
        assert!(Note::from_fields(&f).is_err());
    }
}
