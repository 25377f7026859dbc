use super::{fetch, fetch_names, require_text, resolve_or_bail, run_targeted};
use crate::error::Result;
use crate::model::{Priority, Reminder};
use crate::script::{date_assignment, quote, ScriptRunner};
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub title: String,
    pub list: Option<String>,
    pub due: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub priority: Priority,
}

fn reminder_loop(list: Option<&str>, include_completed: bool, name_filter: Option<&str>) -> String {
    let source = match list {
        Some(name) => format!("{{list {}}}", quote(name)),
        None => "lists".to_string(),
    };
    let mut conditions = Vec::new();
    if !include_completed {
        conditions.push("completed is false".to_string());
    }
    if let Some(q) = name_filter {
        conditions.push(format!("name contains {}", quote(q)));
    }
    let selection = if conditions.is_empty() {
        "reminders of l".to_string()
    } else {
        format!("(reminders of l whose {})", conditions.join(" and "))
    };
    format!(
        r#"tell application "Reminders"
    set out to ""
    repeat with l in {source}
        repeat with r in {selection}
            set out to out & my clean(id of r) & "|" & my clean(name of r) & "|" & my clean(name of l) & "|" & my isoDate(due date of r) & "|" & (completed of r as text) & "|" & (priority of r as text) & "|" & my clean(body of r) & linefeed
        end repeat
    end repeat
    return out
end tell"#
    )
}

pub fn lists(runner: &dyn ScriptRunner) -> Result<Vec<String>> {
    fetch_names(
        runner,
        r#"tell application "Reminders"
    set out to ""
    repeat with l in lists
        set out to out & my clean(name of l) & linefeed
    end repeat
    return out
end tell"#,
    )
}

/// Reminders of one list or every list. Open reminders come first, then by due date.
pub fn list(
    runner: &dyn ScriptRunner,
    list: Option<&str>,
    include_completed: bool,
) -> Result<Vec<Reminder>> {
    let body = reminder_loop(list, include_completed, None);
    let mut found = fetch(runner, &body, Reminder::FIELDS, Reminder::from_fields)?;
    sort_reminders(&mut found);
    Ok(found)
}

pub fn search(
    runner: &dyn ScriptRunner,
    query: &str,
    include_completed: bool,
) -> Result<Vec<Reminder>> {
    require_text(query, "search query")?;
    let body = reminder_loop(None, include_completed, Some(query));
    let mut found = fetch(runner, &body, Reminder::FIELDS, Reminder::from_fields)?;
    sort_reminders(&mut found);
    Ok(found)
}

/// Create a reminder and return its id. Without a list it goes to the app's default list.
pub fn add(runner: &dyn ScriptRunner, reminder: &NewReminder) -> Result<String> {
    require_text(&reminder.title, "reminder title")?;

    let (target, what) = match &reminder.list {
        Some(name) => (format!("list {}", quote(name)), format!("list {}", name)),
        None => ("default list".to_string(), "default list".to_string()),
    };

    let mut props = format!(
        "name:{}, priority:{}",
        quote(&reminder.title),
        reminder.priority.level()
    );
    if let Some(notes) = &reminder.notes {
        props.push_str(&format!(", body:{}", quote(notes)));
    }
    let mut dates = String::new();
    if let Some(due) = reminder.due {
        dates.push_str(&date_assignment("dueD", due));
        props.push_str(", due date:dueD");
    }

    let body = format!(
        r#"{dates}tell application "Reminders"
    {resolve}    set r to make new reminder at end of reminders of l with properties {{{props}}}
    return id of r
end tell"#,
        resolve = resolve_or_bail("l", &target),
    );
    tracing::info!(title = %reminder.title, "creating reminder");
    let id = run_targeted(runner, &body, &what)?;
    Ok(id.trim().to_string())
}

pub fn complete(runner: &dyn ScriptRunner, id: &str) -> Result<()> {
    require_text(id, "reminder id")?;
    let body = format!(
        r#"tell application "Reminders"
    {resolve}    set completed of r to true
    return "ok"
end tell"#,
        resolve = resolve_or_bail("r", &format!("reminder id {}", quote(id))),
    );
    run_targeted(runner, &body, &format!("reminder {}", id))?;
    Ok(())
}

pub fn delete(runner: &dyn ScriptRunner, id: &str) -> Result<()> {
    require_text(id, "reminder id")?;
    let body = format!(
        r#"tell application "Reminders"
    {resolve}    delete r
    return "ok"
end tell"#,
        resolve = resolve_or_bail("r", &format!("reminder id {}", quote(id))),
    );
    run_targeted(runner, &body, &format!("reminder {}", id))?;
    Ok(())
}

fn sort_reminders(found: &mut [Reminder]) {
    // Open first, then dated before undated, then by name.
    found.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| match (a.due, b.due) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.name.cmp(&b.name))
    });
}
