use super::{fetch, fetch_names, require_text, resolve_or_bail, run_targeted};
use crate::error::{PimError, Result};
use crate::model::MailMessage;
use crate::protocol::{decode_line, parse_int, split_header};
use crate::script::{quote, with_prelude, ScriptRunner};

/// Which mailbox to look in. `None` means the unified inbox.
#[derive(Debug, Clone, Default)]
pub struct MailboxSel {
    pub mailbox: Option<String>,
    pub account: Option<String>,
}

impl MailboxSel {
    fn reference(&self) -> String {
        match (&self.mailbox, &self.account) {
            (None, None) => "inbox".to_string(),
            (None, Some(account)) => format!("mailbox \"INBOX\" of account {}", quote(account)),
            (Some(m), None) if m.eq_ignore_ascii_case("inbox") => "inbox".to_string(),
            (Some(m), None) => format!("mailbox {}", quote(m)),
            (Some(m), Some(account)) => {
                format!("mailbox {} of account {}", quote(m), quote(account))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Outgoing {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub draft: bool,
}

const RECORD: &str = r#"(id of m as text) & "|" & my clean(subject of m) & "|" & my clean(sender of m) & "|" & my isoDate(date received of m) & "|" & (read status of m as text) & "|" & my clean(name of mailbox of m)"#;

fn message_loop(box_ref: &str, filter: Option<&str>, limit: usize) -> String {
    let msgs = match filter {
        Some(f) => format!("(messages of box whose {})", f),
        None => "messages of box".to_string(),
    };
    format!(
        r#"tell application "Mail"
    set out to ""
    set box to {box_ref}
    set msgs to {msgs}
    set n to count of msgs
    if n > {limit} then set n to {limit}
    repeat with i from 1 to n
        set m to item i of msgs
        set out to out & {RECORD} & linefeed
    end repeat
    return out
end tell"#
    )
}

pub fn accounts(runner: &dyn ScriptRunner) -> Result<Vec<String>> {
    fetch_names(
        runner,
        r#"tell application "Mail"
    set out to ""
    repeat with a in accounts
        set out to out & my clean(name of a) & linefeed
    end repeat
    return out
end tell"#,
    )
}

pub fn mailboxes(runner: &dyn ScriptRunner, account: Option<&str>) -> Result<Vec<String>> {
    let source = match account {
        Some(a) => format!("{{account {}}}", quote(a)),
        None => "accounts".to_string(),
    };
    fetch_names(
        runner,
        &format!(
            r#"tell application "Mail"
    set out to ""
    repeat with a in {source}
        repeat with b in mailboxes of a
            set out to out & my clean(name of a) & "/" & my clean(name of b) & linefeed
        end repeat
    end repeat
    return out
end tell"#
        ),
    )
}

/// Newest messages of a mailbox, optionally only unread ones.
pub fn list(
    runner: &dyn ScriptRunner,
    sel: &MailboxSel,
    limit: usize,
    unread_only: bool,
) -> Result<Vec<MailMessage>> {
    let filter = unread_only.then_some("read status is false");
    let body = message_loop(&sel.reference(), filter, limit);
    let mut messages = fetch(runner, &body, MailMessage::FIELDS, MailMessage::from_fields)?;
    newest_first(&mut messages);
    Ok(messages)
}

pub fn search(
    runner: &dyn ScriptRunner,
    sel: &MailboxSel,
    query: &str,
    limit: usize,
) -> Result<Vec<MailMessage>> {
    require_text(query, "search query")?;
    let q = quote(query);
    let filter = format!("subject contains {q} or sender contains {q}");
    let body = message_loop(&sel.reference(), Some(&filter), limit);
    let mut messages = fetch(runner, &body, MailMessage::FIELDS, MailMessage::from_fields)?;
    newest_first(&mut messages);
    Ok(messages)
}

/// One message with its full content.
pub fn read(runner: &dyn ScriptRunner, sel: &MailboxSel, id: &str) -> Result<MailMessage> {
    let id = message_id(id)?;
    let target = format!("first message of {} whose id is {}", sel.reference(), id);
    let body = format!(
        r#"tell application "Mail"
    {resolve}    return {RECORD} & linefeed & (content of m as text)
end tell"#,
        resolve = resolve_or_bail("m", &target),
    );
    let output = run_targeted(runner, &body, &format!("message {}", id))?;
    let (header, content) = split_header(&output);
    let fields = decode_line(header, MailMessage::FIELDS)?;
    let mut message = MailMessage::from_fields(&fields)?;
    message.content = Some(content.to_string());
    Ok(message)
}

pub fn mark_read(runner: &dyn ScriptRunner, sel: &MailboxSel, id: &str) -> Result<()> {
    let id = message_id(id)?;
    let target = format!("first message of {} whose id is {}", sel.reference(), id);
    let body = format!(
        r#"tell application "Mail"
    {resolve}    set read status of m to true
    return "ok"
end tell"#,
        resolve = resolve_or_bail("m", &target),
    );
    run_targeted(runner, &body, &format!("message {}", id))?;
    Ok(())
}

pub fn unread_count(runner: &dyn ScriptRunner, sel: &MailboxSel) -> Result<i64> {
    let body = format!(
        r#"tell application "Mail"
    return unread count of {}
end tell"#,
        sel.reference()
    );
    let output = runner.run(&with_prelude(&body))?;
    parse_int(&output)
}

/// Compose a message and send it, or leave it open as a draft.
pub fn send(runner: &dyn ScriptRunner, msg: &Outgoing) -> Result<()> {
    if msg.to.iter().all(|a| a.trim().is_empty()) {
        return Err(PimError::InvalidArgument(
            "at least one --to recipient is required".to_string(),
        ));
    }
    require_text(&msg.subject, "subject")?;

    let mut recipients = String::new();
    for (kind, addresses) in [("to", &msg.to), ("cc", &msg.cc), ("bcc", &msg.bcc)] {
        for address in addresses.iter().filter(|a| !a.trim().is_empty()) {
            recipients.push_str(&format!(
                "        make new {kind} recipient at end of {kind} recipients with properties {{address:{}}}\n",
                quote(address.trim())
            ));
        }
    }

    let finish = if msg.draft { "activate" } else { "send msg" };
    let body = format!(
        r#"tell application "Mail"
    set msg to make new outgoing message with properties {{subject:{subject}, content:{content}, visible:{visible}}}
    tell msg
{recipients}    end tell
    {finish}
end tell"#,
        subject = quote(&msg.subject),
        content = quote(&msg.body),
        visible = msg.draft,
    );
    tracing::info!(to = ?msg.to, draft = msg.draft, "sending mail");
    runner.run(&body)?;
    Ok(())
}

fn message_id(id: &str) -> Result<i64> {
    id.trim()
        .parse()
        .map_err(|_| PimError::InvalidArgument(format!("message id must be a number: {}", id)))
}

fn newest_first(messages: &mut [MailMessage]) {
    messages.sort_by(|a, b| b.date.cmp(&a.date));
}
