use crate::apps::{calendar, contacts, mail, notes, reminders};
use crate::config::Config;
use crate::dates;
use crate::error::PimError;
use crate::model::Priority;
use crate::output;
use crate::script::Osascript;

use clap::ValueEnum;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use rmcp::{tool, tool_handler, tool_router, ServerHandler, ServiceExt};
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MailListParams {
    /// Mailbox name (default: inbox)
    pub mailbox: Option<String>,
    /// Account the mailbox belongs to
    pub account: Option<String>,
    /// Maximum number of messages
    pub limit: Option<usize>,
    /// Only unread messages
    pub unread: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MailSearchParams {
    /// Text to find in subject or sender
    pub query: String,
    /// Mailbox name (default: inbox)
    pub mailbox: Option<String>,
    /// Account the mailbox belongs to
    pub account: Option<String>,
    /// Maximum number of messages
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MailSendParams {
    /// Recipient addresses
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Leave the message open in Mail instead of sending
    pub draft: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalendarEventsParams {
    /// Start of range, e.g. "today" or "2026-11-01" (default: today)
    pub from: Option<String>,
    /// Number of days to include
    pub days: Option<i64>,
    /// Calendar name
    pub calendar: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalendarAddParams {
    pub title: String,
    /// Start, e.g. "tomorrow 3pm"
    pub start: String,
    /// Length in minutes (default 60)
    pub duration_minutes: Option<i64>,
    pub calendar: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// Search text
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemindersListParams {
    /// List name (default: every list)
    pub list: Option<String>,
    /// Include completed reminders
    pub all: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemindersAddParams {
    pub title: String,
    pub list: Option<String>,
    /// Due date, e.g. "tomorrow 9am"
    pub due: Option<String>,
    pub notes: Option<String>,
    /// none, high, medium or low
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IdParams {
    /// Object id as printed by the list tools
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NotesCreateParams {
    pub title: String,
    pub body: Option<String>,
    pub folder: Option<String>,
}

#[derive(Clone)]
pub struct PimMcpServer {
    config: Config,
    tool_router: ToolRouter<Self>,
}

fn reply(result: crate::error::Result<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("Error: {}", e),
    }
}

#[tool_router]
impl PimMcpServer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List the newest messages of a Mail mailbox.")]
    fn mail_list(&self, Parameters(params): Parameters<MailListParams>) -> String {
        reply(mail_list(&self.config, params))
    }

    #[tool(description = "Search Mail messages by subject or sender.")]
    fn mail_search(&self, Parameters(params): Parameters<MailSearchParams>) -> String {
        reply(mail_search(&self.config, params))
    }

    #[tool(description = "Send an email with Mail, or open it as a draft.")]
    fn mail_send(&self, Parameters(params): Parameters<MailSendParams>) -> String {
        reply(mail_send(&self.config, params))
    }

    #[tool(description = "List Calendar events in a date range.")]
    fn calendar_events(&self, Parameters(params): Parameters<CalendarEventsParams>) -> String {
        reply(calendar_events(&self.config, params))
    }

    #[tool(description = "Create a Calendar event. Returns its uid.")]
    fn calendar_add(&self, Parameters(params): Parameters<CalendarAddParams>) -> String {
        reply(calendar_add(&self.config, params))
    }

    #[tool(description = "Search Contacts by name or organization.")]
    fn contacts_search(&self, Parameters(params): Parameters<QueryParams>) -> String {
        reply(contacts_search(&self.config, params))
    }

    #[tool(description = "List reminders, optionally from one list.")]
    fn reminders_list(&self, Parameters(params): Parameters<RemindersListParams>) -> String {
        reply(reminders_list(&self.config, params))
    }

    #[tool(description = "Create a reminder. Returns its id.")]
    fn reminders_add(&self, Parameters(params): Parameters<RemindersAddParams>) -> String {
        reply(reminders_add(&self.config, params))
    }

    #[tool(description = "Mark a reminder as completed by its id.")]
    fn reminders_complete(&self, Parameters(params): Parameters<IdParams>) -> String {
        reply(reminders_complete(&self.config, params))
    }

    #[tool(description = "Search Notes by title or text.")]
    fn notes_search(&self, Parameters(params): Parameters<QueryParams>) -> String {
        reply(notes_search(&self.config, params))
    }

    #[tool(description = "Read a note's plain text by its id.")]
    fn notes_read(&self, Parameters(params): Parameters<IdParams>) -> String {
        reply(notes_read(&self.config, params))
    }

    #[tool(description = "Create a note. Returns its id.")]
    fn notes_create(&self, Parameters(params): Parameters<NotesCreateParams>) -> String {
        reply(notes_create(&self.config, params))
    }
}

fn mail_list(config: &Config, params: MailListParams) -> crate::error::Result<String> {
    let sel = mail::MailboxSel {
        mailbox: params.mailbox,
        account: params.account,
    };
    let limit = params.limit.unwrap_or(config.mail_limit);
    let runner = Osascript::from_config(config);
    let found = mail::list(&runner, &sel, limit, params.unread.unwrap_or(false))?;
    output::list(&found, false, "messages", output::message_line)
}

fn mail_search(config: &Config, params: MailSearchParams) -> crate::error::Result<String> {
    let limit = params.limit.unwrap_or(config.mail_limit);
    let runner = Osascript::from_config(config);
    let sel = mail::MailboxSel {
        mailbox: params.mailbox,
        account: params.account,
    };
    let found = mail::search(&runner, &sel, &params.query, limit)?;
    output::list(&found, false, "messages", output::message_line)
}

fn mail_send(config: &Config, params: MailSendParams) -> crate::error::Result<String> {
    let draft = params.draft.unwrap_or(false);
    let outgoing = mail::Outgoing {
        to: params.to,
        subject: params.subject,
        body: params.body,
        draft,
        ..mail::Outgoing::default()
    };
    mail::send(&Osascript::from_config(config), &outgoing)?;
    Ok(if draft {
        "Draft opened in Mail".to_string()
    } else {
        format!("Sent to {}", outgoing.to.join(", "))
    })
}

fn calendar_events(config: &Config, params: CalendarEventsParams) -> crate::error::Result<String> {
    let from = dates::parse_date(params.from.as_deref().unwrap_or("today"))?;
    let to = calendar::range_end(from, params.days.unwrap_or(config.calendar_days))?;
    let runner = Osascript::from_config(config);
    let found = calendar::events(&runner, from, to, params.calendar.as_deref())?;
    output::list(&found, false, "events", output::event_line)
}

fn calendar_add(config: &Config, params: CalendarAddParams) -> crate::error::Result<String> {
    let event = calendar::NewEvent {
        title: params.title,
        start: dates::parse_date(&params.start)?,
        end: None,
        duration_minutes: params.duration_minutes,
        calendar: params.calendar.or_else(|| config.default_calendar.clone()),
        location: params.location,
        notes: None,
        all_day: false,
    };
    let uid = calendar::add(&Osascript::from_config(config), &event)?;
    Ok(format!("Created event: {}", uid))
}

fn contacts_search(config: &Config, params: QueryParams) -> crate::error::Result<String> {
    let found = contacts::search(&Osascript::from_config(config), &params.query)?;
    if found.is_empty() {
        return Ok("No contacts found".to_string());
    }
    Ok(found
        .iter()
        .map(output::contact_detail)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn reminders_list(config: &Config, params: RemindersListParams) -> crate::error::Result<String> {
    let runner = Osascript::from_config(config);
    let found = reminders::list(&runner, params.list.as_deref(), params.all.unwrap_or(false))?;
    output::list(&found, false, "reminders", output::reminder_line)
}

fn reminders_add(config: &Config, params: RemindersAddParams) -> crate::error::Result<String> {
    let priority = match params.priority.as_deref() {
        Some(p) => Priority::from_str(p, true).map_err(PimError::InvalidArgument)?,
        None => Priority::None,
    };
    let reminder = reminders::NewReminder {
        title: params.title,
        list: params.list.or_else(|| config.default_reminder_list.clone()),
        due: params.due.as_deref().map(dates::parse_date).transpose()?,
        notes: params.notes,
        priority,
    };
    let id = reminders::add(&Osascript::from_config(config), &reminder)?;
    Ok(format!("Created reminder: {}", id))
}

fn reminders_complete(config: &Config, params: IdParams) -> crate::error::Result<String> {
    reminders::complete(&Osascript::from_config(config), &params.id)?;
    Ok(format!("Completed reminder: {}", params.id))
}

fn notes_search(config: &Config, params: QueryParams) -> crate::error::Result<String> {
    let runner = Osascript::from_config(config);
    let found = notes::search(&runner, &params.query, config.notes_limit)?;
    output::list(&found, false, "notes", output::note_line)
}

fn notes_read(config: &Config, params: IdParams) -> crate::error::Result<String> {
    let note = notes::read(&Osascript::from_config(config), &params.id)?;
    Ok(output::note_detail(&note))
}

fn notes_create(config: &Config, params: NotesCreateParams) -> crate::error::Result<String> {
    let folder = params.folder.or_else(|| config.default_notes_folder.clone());
    let id = notes::create(
        &Osascript::from_config(config),
        &params.title,
        params.body.as_deref().unwrap_or(""),
        folder.as_deref(),
    )?;
    Ok(format!("Created note: {}", id))
}

#[tool_handler]
impl ServerHandler for PimMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "pim".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Access to the macOS Mail, Calendar, Contacts, Reminders and Notes apps. Use the *_list and *_search tools to find ids, then the read, add and complete tools.".to_string(),
            ),
        }
    }
}

pub fn run_mcp_server(config: Config) -> crate::error::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| PimError::Other(format!("failed to build tokio runtime: {}", e)))?
        .block_on(async {
            tracing::info!("starting MCP server on stdio");
            let server = PimMcpServer::new(config);
            let transport = rmcp::transport::io::stdio();
            let running = server
                .serve(transport)
                .await
                .map_err(|e| PimError::Other(format!("MCP server error: {}", e)))?;
            running
                .waiting()
                .await
                .map_err(|e| PimError::Other(format!("MCP server error: {}", e)))?;
            Ok(())
        })
}
