mod apps;
mod config;
mod dates;
mod error;
mod mcp;
mod model;
mod output;
mod protocol;
mod script;
mod tui;

use apps::{calendar, contacts, mail, notes, reminders};
use clap::{Parser, Subcommand};
use config::Config;
use error::{PimError, Result};
use model::Priority;
use script::Osascript;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pim",
    version,
    about = "Mail, Calendar, Contacts, Reminders and Notes from the terminal"
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log generated AppleScript to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.config/pim/config.toml
    Init,

    /// Read, search and send mail
    Mail {
        #[command(subcommand)]
        action: MailCmd,
    },

    /// List, search, add and delete calendar events
    Calendar {
        #[command(subcommand)]
        action: CalendarCmd,
    },

    /// Look up and add contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsCmd,
    },

    /// Manage reminders
    Reminders {
        #[command(subcommand)]
        action: RemindersCmd,
    },

    /// Browse, read and create notes
    Notes {
        #[command(subcommand)]
        action: NotesCmd,
    },

    /// Open interactive Reminders browser
    Tui,

    /// Start MCP server (stdio transport)
    Mcp,
}

#[derive(Subcommand)]
enum MailCmd {
    /// List mail accounts
    Accounts,
    /// List mailboxes as account/mailbox
    Mailboxes {
        #[arg(long)]
        account: Option<String>,
    },
    /// Show the newest messages of a mailbox (default: inbox)
    List {
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only unread messages
        #[arg(long)]
        unread: bool,
    },
    /// Find messages by subject or sender
    Search {
        query: Vec<String>,
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show one message with its content
    Read {
        id: String,
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Compose and send a message
    Send {
        #[arg(long, required = true, value_delimiter = ',')]
        to: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        cc: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        bcc: Vec<String>,
        #[arg(short, long)]
        subject: String,
        #[arg(short, long, default_value = "")]
        body: String,
        /// Open the message in Mail instead of sending it
        #[arg(long)]
        draft: bool,
    },
    /// Mark a message as read
    MarkRead {
        id: String,
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Count unread messages
    UnreadCount {
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
enum CalendarCmd {
    /// List calendars
    Calendars,
    /// Events in a date range (default: the next few days)
    Events {
        /// Start of range, e.g. "today", "next monday", "2026-11-01"
        #[arg(long)]
        from: Option<String>,
        /// End of range (exclusive)
        #[arg(long, conflicts_with = "days")]
        to: Option<String>,
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Today's events
    Today {
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Find upcoming events by title
    Search {
        query: Vec<String>,
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Create an event
    Add {
        title: Vec<String>,
        /// e.g. "tomorrow 3pm"
        #[arg(long)]
        start: String,
        #[arg(long, conflicts_with = "duration")]
        end: Option<String>,
        /// Length in minutes
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long)]
        calendar: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        all_day: bool,
    },
    /// Delete an event by uid
    Delete {
        uid: String,
        #[arg(long)]
        calendar: Option<String>,
    },
}

#[derive(Subcommand)]
enum ContactsCmd {
    /// Find people by name, organization or email
    Search { query: Vec<String> },
    /// Show one person
    Show { name: Vec<String> },
    /// Create a person
    Add {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        org: Option<String>,
    },
    /// List groups
    Groups,
}

#[derive(Subcommand)]
enum RemindersCmd {
    /// List reminder lists
    Lists,
    /// Show reminders (open only unless --all)
    List {
        #[arg(long)]
        list: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Find reminders by name
    Search {
        query: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Create a reminder
    Add {
        title: Vec<String>,
        #[arg(long)]
        list: Option<String>,
        /// e.g. "tomorrow 9am", "in 3 days"
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::None)]
        priority: Priority,
    },
    /// Mark a reminder as completed
    Complete { id: String },
    /// Delete a reminder
    Delete { id: String },
}

#[derive(Subcommand)]
enum NotesCmd {
    /// List folders
    Folders,
    /// Show recently modified notes
    List {
        #[arg(long)]
        folder: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Find notes by title or text
    Search {
        query: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a note's text
    Read { id: String },
    /// Create a note
    Create {
        title: Vec<String>,
        #[arg(short, long, default_value = "")]
        body: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Save a note's HTML into an existing directory
    Export {
        id: String,
        #[arg(long)]
        dir: PathBuf,
    },
}

struct Ctx {
    config: Config,
    runner: Osascript,
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pim=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Mail { action } => cmd_mail(&context(json)?, action),
        Commands::Calendar { action } => cmd_calendar(&context(json)?, action),
        Commands::Contacts { action } => cmd_contacts(&context(json)?, action),
        Commands::Reminders { action } => cmd_reminders(&context(json)?, action),
        Commands::Notes { action } => cmd_notes(&context(json)?, action),
        Commands::Tui => tui::run(Config::load()?),
        Commands::Mcp => mcp::run_mcp_server(Config::load()?),
    }
}

fn context(json: bool) -> Result<Ctx> {
    let config = Config::load()?;
    Ok(Ctx {
        runner: Osascript::from_config(&config),
        config,
        json,
    })
}

fn cmd_init() -> Result<()> {
    let path = Config::config_path();
    if path.exists() {
        println!("config already exists at {}", path.display());
        return Ok(());
    }
    Config::default().save()?;
    println!("wrote default config to {}", path.display());
    Ok(())
}

fn joined(words: &[String], what: &str) -> Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(PimError::InvalidArgument(format!("{} cannot be empty", what)));
    }
    Ok(text)
}

fn cmd_mail(ctx: &Ctx, action: MailCmd) -> Result<()> {
    let r = &ctx.runner;
    let sel = |mailbox: Option<String>, account: Option<String>| mail::MailboxSel {
        mailbox,
        account,
    };
    let text = match action {
        MailCmd::Accounts => output::names(&mail::accounts(r)?, ctx.json, "accounts")?,
        MailCmd::Mailboxes { account } => {
            output::names(&mail::mailboxes(r, account.as_deref())?, ctx.json, "mailboxes")?
        }
        MailCmd::List {
            mailbox,
            account,
            limit,
            unread,
        } => {
            let limit = limit.unwrap_or(ctx.config.mail_limit);
            let found = mail::list(r, &sel(mailbox, account), limit, unread)?;
            output::list(&found, ctx.json, "messages", output::message_line)?
        }
        MailCmd::Search {
            query,
            mailbox,
            account,
            limit,
        } => {
            let query = joined(&query, "search query")?;
            let limit = limit.unwrap_or(ctx.config.mail_limit);
            let found = mail::search(r, &sel(mailbox, account), &query, limit)?;
            output::list(&found, ctx.json, "messages", output::message_line)?
        }
        MailCmd::Read {
            id,
            mailbox,
            account,
        } => {
            let message = mail::read(r, &sel(mailbox, account), &id)?;
            output::one(&message, ctx.json, output::message_detail)?
        }
        MailCmd::Send {
            to,
            cc,
            bcc,
            subject,
            body,
            draft,
        } => {
            let outgoing = mail::Outgoing {
                to,
                cc,
                bcc,
                subject,
                body,
                draft,
            };
            mail::send(r, &outgoing)?;
            if draft {
                "draft opened in Mail".to_string()
            } else {
                format!("sent to {}", outgoing.to.join(", "))
            }
        }
        MailCmd::MarkRead {
            id,
            mailbox,
            account,
        } => {
            mail::mark_read(r, &sel(mailbox, account), &id)?;
            format!("marked {} as read", id)
        }
        MailCmd::UnreadCount { mailbox, account } => {
            let count = mail::unread_count(r, &sel(mailbox, account))?;
            if ctx.json {
                output::json(&serde_json::json!({ "unread": count }))?
            } else {
                count.to_string()
            }
        }
    };
    println!("{}", text);
    Ok(())
}

fn cmd_calendar(ctx: &Ctx, action: CalendarCmd) -> Result<()> {
    let r = &ctx.runner;
    let text = match action {
        CalendarCmd::Calendars => output::names(&calendar::calendars(r)?, ctx.json, "calendars")?,
        CalendarCmd::Events {
            from,
            to,
            days,
            calendar: cal,
        } => {
            let from = dates::parse_date(from.as_deref().unwrap_or("today"))?;
            let to = match to {
                Some(to) => dates::parse_date(&to)?,
                None => calendar::range_end(from, days.unwrap_or(ctx.config.calendar_days))?,
            };
            let found = calendar::events(r, from, to, cal.as_deref())?;
            output::list(&found, ctx.json, "events", output::event_line)?
        }
        CalendarCmd::Today { calendar: cal } => {
            let now = chrono::Local::now().naive_local();
            let found = calendar::today(r, now, cal.as_deref())?;
            output::list(&found, ctx.json, "events today", output::event_line)?
        }
        CalendarCmd::Search {
            query,
            days,
            calendar: cal,
        } => {
            let query = joined(&query, "search query")?;
            let from = dates::parse_date("today")?;
            let found = calendar::search(r, &query, from, days, cal.as_deref())?;
            output::list(&found, ctx.json, "events", output::event_line)?
        }
        CalendarCmd::Add {
            title,
            start,
            end,
            duration,
            calendar: cal,
            location,
            notes,
            all_day,
        } => {
            let event = calendar::NewEvent {
                title: joined(&title, "event title")?,
                start: dates::parse_date(&start)?,
                end: end.as_deref().map(dates::parse_date).transpose()?,
                duration_minutes: duration,
                calendar: cal.or_else(|| ctx.config.default_calendar.clone()),
                location,
                notes,
                all_day,
            };
            let uid = calendar::add(r, &event)?;
            format!("created event {} ({})", event.title, uid)
        }
        CalendarCmd::Delete { uid, calendar: cal } => {
            calendar::delete(r, &uid, cal.as_deref())?;
            format!("deleted event {}", uid)
        }
    };
    println!("{}", text);
    Ok(())
}

fn cmd_contacts(ctx: &Ctx, action: ContactsCmd) -> Result<()> {
    let r = &ctx.runner;
    let text = match action {
        ContactsCmd::Search { query } => {
            let query = joined(&query, "search query")?;
            let found = contacts::search(r, &query)?;
            output::list(&found, ctx.json, "contacts", output::contact_line)?
        }
        ContactsCmd::Show { name } => {
            let name = joined(&name, "name")?;
            let person = contacts::show(r, &name)?;
            output::one(&person, ctx.json, output::contact_detail)?
        }
        ContactsCmd::Add {
            first,
            last,
            email,
            phone,
            org,
        } => {
            let id = contacts::add(
                r,
                &contacts::NewContact {
                    first,
                    last,
                    email,
                    phone,
                    organization: org,
                },
            )?;
            format!("created contact {}", id)
        }
        ContactsCmd::Groups => output::names(&contacts::groups(r)?, ctx.json, "groups")?,
    };
    println!("{}", text);
    Ok(())
}

fn cmd_reminders(ctx: &Ctx, action: RemindersCmd) -> Result<()> {
    let r = &ctx.runner;
    let text = match action {
        RemindersCmd::Lists => output::names(&reminders::lists(r)?, ctx.json, "lists")?,
        RemindersCmd::List { list, all } => {
            let found = reminders::list(r, list.as_deref(), all)?;
            output::list(&found, ctx.json, "reminders", output::reminder_line)?
        }
        RemindersCmd::Search { query, all } => {
            let query = joined(&query, "search query")?;
            let found = reminders::search(r, &query, all)?;
            output::list(&found, ctx.json, "reminders", output::reminder_line)?
        }
        RemindersCmd::Add {
            title,
            list,
            due,
            notes,
            priority,
        } => {
            let reminder = reminders::NewReminder {
                title: joined(&title, "reminder title")?,
                list: list.or_else(|| ctx.config.default_reminder_list.clone()),
                due: due.as_deref().map(dates::parse_date).transpose()?,
                notes,
                priority,
            };
            let id = reminders::add(r, &reminder)?;
            format!("created reminder {} ({})", reminder.title, id)
        }
        RemindersCmd::Complete { id } => {
            reminders::complete(r, &id)?;
            format!("completed {}", id)
        }
        RemindersCmd::Delete { id } => {
            reminders::delete(r, &id)?;
            format!("deleted {}", id)
        }
    };
    println!("{}", text);
    Ok(())
}

fn cmd_notes(ctx: &Ctx, action: NotesCmd) -> Result<()> {
    let r = &ctx.runner;
    let text = match action {
        NotesCmd::Folders => output::names(&notes::folders(r)?, ctx.json, "folders")?,
        NotesCmd::List { folder, limit } => {
            let limit = limit.unwrap_or(ctx.config.notes_limit);
            let found = notes::list(r, folder.as_deref(), limit)?;
            output::list(&found, ctx.json, "notes", output::note_line)?
        }
        NotesCmd::Search { query, limit } => {
            let query = joined(&query, "search query")?;
            let limit = limit.unwrap_or(ctx.config.notes_limit);
            let found = notes::search(r, &query, limit)?;
            output::list(&found, ctx.json, "notes", output::note_line)?
        }
        NotesCmd::Read { id } => {
            let note = notes::read(r, &id)?;
            output::one(&note, ctx.json, output::note_detail)?
        }
        NotesCmd::Create {
            title,
            body,
            folder,
        } => {
            let title = joined(&title, "note title")?;
            let folder = folder.or_else(|| ctx.config.default_notes_folder.clone());
            let id = notes::create(r, &title, &body, folder.as_deref())?;
            format!("created note {} ({})", title, id)
        }
        NotesCmd::Export { id, dir } => {
            let path = notes::export(r, &id, &dir)?;
            format!("exported to {}", path.display())
        }
    };
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "pim", "--json", "reminders", "add", "Buy", "milk", "--due", "tomorrow 9am",
            "--priority", "high",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Reminders {
                action:
                    RemindersCmd::Add {
                        title,
                        due,
                        priority,
                        ..
                    },
            } => {
                assert_eq!(title, vec!["Buy", "milk"]);
                assert_eq!(due.as_deref(), Some("tomorrow 9am"));
                assert_eq!(priority, Priority::High);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn send_splits_recipients() {
        let cli = Cli::try_parse_from([
            "pim", "mail", "send", "--to", "a@x.org,b@x.org", "-s", "Hi",
        ])
        .unwrap();
        match cli.command {
            Commands::Mail {
                action: MailCmd::Send { to, body, .. },
            } => {
                assert_eq!(to, vec!["a@x.org", "b@x.org"]);
                assert_eq!(body, "");
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn mailbox_commands_take_account() {
        let cli = Cli::try_parse_from([
            "pim", "mail", "read", "42", "--mailbox", "Archive", "--account", "Work",
        ])
        .unwrap();
        match cli.command {
            Commands::Mail {
                action: MailCmd::Read {
                    id,
                    mailbox,
                    account,
                },
            } => {
                assert_eq!(id, "42");
                assert_eq!(mailbox.as_deref(), Some("Archive"));
                assert_eq!(account.as_deref(), Some("Work"));
            }
            _ => panic!("wrong command"),
        }
        for args in [
            vec!["pim", "mail", "search", "invoice", "--account", "Work"],
            vec!["pim", "mail", "mark-read", "42", "--account", "Work"],
            vec!["pim", "mail", "unread-count", "--account", "Work", "--mailbox", "Archive"],
        ] {
            assert!(Cli::try_parse_from(args.clone()).is_ok(), "rejected {:?}", args);
        }
    }

    #[test]
    fn send_requires_to() {
        assert!(Cli::try_parse_from(["pim", "mail", "send", "-s", "Hi"]).is_err());
    }

    #[test]
    fn events_to_conflicts_with_days() {
        assert!(Cli::try_parse_from([
            "pim", "calendar", "events", "--to", "tomorrow", "--days", "3"
        ])
        .is_err());
    }

    #[test]
    fn joined_rejects_empty() {
        assert!(joined(&[], "title").is_err());
        assert_eq!(joined(&["a".into(), "b".into()], "title").unwrap(), "a b");
    }
}
