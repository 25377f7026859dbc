use crate::apps::reminders::{self, NewReminder};
use crate::config::Config;
use crate::error::{PimError, Result};
use crate::model::{Priority, Reminder};
use crate::script::{Osascript, ScriptRunner};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::*;

use std::collections::BTreeSet;
use std::io::stdout;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Focus {
    Lists,
    Reminders,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    AddTitle,
    Search,
}

struct App<R: ScriptRunner> {
    runner: R,
    all_reminders: Vec<Reminder>,
    lists: Vec<String>,
    list_idx: usize,
    reminder_idx: usize,
    focus: Focus,
    mode: Mode,
    input: String,
    status_msg: String,
    search_query: String,
    show_completed: bool,
    show_detail: bool,
    should_quit: bool,
}

impl<R: ScriptRunner> App<R> {
    fn new(runner: R) -> Result<Self> {
        let mut app = App {
            runner,
            all_reminders: Vec::new(),
            lists: Vec::new(),
            list_idx: 0,
            reminder_idx: 0,
            focus: Focus::Lists,
            mode: Mode::Normal,
            input: String::new(),
            status_msg: String::from("? for help | Tab to switch panels"),
            search_query: String::new(),
            show_completed: false,
            show_detail: false,
            should_quit: false,
        };
        app.refresh()?;
        Ok(app)
    }

    fn refresh(&mut self) -> Result<()> {
        self.all_reminders = if self.search_query.is_empty() {
            reminders::list(&self.runner, None, self.show_completed)?
        } else {
            reminders::search(&self.runner, &self.search_query, self.show_completed)?
        };

        // Empty lists are still worth showing when not searching.
        let mut names: BTreeSet<String> =
            self.all_reminders.iter().map(|r| r.list.clone()).collect();
        if self.search_query.is_empty() {
            names.extend(reminders::lists(&self.runner)?);
        }
        self.lists = names.into_iter().collect();

        if self.list_idx >= self.lists.len() && !self.lists.is_empty() {
            self.list_idx = self.lists.len() - 1;
        }

        self.clamp_reminder_idx();
        Ok(())
    }

    /// Refresh, keeping the browser open and reporting failures in the status line.
    fn reload(&mut self) -> bool {
        match self.refresh() {
            Ok(()) => true,
            Err(e) => {
                self.status_msg = format!("Error: {}", e);
                false
            }
        }
    }

    fn current_list(&self) -> Option<&str> {
        self.lists.get(self.list_idx).map(String::as_str)
    }

    fn filtered(&self) -> Vec<&Reminder> {
        match self.current_list() {
            Some(list) => self.all_reminders.iter().filter(|r| r.list == list).collect(),
            None => Vec::new(),
        }
    }

    fn clamp_reminder_idx(&mut self) {
        let count = self.filtered().len();
        if count == 0 {
            self.reminder_idx = 0;
        } else if self.reminder_idx >= count {
            self.reminder_idx = count - 1;
        }
    }

    fn selected(&self) -> Option<&Reminder> {
        self.filtered().get(self.reminder_idx).copied()
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::AddTitle => self.handle_add_key(key),
            Mode::Search => self.handle_search_key(key),
        }
    }

    fn move_down(&mut self) {
        match self.focus {
            Focus::Lists => {
                if !self.lists.is_empty() {
                    self.list_idx = (self.list_idx + 1).min(self.lists.len() - 1);
                    self.reminder_idx = 0;
                }
            }
            Focus::Reminders => {
                let count = self.filtered().len();
                if count > 0 {
                    self.reminder_idx = (self.reminder_idx + 1).min(count - 1);
                }
            }
        }
    }

    fn move_up(&mut self) {
        match self.focus {
            Focus::Lists => {
                if self.list_idx > 0 {
                    self.list_idx -= 1;
                    self.reminder_idx = 0;
                }
            }
            Focus::Reminders => {
                self.reminder_idx = self.reminder_idx.saturating_sub(1);
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.show_detail {
                    self.show_detail = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Enter => {
                if self.focus == Focus::Reminders && self.selected().is_some() {
                    self.show_detail = !self.show_detail;
                }
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Lists => Focus::Reminders,
                    Focus::Reminders => Focus::Lists,
                };
            }
            KeyCode::Char('h') | KeyCode::Left => self.focus = Focus::Lists,
            KeyCode::Char('l') | KeyCode::Right => self.focus = Focus::Reminders,
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),
            KeyCode::Char('a') => {
                if self.current_list().is_some() {
                    self.mode = Mode::AddTitle;
                    self.input.clear();
                    self.status_msg = "Enter reminder title:".to_string();
                }
            }
            KeyCode::Char('x') => {
                if let Some(reminder) = self.selected() {
                    let (id, name, done) =
                        (reminder.id.clone(), reminder.name.clone(), reminder.completed);
                    if done {
                        self.status_msg = format!("{} is already done", name);
                    } else {
                        match reminders::complete(&self.runner, &id) {
                            Ok(()) => {
                                self.status_msg = format!("Completed {}", name);
                                self.reload();
                            }
                            Err(e) => self.status_msg = format!("Error: {}", e),
                        }
                    }
                }
            }
            KeyCode::Char('t') => {
                self.show_completed = !self.show_completed;
                self.status_msg = if self.show_completed {
                    "Showing completed".to_string()
                } else {
                    "Hiding completed".to_string()
                };
                self.reload();
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.input.clear();
                self.status_msg = "Search:".to_string();
            }
            KeyCode::Char('c') => {
                self.search_query.clear();
                self.status_msg = "Filter cleared".to_string();
                self.reload();
            }
            KeyCode::Char('r') => {
                if self.reload() {
                    self.status_msg = "Refreshed".to_string();
                }
            }
            KeyCode::Char('?') => {
                self.status_msg =
                    "j/k:nav h/l:panel Tab:switch Enter:detail a:add x:complete t:toggle done /:search c:clear r:refresh q:quit"
                        .to_string();
            }
            _ => {}
        }
    }

    fn handle_add_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status_msg = "Cancelled".to_string();
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                if self.input.trim().is_empty() {
                    self.status_msg = "Title cannot be empty".to_string();
                    return;
                }
                let new = NewReminder {
                    title: self.input.clone(),
                    list: self.current_list().map(str::to_string),
                    due: None,
                    notes: None,
                    priority: Priority::None,
                };
                match reminders::add(&self.runner, &new) {
                    Ok(_) => {
                        self.status_msg = format!("Created {}", new.title);
                        self.reload();
                    }
                    Err(e) => self.status_msg = format!("Error: {}", e),
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => {
                self.input.push(c);
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.search_query.clear();
                self.status_msg = "Search cancelled".to_string();
                self.reload();
            }
            KeyCode::Enter => {
                self.search_query = self.input.trim().to_string();
                self.mode = Mode::Normal;
                self.list_idx = 0;
                self.reminder_idx = 0;
                if self.reload() {
                    self.status_msg = if self.search_query.is_empty() {
                        "Filter cleared".to_string()
                    } else if self.all_reminders.is_empty() {
                        format!("No results for \"{}\"", self.search_query)
                    } else {
                        format!(
                            "{} results for \"{}\"",
                            self.all_reminders.len(),
                            self.search_query
                        )
                    };
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => {
                self.input.push(c);
            }
            _ => {}
        }
    }
}

fn ui<R: ScriptRunner>(frame: &mut Frame, app: &App<R>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(5),    // main
            Constraint::Length(3), // status
        ])
        .split(frame.area());

    let title = if app.search_query.is_empty() {
        " reminders ".to_string()
    } else {
        format!(" reminders | search: \"{}\" ", app.search_query)
    };
    let header = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));
    let open = app.all_reminders.iter().filter(|r| !r.completed).count();
    let header_text = Paragraph::new(format!(
        " {} lists | {} open | {} shown | ? for help",
        app.lists.len(),
        open,
        app.all_reminders.len(),
    ))
    .block(header);
    frame.render_widget(header_text, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(30)])
        .split(chunks[1]);

    let list_border = if app.focus == Focus::Lists {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let list_items: Vec<ListItem> = app
        .lists
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let count = app
                .all_reminders
                .iter()
                .filter(|r| r.list == *name && !r.completed)
                .count();
            let style = if i == app.list_idx {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} ({})", name, count)).style(style)
        })
        .collect();
    let lists = List::new(list_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Lists ")
            .border_style(Style::default().fg(list_border)),
    );
    frame.render_widget(lists, main_chunks[0]);

    let reminder_border = if app.focus == Focus::Reminders {
        Color::Magenta
    } else {
        Color::DarkGray
    };
    let reminder_items: Vec<ListItem> = app
        .filtered()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let checkbox = if r.completed { "[x]" } else { "[ ]" };
            let due = r
                .due
                .map(|d| format!("  {}", d.format("%a %d %b %H:%M")))
                .unwrap_or_default();
            let label = format!("{} {}{}{}", checkbox, r.priority.marker(), r.name, due);
            let style = if i == app.reminder_idx {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if r.completed {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();
    let reminder_title = match app.current_list() {
        Some(list) => format!(" {} ", list),
        None => " Reminders ".to_string(),
    };
    let reminder_list = List::new(reminder_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(reminder_title)
            .border_style(Style::default().fg(reminder_border)),
    );
    frame.render_widget(reminder_list, main_chunks[1]);

    if app.show_detail {
        if let Some(r) = app.selected() {
            let area = frame.area();
            let popup_width = (area.width * 60 / 100)
                .max(40)
                .min(area.width.saturating_sub(4));
            let popup_height = 9.min(area.height.saturating_sub(4));
            let x = (area.width.saturating_sub(popup_width)) / 2;
            let y = (area.height.saturating_sub(popup_height)) / 2;
            let popup_area = Rect::new(x, y, popup_width, popup_height);

            frame.render_widget(Clear, popup_area);

            let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
            let (status, status_color) = if r.completed {
                ("done", Color::Green)
            } else {
                ("open", Color::Yellow)
            };
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Name: ", label),
                    Span::raw(&r.name),
                    Span::raw("  "),
                    Span::styled(
                        format!("[{}]", status),
                        Style::default().fg(status_color).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![Span::styled("List: ", label), Span::raw(&r.list)]),
                Line::from(vec![
                    Span::styled("Priority: ", label),
                    Span::raw(format!("{:?}", r.priority)),
                ]),
            ];
            if let Some(due) = r.due {
                lines.push(Line::from(vec![
                    Span::styled("Due: ", label),
                    Span::raw(due.format("%Y-%m-%d %H:%M").to_string()),
                ]));
            }
            if !r.notes.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Notes: ", label),
                    Span::raw(&r.notes),
                ]));
            }

            let popup = Paragraph::new(Text::from(lines))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Reminder ")
                        .title_bottom(" Esc to close ")
                        .border_style(Style::default().fg(Color::Cyan)),
                );
            frame.render_widget(popup, popup_area);
        }
    }

    let input_text = match app.mode {
        Mode::Normal => app.status_msg.clone(),
        Mode::AddTitle => format!(
            "[{}] Title: {}_",
            app.current_list().unwrap_or_default(),
            app.input
        ),
        Mode::Search => format!("/{}_", app.input),
    };
    let mode_label = match app.mode {
        Mode::Normal => "NORMAL",
        Mode::AddTitle => "ADD",
        Mode::Search => "SEARCH",
    };
    let status_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", mode_label))
        .border_style(Style::default().fg(if app.mode == Mode::Normal {
            Color::Gray
        } else {
            Color::Green
        }));
    let status = Paragraph::new(input_text).block(status_block);
    frame.render_widget(status, chunks[2]);
}

pub fn run(config: Config) -> Result<()> {
    // Load before touching the terminal so script errors print normally.
    let mut app = App::new(Osascript::from_config(&config))?;

    enable_raw_mode().map_err(|e| PimError::Other(e.to_string()))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| PimError::Other(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend).map_err(|e| PimError::Other(e.to_string()))?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode().map_err(|e| PimError::Other(e.to_string()))?;
    stdout()
        .execute(LeaveAlternateScreen)
        .map_err(|e| PimError::Other(e.to_string()))?;

    result
}

fn event_loop<B: Backend, R: ScriptRunner>(
    terminal: &mut Terminal<B>,
    app: &mut App<R>,
) -> Result<()> {
    loop {
        terminal
            .draw(|f| ui(f, app))
            .map_err(|e| PimError::Other(e.to_string()))?;

        if event::poll(Duration::from_millis(100)).map_err(|e| PimError::Other(e.to_string()))? {
            if let Event::Key(key) = event::read().map_err(|e| PimError::Other(e.to_string()))? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                app.handle_key(key);
                if app.should_quit {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PimError;
    use crate::script::testing::MockRunner;

    const REMINDERS: &str = "r1|Milk|Errands||false|0|\nr2|Call|Family|2026-10-19T09:00:00|false|1|\n";

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app(replies: &[&str]) -> App<MockRunner> {
        App::new(MockRunner::replying(replies)).unwrap()
    }

    #[test]
    fn lists_include_empty_ones() {
        let app = app(&[REMINDERS, "Errands\nFamily\nWork\n"]);
        assert_eq!(app.lists, vec!["Errands", "Family", "Work"]);
        assert_eq!(app.filtered().len(), 1);
    }

    #[test]
    fn navigation_switches_list() {
        let mut app = app(&[REMINDERS, "Errands\nFamily\n"]);
        app.handle_key(key('j'));
        assert_eq!(app.current_list(), Some("Family"));
        assert_eq!(app.selected().map(|r| r.name.as_str()), Some("Call"));
        app.handle_key(key('k'));
        assert_eq!(app.current_list(), Some("Errands"));
    }

    #[test]
    fn complete_runs_script_and_refreshes() {
        let mut app = app(&[REMINDERS, "Errands\nFamily\n", "ok", "", "Errands\nFamily\n"]);
        app.handle_key(key('l'));
        app.handle_key(key('x'));
        assert_eq!(app.status_msg, "Completed Milk");
        let scripts = app.runner.scripts.borrow();
        assert!(scripts[2].contains("set r to reminder id \"r1\""));
        assert_eq!(scripts.len(), 5);
    }

    #[test]
    fn add_goes_to_current_list() {
        let mut app = app(&[REMINDERS, "Errands\nFamily\n", "new-id", REMINDERS, "Errands\nFamily\n"]);
        app.handle_key(key('a'));
        for c in "Eggs".chars() {
            app.handle_key(key(c));
        }
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.status_msg, "Created Eggs");
        assert!(app.runner.scripts.borrow()[2].contains("set l to list \"Errands\""));
    }

    #[test]
    fn search_uses_query() {
        let mut app = app(&[REMINDERS, "Errands\nFamily\n", "r1|Milk|Errands||false|0|\n"]);
        app.handle_key(key('/'));
        for c in "milk".chars() {
            app.handle_key(key(c));
        }
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.lists, vec!["Errands"]);
        assert_eq!(app.status_msg, "1 results for \"milk\"");
    }

    #[test]
    fn failed_refresh_keeps_browser_open() {
        let mut app = app(&[REMINDERS, "Errands\nFamily\n"]);
        app.runner
            .push_failure(PimError::Script("Reminders got an error: timed out".to_string()));
        app.handle_key(key('r'));
        assert!(!app.should_quit);
        assert_eq!(
            app.status_msg,
            "Error: AppleScript failed: Reminders got an error: timed out"
        );
        assert_eq!(app.all_reminders.len(), 2);
        app.handle_key(key('r'));
        assert_eq!(app.status_msg, "Refreshed");
    }
}
