use super::{fetch, fetch_names, require_text, resolve_or_bail, run_targeted};
use crate::config::atomic_write;
use crate::error::{PimError, Result};
use crate::model::Note;
use crate::protocol::{decode_line, split_header};
use crate::script::{quote, ScriptRunner};
use std::path::{Path, PathBuf};

const RECORD: &str = r#"my clean(id of n) & "|" & my clean(name of n) & "|" & my clean(name of container of n) & "|" & my isoDate(creation date of n) & "|" & my isoDate(modification date of n)"#;

fn note_loop(folder: Option<&str>, text_filter: Option<&str>) -> String {
    let source = match folder {
        Some(name) => format!("{{folder {}}}", quote(name)),
        None => "folders".to_string(),
    };
    let selection = match text_filter {
        Some(q) => {
            let q = quote(q);
            format!("(notes of f whose name contains {q} or plaintext contains {q})")
        }
        None => "notes of f".to_string(),
    };
    format!(
        r#"tell application "Notes"
    set out to ""
    repeat with f in {source}
        repeat with n in {selection}
            set out to out & {RECORD} & linefeed
        end repeat
    end repeat
    return out
end tell"#
    )
}

pub fn folders(runner: &dyn ScriptRunner) -> Result<Vec<String>> {
    fetch_names(
        runner,
        r#"tell application "Notes"
    set out to ""
    repeat with f in folders
        set out to out & my clean(name of f) & linefeed
    end repeat
    return out
end tell"#,
    )
}

/// Most recently modified notes first, at most `limit`.
pub fn list(runner: &dyn ScriptRunner, folder: Option<&str>, limit: usize) -> Result<Vec<Note>> {
    let found = fetch(runner, &note_loop(folder, None), Note::FIELDS, Note::from_fields)?;
    Ok(recent(found, limit))
}

pub fn search(runner: &dyn ScriptRunner, query: &str, limit: usize) -> Result<Vec<Note>> {
    require_text(query, "search query")?;
    let found = fetch(
        runner,
        &note_loop(None, Some(query)),
        Note::FIELDS,
        Note::from_fields,
    )?;
    Ok(recent(found, limit))
}

/// A note with its plain-text body.
pub fn read(runner: &dyn ScriptRunner, id: &str) -> Result<Note> {
    let (mut note, body) = fetch_one(runner, id, "plaintext")?;
    note.body = Some(body);
    Ok(note)
}

pub fn create(
    runner: &dyn ScriptRunner,
    title: &str,
    body: &str,
    folder: Option<&str>,
) -> Result<String> {
    require_text(title, "note title")?;
    let (target, what) = match folder {
        Some(name) => (format!("folder {}", quote(name)), format!("folder {}", name)),
        None => (
            "default folder of default account".to_string(),
            "default folder".to_string(),
        ),
    };
    let script = format!(
        r#"tell application "Notes"
    {resolve}    set n to make new note at f with properties {{name:{name}, body:{html}}}
    return id of n
end tell"#,
        resolve = resolve_or_bail("f", &target),
        name = quote(title),
        html = quote(&to_html(title, body)),
    );
    tracing::info!(%title, "creating note");
    let id = run_targeted(runner, &script, &what)?;
    Ok(id.trim().to_string())
}

/// Write the note's HTML body into `dir`, which must already exist.
pub fn export(runner: &dyn ScriptRunner, id: &str, dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(PimError::InvalidArgument(format!(
            "export directory does not exist: {}",
            dir.display()
        )));
    }
    let (note, html) = fetch_one(runner, id, "body")?;
    let path = dir.join(format!("{}.html", file_stem(&note.name)));
    atomic_write(&path, html.as_bytes())?;
    tracing::info!(path = %path.display(), "exported note");
    Ok(path)
}

fn fetch_one(runner: &dyn ScriptRunner, id: &str, body_property: &str) -> Result<(Note, String)> {
    require_text(id, "note id")?;
    let script = format!(
        r#"tell application "Notes"
    {resolve}    return {RECORD} & linefeed & ({body_property} of n as text)
end tell"#,
        resolve = resolve_or_bail("n", &format!("note id {}", quote(id))),
    );
    let output = run_targeted(runner, &script, &format!("note {}", id))?;
    let (header, body) = split_header(&output);
    let note = Note::from_fields(&decode_line(header, Note::FIELDS)?)?;
    Ok((note, body.to_string()))
}

fn recent(mut notes: Vec<Note>, limit: usize) -> Vec<Note> {
    notes.sort_by(|a, b| b.modified.cmp(&a.modified));
    notes.truncate(limit);
    notes
}

/// Notes stores bodies as HTML; the title becomes the heading.
pub fn to_html(title: &str, body: &str) -> String {
    let mut html = format!("<h1>{}</h1>", escape_html(title));
    if !body.is_empty() {
        html.push_str(&format!("<div>{}</div>", escape_html(body).replace('\n', "<br>")));
    }
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\r', "")
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim().trim_matches('.').to_string();
    if stem.is_empty() {
        "note".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing::MockRunner;

    const HEADER: &str = "x-coredata://N1|Groceries|Notes|2026-10-01T08:00:00|2026-10-17T19:30:00";

    #[test]
    fn list_sorted_newest_and_truncated() {
        let runner = MockRunner::replying(&[
            "a|Old|Notes|2026-01-01T00:00:00|2026-01-02T00:00:00\n\
             b|New|Work|2026-10-01T00:00:00|2026-10-17T00:00:00\n\
             c|Mid|Notes|2026-05-01T00:00:00|2026-05-02T00:00:00\n",
        ]);
        let found = list(&runner, None, 2).unwrap();
        let names: Vec<_> = found.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Mid"]);
    }

    #[test]
    fn search_matches_name_or_text() {
        let runner = MockRunner::replying(&[""]);
        search(&runner, "eggs", 10).unwrap();
        assert!(runner
            .last_script()
            .contains("(notes of f whose name contains \"eggs\" or plaintext contains \"eggs\")"));
    }

    #[test]
    fn read_returns_body() {
        let out = format!("{}\nmilk\neggs | flour", HEADER);
        let runner = MockRunner::replying(&[&out]);
        let note = read(&runner, "x-coredata://N1").unwrap();
        assert_eq!(note.folder, "Notes");
        assert_eq!(note.body.as_deref(), Some("milk\neggs | flour"));
        assert!(runner.last_script().contains("(plaintext of n as text)"));
    }

    #[test]
    fn create_sends_html() {
        let runner = MockRunner::replying(&["x-coredata://N2"]);
        let id = create(&runner, "Ideas", "a < b\nsecond", Some("Work")).unwrap();
        assert_eq!(id, "x-coredata://N2");
        let script = runner.last_script();
        assert!(script.contains("set f to folder \"Work\""));
        assert!(script.contains("body:\"<h1>Ideas</h1><div>a &lt; b<br>second</div>\""));
    }

    #[test]
    fn html_conversion() {
        assert_eq!(to_html("T", ""), "<h1>T</h1>");
        assert_eq!(to_html("A&B", "x\ny"), "<h1>A&amp;B</h1><div>x<br>y</div>");
    }

    #[test]
    fn export_writes_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = format!("{}\n<div>milk</div>", HEADER);
        let runner = MockRunner::replying(&[&out]);
        let path = export(&runner, "x-coredata://N1", dir.path()).unwrap();
        assert_eq!(path, dir.path().join("Groceries.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<div>milk</div>");
        assert!(runner.last_script().contains("(body of n as text)"));
    }

    #[test]
    fn export_requires_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::default();
        let missing = dir.path().join("nope");
        assert!(matches!(
            export(&runner, "x", &missing),
            Err(PimError::InvalidArgument(_))
        ));
        assert!(runner.scripts.borrow().is_empty());
    }

    #[test]
    fn file_stems_are_safe() {
        assert_eq!(file_stem("a/b: c"), "a_b_ c");
        assert_eq!(file_stem("../"), "_");
        assert_eq!(file_stem("  "), "note");
    }
}
