//! Running AppleScript through `osascript` and building script fragments.

use crate::config::Config;
use crate::error::{PimError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

static DENIED_APP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Apple ?events to (.+?)\.").unwrap());

/// Handlers shared by every script that returns records.
///
/// `clean` strips the record and field separators out of user content,
/// `cleanItem` additionally strips the list separator, and `isoDate`
/// renders dates from their numeric parts so output does not depend on
/// the user's locale.
pub const PRELUDE: &str = r#"on clean(v)
    if v is missing value then return ""
    set t to v as text
    set oldDelims to AppleScript's text item delimiters
    set AppleScript's text item delimiters to {"|", return, linefeed}
    set parts to text items of t
    set AppleScript's text item delimiters to " "
    set t to parts as text
    set AppleScript's text item delimiters to oldDelims
    return t
end clean

on cleanItem(v)
    set t to my clean(v)
    set oldDelims to AppleScript's text item delimiters
    set AppleScript's text item delimiters to ";"
    set parts to text items of t
    set AppleScript's text item delimiters to ","
    set t to parts as text
    set AppleScript's text item delimiters to oldDelims
    return t
end cleanItem

on pad(n)
    set t to "0" & (n as integer as text)
    return text -2 thru -1 of t
end pad

on isoDate(d)
    if d is missing value then return ""
    set s to time of d
    set hh to s div 3600
    set mm to (s mod 3600) div 60
    set ss to s mod 60
    return ((year of d) as integer as text) & "-" & my pad(month of d as integer) & "-" & my pad(day of d) & "T" & my pad(hh) & ":" & my pad(mm) & ":" & my pad(ss)
end isoDate
"#;

pub trait ScriptRunner {
    fn run(&self, script: &str) -> Result<String>;
}

/// Runs scripts with the system `osascript` binary, one blocking process per call.
pub struct Osascript {
    program: String,
}

impl Osascript {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.osascript.clone())
    }
}

impl ScriptRunner for Osascript {
    fn run(&self, script: &str) -> Result<String> {
        tracing::debug!(program = %self.program, "running script:\n{}", script);

        let output = Command::new(&self.program)
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PimError::OsascriptMissing,
                _ => PimError::Io(e),
            })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            tracing::trace!("script output:\n{}", stdout);
            Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(status = ?output.status.code(), "script failed: {}", stderr);
            Err(classify_failure(&stderr))
        }
    }
}

fn classify_failure(stderr: &str) -> PimError {
    if stderr.contains("-1743") || stderr.contains("Not authorized") {
        let app = DENIED_APP_RE
            .captures(stderr)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "the target application".to_string());
        return PimError::Permission(app);
    }
    PimError::Script(stderr.to_string())
}

/// Escape a string for use inside an AppleScript string literal.
pub fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Quote a string as an AppleScript literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Prepend the shared handlers to a script body.
pub fn with_prelude(body: &str) -> String {
    format!("{}\n{}", PRELUDE, body)
}

/// Lines that build the AppleScript date `var` from numeric parts.
///
/// The day is pinned to 1 before the month changes so that e.g. Jan 31
/// moving to February does not overflow into March.
pub fn date_assignment(var: &str, at: NaiveDateTime) -> String {
    format!(
        "set {var} to current date\n\
         set day of {var} to 1\n\
         set year of {var} to {}\n\
         set month of {var} to {}\n\
         set day of {var} to {}\n\
         set time of {var} to {}\n",
        at.year(),
        at.month(),
        at.day(),
        at.num_seconds_from_midnight(),
    )
}
