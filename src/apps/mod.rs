//! One module per host application. Each builds AppleScript, runs it
//! through a [`ScriptRunner`] and decodes the records it prints.

pub mod calendar;
pub mod contacts;
pub mod mail;
pub mod notes;
pub mod reminders;

use crate::error::{PimError, Result};
use crate::protocol;
use crate::script::{with_prelude, ScriptRunner};

/// Marker a script prints when the object it was asked for does not exist.
pub(crate) const NOT_FOUND: &str = "NOT_FOUND";

/// Run a script whose output is one record per line.
pub(crate) fn fetch<T>(
    runner: &dyn ScriptRunner,
    body: &str,
    fields: usize,
    build: fn(&[String]) -> Result<T>,
) -> Result<Vec<T>> {
    let output = runner.run(&with_prelude(body))?;
    protocol::decode(&output, fields)?
        .iter()
        .map(|record| build(record))
        .collect()
}

/// Run a script whose output is one plain name per line.
pub(crate) fn fetch_names(runner: &dyn ScriptRunner, body: &str) -> Result<Vec<String>> {
    let output = runner.run(&with_prelude(body))?;
    Ok(protocol::decode_names(&output))
}

/// Run a script that targets a single object, mapping the not-found marker.
pub(crate) fn run_targeted(runner: &dyn ScriptRunner, body: &str, what: &str) -> Result<String> {
    let output = runner.run(&with_prelude(body))?;
    if output.trim() == NOT_FOUND {
        return Err(PimError::NotFound(what.to_string()));
    }
    Ok(output)
}

/// AppleScript fragment that returns the not-found marker when `target`
/// cannot be resolved, leaving the object in `var`.
pub(crate) fn resolve_or_bail(var: &str, target: &str) -> String {
    format!(
        "try\n    set {var} to {target}\non error\n    return \"{NOT_FOUND}\"\nend try\n"
    )
}

pub(crate) fn require_text(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PimError::InvalidArgument(format!("{} cannot be empty", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing::MockRunner;

    #[test]
    fn targeted_maps_marker() {
        let runner = MockRunner::replying(&["NOT_FOUND"]);
        let err = run_targeted(&runner, "return 1", "note 42").unwrap_err();
        assert!(matches!(err, PimError::NotFound(what) if what == "note 42"));
    }

    #[test]
    fn fetch_prepends_prelude() {
        let runner = MockRunner::replying(&["a\nb\n"]);
        let names = fetch_names(&runner, "return \"\"").unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert!(runner.last_script().starts_with("on clean(v)"));
    }

    #[test]
    fn resolve_fragment_returns_marker() {
        let fragment = resolve_or_bail("n", "note id \"x\"");
        assert!(fragment.contains("set n to note id \"x\""));
        assert!(fragment.contains("return \"NOT_FOUND\""));
    }
}
