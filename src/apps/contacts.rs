use super::{fetch, fetch_names, require_text, run_targeted};
use crate::error::{PimError, Result};
use crate::model::Contact;
use crate::protocol::decode_line;
use crate::script::{quote, ScriptRunner};

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub first: String,
    pub last: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub organization: Option<String>,
}

/// Builds one record for person `p`; emails and phones are nested lists.
const PERSON_RECORD: &str = r#"set em to ""
        repeat with x in emails of p
            set em to em & my cleanItem(value of x) & ";"
        end repeat
        set ph to ""
        repeat with x in phones of p
            set ph to ph & my cleanItem(value of x) & ";"
        end repeat
        set rec to my clean(id of p) & "|" & my clean(name of p) & "|" & my clean(organization of p) & "|" & em & "|" & ph & "|" & my clean(note of p)"#;

pub fn search(runner: &dyn ScriptRunner, query: &str) -> Result<Vec<Contact>> {
    require_text(query, "search query")?;
    let q = quote(query);
    let body = format!(
        r#"tell application "Contacts"
    set out to ""
    set found to (every person whose name contains {q} or organization contains {q} or (value of emails contains {q}))
    repeat with p in found
        {PERSON_RECORD}
        set out to out & rec & linefeed
    end repeat
    return out
end tell"#
    );
    let mut people = fetch(runner, &body, Contact::FIELDS, Contact::from_fields)?;
    people.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(people)
}

/// Exact name match first, falling back to the first partial match.
pub fn show(runner: &dyn ScriptRunner, name: &str) -> Result<Contact> {
    require_text(name, "name")?;
    let n = quote(name);
    let body = format!(
        r#"tell application "Contacts"
    set hits to (every person whose name is {n})
    if (count of hits) is 0 then set hits to (every person whose name contains {n})
    if (count of hits) is 0 then return "NOT_FOUND"
    set p to item 1 of hits
    {PERSON_RECORD}
    return rec
end tell"#
    );
    let output = run_targeted(runner, &body, &format!("contact {}", name))?;
    let fields = decode_line(output.trim(), Contact::FIELDS)?;
    Contact::from_fields(&fields)
}

/// Create a person and return its id.
pub fn add(runner: &dyn ScriptRunner, contact: &NewContact) -> Result<String> {
    require_text(&contact.first, "first name")?;

    let mut props = format!("first name:{}", quote(&contact.first));
    if let Some(last) = &contact.last {
        props.push_str(&format!(", last name:{}", quote(last)));
    }
    if let Some(org) = &contact.organization {
        props.push_str(&format!(", organization:{}", quote(org)));
    }

    let mut extras = String::new();
    if let Some(email) = &contact.email {
        if !email.contains('@') {
            return Err(PimError::InvalidArgument(format!("not an email address: {}", email)));
        }
        extras.push_str(&format!(
            "    make new email at end of emails of p with properties {{label:\"work\", value:{}}}\n",
            quote(email)
        ));
    }
    if let Some(phone) = &contact.phone {
        extras.push_str(&format!(
            "    make new phone at end of phones of p with properties {{label:\"mobile\", value:{}}}\n",
            quote(phone)
        ));
    }

    let body = format!(
        r#"tell application "Contacts"
    set p to make new person with properties {{{props}}}
{extras}    save
    return id of p
end tell"#
    );
    tracing::info!(first = %contact.first, "creating contact");
    let output = runner.run(&body)?;
    Ok(output.trim().to_string())
}

pub fn groups(runner: &dyn ScriptRunner) -> Result<Vec<String>> {
    fetch_names(
        runner,
        r#"tell application "Contacts"
    set out to ""
    repeat with g in groups
        set out to out & my clean(name of g) & linefeed
    end repeat
    return out
end tell"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing::MockRunner;

    #[test]
    fn search_decodes_nested_lists() {
        let runner = MockRunner::replying(&[
            "p2|zed Z||z@z.org;|+1 555;+1 556;|\np1|Ada Lovelace|Engines|ada@x.org;||met at RI\n",
        ]);
        let people = search(&runner, "a").unwrap();
        assert_eq!(people[0].name, "Ada Lovelace");
        assert_eq!(people[0].note, "met at RI");
        assert!(people[0].phones.is_empty());
        assert_eq!(people[1].phones, vec!["+1 555", "+1 556"]);
        assert!(runner.last_script().contains("my cleanItem(value of x)"));
    }

    #[test]
    fn show_missing_contact() {
        let runner = MockRunner::replying(&["NOT_FOUND"]);
        assert!(matches!(show(&runner, "Nobody"), Err(PimError::NotFound(_))));
    }

    #[test]
    fn show_prefers_exact_match() {
        let runner = MockRunner::replying(&["p1|Ada||||"]);
        assert_eq!(show(&runner, "Ada").unwrap().name, "Ada");
        let script = runner.last_script();
        assert!(script.contains("every person whose name is \"Ada\""));
        assert!(script.contains("every person whose name contains \"Ada\""));
    }

    #[test]
    fn add_builds_properties() {
        let runner = MockRunner::replying(&["ABC:ABPerson"]);
        let contact = NewContact {
            first: "Grace".to_string(),
            last: Some("Hopper".to_string()),
            email: Some("grace@navy.mil".to_string()),
            phone: None,
            organization: None,
        };
        assert_eq!(add(&runner, &contact).unwrap(), "ABC:ABPerson");
        let script = runner.last_script();
        assert!(script.contains("{first name:\"Grace\", last name:\"Hopper\"}"));
        assert!(script.contains("value:\"grace@navy.mil\""));
        assert!(!script.contains("make new phone"));
        assert!(script.contains("    save\n"));
    }

    #[test]
    fn add_rejects_bad_email() {
        let runner = MockRunner::default();
        let contact = NewContact {
            first: "X".to_string(),
            email: Some("nope".to_string()),
            ..NewContact::default()
        };
        assert!(matches!(add(&runner, &contact), Err(PimError::InvalidArgument(_))));
    }
}
