//! Decoding the line-oriented text records that scripts print.

use crate::error::{PimError, Result};
use chrono::NaiveDateTime;

pub const FIELD_SEP: char = '|';
pub const ITEM_SEP: char = ';';
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Split script output into records of exactly `fields` fields.
/// Surplus separators end up in the last field.
pub fn decode(output: &str, fields: usize) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(decode_line(line, fields)?);
    }
    Ok(records)
}

pub fn decode_line(line: &str, fields: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = line
        .splitn(fields, FIELD_SEP)
        .map(|p| p.trim().to_string())
        .collect();
    if parts.len() < fields {
        return Err(PimError::Parse(format!(
            "expected {} fields, got {}: {}",
            fields,
            parts.len(),
            line
        )));
    }
    Ok(parts)
}

/// Split output into its first line and everything after it.
pub fn split_header(output: &str) -> (&str, &str) {
    match output.split_once('\n') {
        Some((header, body)) => (header.trim_end_matches('\r'), body),
        None => (output, ""),
    }
}

pub fn split_list(field: &str) -> Vec<String> {
    field
        .split(ITEM_SEP)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_bool(field: &str) -> Result<bool> {
    match field.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(PimError::Parse(format!("expected true/false, got {:?}", other))),
    }
}

pub fn parse_timestamp(field: &str) -> Result<Option<NaiveDateTime>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT)
        .map(Some)
        .map_err(|e| PimError::Parse(format!("bad timestamp {:?}: {}", field, e)))
}

pub fn parse_int(field: &str) -> Result<i64> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(0);
    }
    field
        .parse()
        .map_err(|_| PimError::Parse(format!("expected a number, got {:?}", field)))
}

/// Plain names, one per line.
pub fn decode_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
