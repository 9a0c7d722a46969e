use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{Frequency, RecurrenceOptions, Weekdays};
use crate::error::CoreError;

const BASIC_UTC: &str = "%Y%m%dT%H%M%SZ";

/// Property lines that may share a rule set with the `RRULE` line.
const SET_PROPERTIES: &[&str] = &["DTSTART", "EXRULE", "RDATE", "EXDATE"];

/// Decode a stored rule. Empty or malformed input yields default options.
pub fn parse(rule: &str) -> RecurrenceOptions {
    match try_parse(rule) {
        Ok(options) => options,
        Err(err) => {
            tracing::warn!(rule, error = %err, "discarding unreadable recurrence rule");
            RecurrenceOptions::default()
        }
    }
}

/// Strict decode. Accepts a bare `FREQ=...` value, an `RRULE:` line, or a
/// multi-line rule set, of which only the first `RRULE` is read.
pub fn try_parse(rule: &str) -> Result<RecurrenceOptions, CoreError> {
    if rule.trim().is_empty() {
        return Ok(RecurrenceOptions::default());
    }
    let body = first_rule(rule)
        .ok_or_else(|| CoreError::InvalidRule("no RRULE line in rule set".into()))?;
    parse_body(body)
}

/// Canonical rule string: a `DTSTART` line followed by the `RRULE` line, or
/// the empty string when no frequency is set.
pub fn serialize(options: &RecurrenceOptions, dtstart: DateTime<Utc>) -> String {
    let line = rule_line(options);
    if line.is_empty() {
        return line;
    }
    format!("DTSTART:{}\nRRULE:{line}", dtstart.format(BASIC_UTC))
}

/// Only the `FREQ=...` value, as persisted on the event record.
pub fn rule_line(options: &RecurrenceOptions) -> String {
    let Some(frequency) = options.frequency() else {
        return String::new();
    };

    let mut parts = vec![
        format!("FREQ={frequency}"),
        format!("INTERVAL={}", options.interval().max(1)),
    ];
    if let Some(count) = options.count() {
        parts.push(format!("COUNT={count}"));
    } else if let Some(until) = options.until() {
        parts.push(format!("UNTIL={}", until.format(BASIC_UTC)));
    }
    if frequency == Frequency::Weekly && !options.by_weekday().is_empty() {
        let days: Vec<&str> = options.by_weekday().codes().collect();
        parts.push(format!("BYDAY={}", days.join(",")));
    }
    parts.join(";")
}

fn first_rule(rule: &str) -> Option<&str> {
    for line in rule.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(value) = property_value(line, "RRULE") {
            return Some(value);
        }
        if SET_PROPERTIES
            .iter()
            .any(|name| property_value(line, name).is_some())
        {
            continue;
        }
        return Some(line);
    }
    None
}

/// The value of `line` if it is the property `name`, with or without
/// parameters (`DTSTART;TZID=...:...`).
fn property_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let head = line.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    match line[name.len()..].chars().next()? {
        ':' => Some(&line[name.len() + 1..]),
        ';' => line.split_once(':').map(|(_, value)| value),
        _ => None,
    }
}

fn parse_body(body: &str) -> Result<RecurrenceOptions, CoreError> {
    let mut frequency = None;
    let mut interval = 1;
    let mut count = None;
    let mut until = None;
    let mut weekdays = Weekdays::empty();

    for part in body.split(';').map(str::trim).filter(|part| !part.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidRule(format!("malformed part {part:?}")))?;
        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => frequency = Some(value.parse::<Frequency>()?),
            "INTERVAL" => interval = parse_number(key, value)?,
            "COUNT" => count = Some(parse_number(key, value)?),
            "UNTIL" => until = Some(parse_until(value)?),
            "BYDAY" => {
                for code in value.split(',').filter(|code| !code.trim().is_empty()) {
                    weekdays |= Weekdays::from_code(code).ok_or_else(|| {
                        CoreError::InvalidRule(format!("unsupported BYDAY value {code:?}"))
                    })?;
                }
            }
            "WKST" => {
                Weekdays::from_code(value).ok_or_else(|| {
                    CoreError::InvalidRule(format!("unknown WKST value {value:?}"))
                })?;
            }
            _ => {}
        }
    }

    let frequency = frequency.ok_or_else(|| CoreError::InvalidRule("missing FREQ".into()))?;
    if count.is_some() && until.is_some() {
        return Err(CoreError::InvalidRule(
            "COUNT and UNTIL are mutually exclusive".into(),
        ));
    }

    let mut options = RecurrenceOptions::new(frequency);
    options.set_interval(interval);
    if frequency == Frequency::Weekly {
        options.set_weekdays(weekdays);
    }
    if let Some(count) = count {
        options.set_count(Some(count));
    }
    if let Some(until) = until {
        options.set_until(Some(until));
    }
    Ok(options)
}

fn parse_number(key: &str, value: &str) -> Result<u32, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidRule(format!("{key} is not a number: {value:?}")))
}

/// `UNTIL` as a UTC basic timestamp, a floating timestamp (read as UTC), or a
/// bare date (midnight UTC).
fn parse_until(value: &str) -> Result<DateTime<Utc>, CoreError> {
    let value = value.trim();
    let body = value.strip_suffix(['Z', 'z']).unwrap_or(value);
    NaiveDateTime::parse_from_str(body, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(body, "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CoreError::InvalidRule(format!("unreadable UNTIL value {value:?}")))
}
