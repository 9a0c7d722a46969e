use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::CoreError;

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const LOCAL_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Normalize against the process-local zone. A `Z` or numeric offset is
/// honored as written; anything unparseable is `None`, never "now".
pub fn normalize<'a>(raw: impl Into<Option<&'a str>>) -> Option<DateTime<Utc>> {
    normalize_in(raw, &Local)
}

/// Normalize, reading zone-less strings as wall-clock time in `local`.
///
/// Ambiguous local times (a DST fold) resolve to the earlier instant; local
/// times skipped by a DST gap do not exist and yield `None`.
pub fn normalize_in<'a, Tz: TimeZone>(
    raw: impl Into<Option<&'a str>>,
    local: &Tz,
) -> Option<DateTime<Utc>> {
    let raw = raw.into()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some((body, offset)) = split_offset(raw) {
        let naive = parse_naive(body)?;
        return offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc));
    }

    let naive = parse_naive(raw)?;
    local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strict form of [`normalize`] for inputs that must be present and valid.
pub fn require(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    normalize(raw).ok_or_else(|| CoreError::InvalidTimestamp(raw.to_string()))
}

/// Render `instant` as a zone-less wall-clock string in `tz`.
pub fn to_local_string<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant
        .with_timezone(tz)
        .naive_local()
        .format(LOCAL_LAYOUT)
        .to_string()
}

fn parse_naive(body: &str) -> Option<NaiveDateTime> {
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(body, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(body, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Split a trailing zone designator off `raw`.
fn split_offset(raw: &str) -> Option<(&str, FixedOffset)> {
    if let Some(body) = raw.strip_suffix(['Z', 'z']) {
        return Some((body, FixedOffset::east_opt(0)?));
    }

    // An offset can only follow the time of day, never the date's own dashes.
    let idx = raw.rfind(['+', '-'])?;
    let (body, suffix) = raw.split_at(idx);
    if !body.contains(['T', 't', ' ']) {
        return None;
    }

    let sign = if suffix.starts_with('-') { -1 } else { 1 };
    let digits: String = suffix[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((body, offset))
}
