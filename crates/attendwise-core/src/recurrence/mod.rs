mod codec;
mod editor;
mod expand;

pub use codec::{parse, rule_line, serialize, try_parse};
pub use editor::RecurrenceEditor;
pub use expand::{expand, occurrence_count};

use bitflags::bitflags;
use chrono::{DateTime, Timelike, Utc, Weekday};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yearly => "YEARLY",
            Self::Monthly => "MONTHLY",
            Self::Weekly => "WEEKLY",
            Self::Daily => "DAILY",
            Self::Hourly => "HOURLY",
            Self::Minutely => "MINUTELY",
            Self::Secondly => "SECONDLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEARLY" => Ok(Self::Yearly),
            "MONTHLY" => Ok(Self::Monthly),
            "WEEKLY" => Ok(Self::Weekly),
            "DAILY" => Ok(Self::Daily),
            "HOURLY" => Ok(Self::Hourly),
            "MINUTELY" => Ok(Self::Minutely),
            "SECONDLY" => Ok(Self::Secondly),
            _ => Err(CoreError::InvalidRule(format!("unknown frequency {s:?}"))),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Weekdays: u8 {
        const MO = 1 << 0;
        const TU = 1 << 1;
        const WE = 1 << 2;
        const TH = 1 << 3;
        const FR = 1 << 4;
        const SA = 1 << 5;
        const SU = 1 << 6;
    }
}

const DAY_CODES: [(Weekdays, Weekday, &str); 7] = [
    (Weekdays::MO, Weekday::Mon, "MO"),
    (Weekdays::TU, Weekday::Tue, "TU"),
    (Weekdays::WE, Weekday::Wed, "WE"),
    (Weekdays::TH, Weekday::Thu, "TH"),
    (Weekdays::FR, Weekday::Fri, "FR"),
    (Weekdays::SA, Weekday::Sat, "SA"),
    (Weekdays::SU, Weekday::Sun, "SU"),
];

impl Weekdays {
    pub fn from_weekday(day: Weekday) -> Self {
        Self::from_bits_truncate(1 << day.num_days_from_monday())
    }

    /// Parse a two-letter RFC 5545 day code (`MO`..`SU`).
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        DAY_CODES
            .iter()
            .find(|(_, _, c)| c.eq_ignore_ascii_case(code))
            .map(|(flag, _, _)| *flag)
    }

    /// Selected days, Monday first.
    pub fn days(self) -> impl Iterator<Item = Weekday> {
        DAY_CODES
            .into_iter()
            .filter(move |(flag, _, _)| self.contains(*flag))
            .map(|(_, day, _)| day)
    }

    /// Selected day codes, Monday first.
    pub fn codes(self) -> impl Iterator<Item = &'static str> {
        DAY_CODES
            .into_iter()
            .filter(move |(flag, _, _)| self.contains(*flag))
            .map(|(_, _, code)| code)
    }
}

impl Serialize for Weekdays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for code in self.codes() {
            seq.serialize_element(code)?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Count(u32),
    Until(DateTime<Utc>),
}

/// Structured recurrence configuration.
///
/// Fields are private so the invariants hold for every value: `interval` is
/// at least 1, `count` and `until` never coexist, `until` has whole-second
/// precision, and switching away from `WEEKLY` clears the weekday set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrenceOptions {
    frequency: Option<Frequency>,
    interval: u32,
    by_weekday: Weekdays,
    end: Option<RecurrenceEnd>,
}

impl Default for RecurrenceOptions {
    fn default() -> Self {
        Self {
            frequency: None,
            interval: 1,
            by_weekday: Weekdays::empty(),
            end: None,
        }
    }
}

impl RecurrenceOptions {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency: Some(frequency),
            ..Self::default()
        }
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn by_weekday(&self) -> Weekdays {
        self.by_weekday
    }

    pub fn end(&self) -> Option<RecurrenceEnd> {
        self.end
    }

    pub fn count(&self) -> Option<u32> {
        match self.end {
            Some(RecurrenceEnd::Count(count)) => Some(count),
            _ => None,
        }
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self.end {
            Some(RecurrenceEnd::Until(until)) => Some(until),
            _ => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency.is_some()
    }

    pub fn set_frequency(&mut self, frequency: Option<Frequency>) {
        if frequency != Some(Frequency::Weekly) {
            self.by_weekday = Weekdays::empty();
        }
        self.frequency = frequency;
    }

    pub fn set_interval(&mut self, interval: u32) {
        self.interval = interval.max(1);
    }

    pub fn set_weekdays(&mut self, days: Weekdays) {
        self.by_weekday = days;
    }

    pub fn set_count(&mut self, count: Option<u32>) {
        self.end = count.map(RecurrenceEnd::Count);
    }

    pub fn set_until(&mut self, until: Option<DateTime<Utc>>) {
        self.end = until.map(|at| RecurrenceEnd::Until(at.with_nanosecond(0).unwrap_or(at)));
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.set_interval(interval);
        self
    }

    pub fn with_weekdays(mut self, days: Weekdays) -> Self {
        self.set_weekdays(days);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.set_count(Some(count));
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.set_until(Some(until));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn count_and_until_clear_each_other() {
        let until = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let mut options = RecurrenceOptions::new(Frequency::Daily);

        options.set_count(Some(10));
        options.set_until(Some(until));
        assert_eq!(options.count(), None);
        assert_eq!(options.until(), Some(until));

        options.set_count(Some(3));
        assert_eq!(options.until(), None);
        assert_eq!(options.count(), Some(3));

        options.set_count(None);
        assert_eq!(options.end(), None);
    }

    #[test]
    fn interval_is_clamped_to_one() {
        let mut options = RecurrenceOptions::default();
        assert_eq!(options.interval(), 1);
        options.set_interval(0);
        assert_eq!(options.interval(), 1);
        options.set_interval(4);
        assert_eq!(options.interval(), 4);
    }

    #[test]
    fn leaving_weekly_clears_weekdays() {
        let mut options =
            RecurrenceOptions::new(Frequency::Weekly).with_weekdays(Weekdays::MO | Weekdays::FR);
        options.set_frequency(Some(Frequency::Weekly));
        assert_eq!(options.by_weekday(), Weekdays::MO | Weekdays::FR);
        options.set_frequency(Some(Frequency::Monthly));
        assert!(options.by_weekday().is_empty());
    }

    #[test]
    fn until_is_kept_to_whole_seconds() {
        let precise = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 15).unwrap()
            + chrono::Duration::milliseconds(750);
        let options = RecurrenceOptions::new(Frequency::Daily).with_until(precise);
        assert_eq!(
            options.until(),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 15).unwrap())
        );
    }

    #[test]
    fn weekday_codes_are_monday_first() {
        let days = Weekdays::SU | Weekdays::WE | Weekdays::MO;
        assert_eq!(days.codes().collect::<Vec<_>>(), ["MO", "WE", "SU"]);
        assert_eq!(
            days.days().collect::<Vec<_>>(),
            [Weekday::Mon, Weekday::Wed, Weekday::Sun]
        );
        assert_eq!(Weekdays::from_code("fr"), Some(Weekdays::FR));
        assert_eq!(Weekdays::from_code("XX"), None);
        assert_eq!(Weekdays::from_weekday(Weekday::Thu), Weekdays::TH);
        assert_eq!(serde_json::to_value(days).unwrap(), serde_json::json!(["MO", "WE", "SU"]));
    }

    #[test]
    fn frequency_names_parse_case_insensitively() {
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::Secondly.to_string(), "SECONDLY");
        assert!("FORTNIGHTLY".parse::<Frequency>().is_err());
    }
}
