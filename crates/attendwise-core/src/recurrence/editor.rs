use chrono::{DateTime, Utc};

use super::{parse, serialize, Frequency, RecurrenceOptions, Weekdays};

/// Holds the options behind a schedule form and the last rule string handed
/// to the caller.
///
/// Every mutator re-serializes and returns `Some(rule)` only when the rule
/// differs from the last one emitted, so a reactive caller that feeds the
/// value back in cannot loop.
#[derive(Debug, Clone)]
pub struct RecurrenceEditor {
    options: RecurrenceOptions,
    dtstart: DateTime<Utc>,
    last_emitted: String,
}

impl RecurrenceEditor {
    pub fn new(dtstart: DateTime<Utc>) -> Self {
        Self::with_options(RecurrenceOptions::default(), dtstart)
    }

    /// Start from a stored rule. Loading does not count as a change.
    pub fn load(rule: &str, dtstart: DateTime<Utc>) -> Self {
        Self::with_options(parse(rule), dtstart)
    }

    pub fn with_options(options: RecurrenceOptions, dtstart: DateTime<Utc>) -> Self {
        let last_emitted = serialize(&options, dtstart);
        Self {
            options,
            dtstart,
            last_emitted,
        }
    }

    pub fn options(&self) -> &RecurrenceOptions {
        &self.options
    }

    pub fn dtstart(&self) -> DateTime<Utc> {
        self.dtstart
    }

    /// The rule string as last emitted.
    pub fn value(&self) -> &str {
        &self.last_emitted
    }

    pub fn set_frequency(&mut self, frequency: Option<Frequency>) -> Option<String> {
        self.options.set_frequency(frequency);
        self.commit()
    }

    pub fn set_interval(&mut self, interval: u32) -> Option<String> {
        self.options.set_interval(interval);
        self.commit()
    }

    pub fn set_weekdays(&mut self, days: Weekdays) -> Option<String> {
        self.options.set_weekdays(days);
        self.commit()
    }

    pub fn set_count(&mut self, count: Option<u32>) -> Option<String> {
        self.options.set_count(count);
        self.commit()
    }

    pub fn set_until(&mut self, until: Option<DateTime<Utc>>) -> Option<String> {
        self.options.set_until(until);
        self.commit()
    }

    pub fn set_dtstart(&mut self, dtstart: DateTime<Utc>) -> Option<String> {
        self.dtstart = dtstart;
        self.commit()
    }

    fn commit(&mut self) -> Option<String> {
        let next = serialize(&self.options, self.dtstart);
        if next == self.last_emitted {
            return None;
        }
        self.last_emitted.clone_from(&next);
        Some(next)
    }
}
