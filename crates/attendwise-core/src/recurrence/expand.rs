use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc, Weekday,
};

use super::{Frequency, RecurrenceOptions};

/// Occurrences of `options` anchored at `dtstart` that fall within
/// `[from, to]`, earliest first, at most `limit` of them.
///
/// All arithmetic is in UTC. `dtstart` itself is an occurrence only when it
/// matches the rule; `COUNT` counts from `dtstart`, `UNTIL` is inclusive.
pub fn expand(
    options: &RecurrenceOptions,
    dtstart: DateTime<Utc>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: usize,
) -> Vec<DateTime<Utc>> {
    let mut occurrences = Vec::new();
    let Some(frequency) = options.frequency() else {
        return occurrences;
    };
    if limit == 0 || from > to {
        return occurrences;
    }

    let schedule = Schedule::new(options, frequency, dtstart);
    let count = options.count().map(u64::from);
    let until = options.until();
    let last = until.map_or(to, |until| until.min(to));

    // Skipping ahead is only sound when nothing before `from` has to be counted.
    let mut period = if count.is_none() {
        schedule.period_near(from)
    } else {
        0
    };
    let mut produced: u64 = 0;

    while let Some((anchor, candidates)) = schedule.period(period) {
        if anchor > last {
            break;
        }
        for at in candidates {
            if at < dtstart {
                continue;
            }
            if at > last {
                return occurrences;
            }
            produced += 1;
            if count.is_some_and(|count| produced > count) {
                return occurrences;
            }
            if at >= from {
                occurrences.push(at);
                if occurrences.len() >= limit {
                    return occurrences;
                }
            }
        }
        period += 1;
    }
    occurrences
}

/// Number of occurrences of a bounded rule, capped at `limit`. `None` for a
/// rule without `COUNT` or `UNTIL`, or without a frequency.
pub fn occurrence_count(
    options: &RecurrenceOptions,
    dtstart: DateTime<Utc>,
    limit: usize,
) -> Option<usize> {
    options.frequency()?;
    options.end()?;
    let to = options.until().unwrap_or(DateTime::<Utc>::MAX_UTC);
    Some(expand(options, dtstart, dtstart, to, limit).len())
}

struct Schedule {
    frequency: Frequency,
    interval: u32,
    start: NaiveDateTime,
    days: Vec<Weekday>,
}

impl Schedule {
    fn new(options: &RecurrenceOptions, frequency: Frequency, dtstart: DateTime<Utc>) -> Self {
        let start = dtstart.naive_utc();
        let mut days: Vec<Weekday> = options.by_weekday().days().collect();
        if days.is_empty() {
            days.push(start.weekday());
        }
        Self {
            frequency,
            interval: options.interval().max(1),
            start,
            days,
        }
    }

    /// Length of one base period for fixed-length frequencies.
    fn unit_seconds(&self) -> Option<i64> {
        match self.frequency {
            Frequency::Secondly => Some(1),
            Frequency::Minutely => Some(60),
            Frequency::Hourly => Some(3_600),
            Frequency::Daily => Some(86_400),
            Frequency::Weekly | Frequency::Monthly | Frequency::Yearly => None,
        }
    }

    fn step_seconds(&self) -> Option<i64> {
        Some(self.unit_seconds()? * i64::from(self.interval))
    }

    fn week_start(&self) -> NaiveDate {
        let date = self.start.date();
        date - Days::new(u64::from(date.weekday().num_days_from_monday()))
    }

    fn month_start(&self) -> Option<NaiveDate> {
        self.start.date().with_day(1)
    }

    /// Start of the `index`th period and its candidate instants, ascending.
    /// `None` once the calendar overflows.
    fn period(&self, index: u64) -> Option<(DateTime<Utc>, Vec<DateTime<Utc>>)> {
        let interval = u64::from(self.interval);
        if let Some(step) = self.step_seconds() {
            let offset = i64::try_from(index).ok()?.checked_mul(step)?;
            let at = self.start.checked_add_signed(TimeDelta::try_seconds(offset)?)?;
            return Some((at.and_utc(), vec![at.and_utc()]));
        }

        let time = self.start.time();
        match self.frequency {
            Frequency::Weekly => {
                let week = self
                    .week_start()
                    .checked_add_days(Days::new(index.checked_mul(7 * interval)?))?;
                let candidates = self
                    .days
                    .iter()
                    .filter_map(|day| {
                        week.checked_add_days(Days::new(u64::from(day.num_days_from_monday())))
                    })
                    .map(|date| date.and_time(time).and_utc())
                    .collect();
                Some((week.and_time(NaiveTime::MIN).and_utc(), candidates))
            }
            Frequency::Monthly => {
                let months = u32::try_from(index.checked_mul(interval)?).ok()?;
                let month = self.month_start()?.checked_add_months(Months::new(months))?;
                let candidates = month
                    .with_day(self.start.day())
                    .map(|date| date.and_time(time).and_utc())
                    .into_iter()
                    .collect();
                Some((month.and_time(NaiveTime::MIN).and_utc(), candidates))
            }
            Frequency::Yearly => {
                let months = u32::try_from(index.checked_mul(interval)?.checked_mul(12)?).ok()?;
                let year = self.month_start()?.checked_add_months(Months::new(months))?;
                let candidates =
                    NaiveDate::from_ymd_opt(year.year(), self.start.month(), self.start.day())
                        .map(|date| date.and_time(time).and_utc())
                        .into_iter()
                        .collect();
                let anchor = year.with_month(1)?.and_time(NaiveTime::MIN).and_utc();
                Some((anchor, candidates))
            }
            _ => None,
        }
    }

    /// A period index at or shortly before the one containing `from`.
    fn period_near(&self, from: DateTime<Utc>) -> u64 {
        let from = from.naive_utc();
        if from <= self.start {
            return 0;
        }
        let elapsed = match self.frequency {
            Frequency::Weekly => (from.date() - self.week_start()).num_days() / 7,
            Frequency::Monthly => months_between(self.start.date(), from.date()),
            Frequency::Yearly => i64::from(from.year() - self.start.year()),
            _ => match self.unit_seconds() {
                Some(unit) => (from - self.start).num_seconds() / unit,
                None => 0,
            },
        };
        let periods = elapsed / i64::from(self.interval);
        u64::try_from(periods.saturating_sub(1)).unwrap_or(0)
    }
}

fn months_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    i64::from(later.year() - earlier.year()) * 12 + i64::from(later.month())
        - i64::from(earlier.month())
}
