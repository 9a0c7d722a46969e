use std::path::Path;

use anyhow::{bail, Context, Result};
use attendwise_core::action::{capacity, is_event_host};
use attendwise_core::countdown::{Breakdown, CountdownState, CountdownTimer};
use attendwise_core::recurrence::{self, RecurrenceOptions, Weekdays};
use attendwise_core::window::{event_finished, TimeWindow};
use attendwise_core::{
    plan_for_event, resolve_with, select_initial_session_at, temporal, ActionContext, Clock,
    FixedClock, SystemClock,
};
use attendwise_models::{Event, EventSession, Registration, User};
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::cli::{Command, RuleCommand};
use crate::config::Config;

/// Occurrence counts beyond this are reported as the cap.
const PREVIEW_CAP: usize = 9999;

pub async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Resolve {
            event,
            user,
            registration,
            host,
            session,
            now,
        } => {
            let event: Event = read_json(&event)?;
            let user: Option<User> = user.as_deref().map(read_json).transpose()?;
            let registration: Option<Registration> =
                registration.as_deref().map(read_json).transpose()?;
            let clock = clock(now.as_deref())?;
            let viewer = Viewer {
                user: user.as_ref(),
                registration: registration.as_ref(),
                host,
            };
            print_json(&resolve_report(&event, viewer, session.as_deref(), &*clock)?)
        }
        Command::SelectSession {
            event,
            requested,
            now,
        } => {
            let event: Event = read_json(&event)?;
            let now = current_instant(now.as_deref())?;
            println!(
                "{}",
                select_initial_session_at(&event.sessions, requested.as_deref(), now)
            );
            Ok(())
        }
        Command::Window {
            event,
            session,
            now,
        } => {
            let event: Event = read_json(&event)?;
            let now = current_instant(now.as_deref())?;
            let window = TimeWindow::relevant(&event, session_of(&event, session.as_deref())?);
            print_json(&json!({
                "timezone": config.display.timezone,
                "now": now,
                "window": window,
                "upcoming": window.is_upcoming(now),
                "ongoing": window.is_ongoing(now),
                "finished": window.has_finished(now),
                "event_finished": event_finished(&event, now),
            }))
        }
        Command::Rule { command } => rule(command, config),
        Command::Plan {
            event,
            existing,
            now,
        } => {
            let mut event: Event = read_json(&event)?;
            if let Some(path) = existing {
                let extra: Vec<EventSession> = read_json(&path)?;
                event.sessions.extend(extra);
            }
            let now = current_instant(now.as_deref())?;
            let planned = plan_for_event(
                &event,
                now,
                config.schedule.generation_window_days,
                config.schedule.max_occurrences,
            )?;
            let sessions: Vec<EventSession> = planned
                .into_iter()
                .map(|p| p.into_session(&event.timezone))
                .collect();
            print_json(&sessions)
        }
        Command::Countdown { target } => countdown(&target).await,
    }
}

fn rule(command: RuleCommand, config: &Config) -> Result<()> {
    match command {
        RuleCommand::Parse { rule, dtstart } => {
            let options = recurrence::parse(&rule);
            let canonical = dtstart
                .as_deref()
                .map(instant)
                .transpose()?
                .map(|dtstart| recurrence::serialize(&options, dtstart));
            print_json(&json!({ "options": options, "rule": canonical }))
        }
        RuleCommand::Build {
            freq,
            interval,
            byday,
            count,
            until,
            dtstart,
        } => {
            let mut options = RecurrenceOptions::default();
            options.set_frequency(freq);
            options.set_interval(interval);
            options.set_weekdays(weekdays(&byday)?);
            if let Some(count) = count {
                options.set_count(Some(count));
            }
            if let Some(until) = until.as_deref() {
                options.set_until(Some(instant(until)?));
            }
            println!("{}", recurrence::serialize(&options, instant(&dtstart)?));
            Ok(())
        }
        RuleCommand::Expand {
            rule,
            dtstart,
            from,
            days,
        } => {
            let options = recurrence::try_parse(&rule)?;
            let dtstart = instant(&dtstart)?;
            let from = from.as_deref().map(instant).transpose()?.unwrap_or(dtstart);
            let days = days.unwrap_or(config.schedule.generation_window_days);
            let to = window_end(from, days)?;
            let limit = config.schedule.max_occurrences;
            for at in recurrence::expand(&options, dtstart, from, to, limit) {
                println!("{}", at.to_rfc3339());
            }
            Ok(())
        }
        RuleCommand::Count { rule, dtstart } => {
            let options = recurrence::try_parse(&rule)?;
            println!("{}", count_summary(&options, instant(&dtstart)?));
            Ok(())
        }
    }
}

/// Who is looking at the event page.
#[derive(Debug, Clone, Copy, Default)]
struct Viewer<'a> {
    user: Option<&'a User>,
    registration: Option<&'a Registration>,
    /// Forces host treatment; the event's creator is a host regardless.
    host: bool,
}

fn resolve_report(
    event: &Event,
    viewer: Viewer<'_>,
    session: Option<&str>,
    clock: &dyn Clock,
) -> Result<serde_json::Value> {
    let ctx = ActionContext::new(event)
        .user(viewer.user)
        .host(viewer.host || is_event_host(event, viewer.user))
        .registration(viewer.registration)
        .session(session_of(event, session)?);
    let state = resolve_with(&ctx, clock);
    Ok(json!({
        "state": state,
        "code": state.code(),
        "label": state.label(),
        "triggers_mutation": state.triggers_mutation(),
        "capacity": capacity(event),
    }))
}

fn window_end(from: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|window| from.checked_add_signed(window))
        .with_context(|| format!("a {days}-day window from {from} is out of range"))
}

fn count_summary(options: &RecurrenceOptions, dtstart: DateTime<Utc>) -> String {
    match recurrence::occurrence_count(options, dtstart, PREVIEW_CAP) {
        Some(count) if count >= PREVIEW_CAP => format!("{PREVIEW_CAP}+"),
        Some(count) => count.to_string(),
        None => "unbounded".to_string(),
    }
}

async fn countdown(target: &str) -> Result<()> {
    let target = instant(target)?;
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let mut timer = CountdownTimer::spawn(target, move || {
        let _ = done_tx.send(());
    });

    let mut updates = timer.subscribe();
    if let Some(remaining) = timer.remaining() {
        println!("{remaining}");
    }
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *updates.borrow_and_update();
                match state {
                    CountdownState::Running { seconds_remaining } => {
                        println!("{}", Breakdown::from_seconds(seconds_remaining));
                    }
                    CountdownState::Completed => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                timer.cancel();
                tracing::info!("countdown interrupted");
                return Ok(());
            }
        }
    }

    done_rx
        .await
        .context("countdown stopped before reaching its target")?;
    println!("{} reached", target.to_rfc3339());
    Ok(())
}

fn session_of<'a>(event: &'a Event, id: Option<&str>) -> Result<Option<&'a EventSession>> {
    match id {
        Some(id) => match event.session(id) {
            Some(session) => Ok(Some(session)),
            None => bail!("event {} has no session {id:?}", event.id),
        },
        None => Ok(None),
    }
}

fn weekdays(codes: &[String]) -> Result<Weekdays> {
    codes.iter().try_fold(Weekdays::empty(), |days, code| {
        Weekdays::from_code(code)
            .map(|day| days | day)
            .with_context(|| format!("unknown weekday code {code:?}"))
    })
}

fn clock(now: Option<&str>) -> Result<Box<dyn Clock>> {
    Ok(match now {
        Some(raw) => Box::new(FixedClock::at(instant(raw)?)),
        None => Box::new(SystemClock),
    })
}

fn current_instant(now: Option<&str>) -> Result<DateTime<Utc>> {
    clock(now)?
        .now()
        .context("could not determine the current time")
}

fn instant(raw: &str) -> Result<DateTime<Utc>> {
    Ok(temporal::require(raw)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to decode {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
