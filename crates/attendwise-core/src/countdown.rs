use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

pub type CompletionHandler = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountdownState {
    Running { seconds_remaining: u64 },
    Completed,
}

/// Remaining time split with fixed 24h/60m/60s units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Breakdown {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / SECS_PER_DAY,
            hours: total % SECS_PER_DAY / SECS_PER_HOUR,
            minutes: total % SECS_PER_HOUR / SECS_PER_MINUTE,
            seconds: total % SECS_PER_MINUTE,
        }
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Countdown state machine: `Running(n)` steps down by one per tick and
/// becomes `Completed` in place of `Running(0)`. The completion handler is
/// consumed the first time the machine completes, so it runs at most once.
pub struct Countdown {
    state: CountdownState,
    on_complete: Option<CompletionHandler>,
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("state", &self.state)
            .field("handler_pending", &self.on_complete.is_some())
            .finish()
    }
}

impl Countdown {
    /// Start counting from `now` towards `target`. A target that is not in
    /// the future completes immediately, running `on_complete` before this
    /// returns.
    pub fn start<F>(target: DateTime<Utc>, now: DateTime<Utc>, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut countdown = Self {
            state: CountdownState::Completed,
            on_complete: Some(Box::new(on_complete)),
        };
        match u64::try_from((target - now).num_seconds()) {
            Ok(seconds) if seconds > 0 => {
                countdown.state = CountdownState::Running {
                    seconds_remaining: seconds,
                };
            }
            _ => countdown.complete(),
        }
        countdown
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == CountdownState::Completed
    }

    /// The display value while running; `None` once completed.
    pub fn remaining(&self) -> Option<Breakdown> {
        match self.state {
            CountdownState::Running { seconds_remaining } => {
                Some(Breakdown::from_seconds(seconds_remaining))
            }
            CountdownState::Completed => None,
        }
    }

    /// Advance by one second. No-op once completed.
    pub fn tick(&mut self) -> CountdownState {
        if let CountdownState::Running { seconds_remaining } = self.state {
            if seconds_remaining <= 1 {
                self.complete();
            } else {
                self.state = CountdownState::Running {
                    seconds_remaining: seconds_remaining - 1,
                };
            }
        }
        self.state
    }

    fn complete(&mut self) {
        self.state = CountdownState::Completed;
        if let Some(handler) = self.on_complete.take() {
            handler();
        }
    }
}

/// A [`Countdown`] driven by a one-second tokio interval.
///
/// Cancelling (or dropping the timer) stops the next tick; a cancelled timer
/// never completes and never catches up. Timers are not restartable.
pub struct CountdownTimer {
    state: watch::Receiver<CountdownState>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Must be called from within a tokio runtime unless `target` has passed.
    pub fn spawn<F>(target: DateTime<Utc>, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn_at(target, Utc::now(), on_complete)
    }

    pub fn spawn_at<F>(target: DateTime<Utc>, now: DateTime<Utc>, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let countdown = Countdown::start(target, now, on_complete);
        let (tx, rx) = watch::channel(countdown.state());
        if countdown.is_completed() {
            tracing::debug!(%target, "countdown target already reached");
            return Self {
                state: rx,
                task: None,
            };
        }

        tracing::debug!(%target, state = ?countdown.state(), "countdown started");
        let task = tokio::spawn(drive(countdown, tx));
        Self {
            state: rx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> CountdownState {
        *self.state.borrow()
    }

    pub fn remaining(&self) -> Option<Breakdown> {
        match self.state() {
            CountdownState::Running { seconds_remaining } => {
                Some(Breakdown::from_seconds(seconds_remaining))
            }
            CountdownState::Completed => None,
        }
    }

    /// Receiver that observes every state the timer publishes.
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.clone()
    }

    /// Stop the countdown. Returns whether a running countdown was stopped.
    pub fn cancel(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        let running = !task.is_finished();
        if running {
            tracing::debug!(state = ?self.state(), "countdown cancelled");
        }
        task.abort();
        running
    }

    /// Let the task run on untracked; dropping the timer afterwards is a no-op.
    fn detach(&mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(mut countdown: Countdown, tx: watch::Sender<CountdownState>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let state = countdown.tick();
        let _ = tx.send(state);
        if state == CountdownState::Completed {
            tracing::debug!("countdown completed");
            break;
        }
    }
}

struct Entry {
    generation: u64,
    timer: CountdownTimer,
}

/// Keeps at most one live countdown per target key (e.g. an event or
/// session id). Starting a countdown for a key that already has one cancels
/// the previous timer first; completed timers remove themselves.
pub struct CountdownRegistry {
    timers: Arc<DashMap<String, Entry>>,
    next_generation: AtomicU64,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn start<F>(
        &self,
        key: impl Into<String>,
        target: DateTime<Utc>,
        on_complete: F,
    ) -> watch::Receiver<CountdownState>
    where
        F: FnOnce() + Send + 'static,
    {
        self.start_at(key, target, Utc::now(), on_complete)
    }

    pub fn start_at<F>(
        &self,
        key: impl Into<String>,
        target: DateTime<Utc>,
        now: DateTime<Utc>,
        on_complete: F,
    ) -> watch::Receiver<CountdownState>
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timers = self.timers.clone();
        let cleanup_key = key.clone();
        let timer = CountdownTimer::spawn_at(target, now, move || {
            // Runs on the timer's own task, which must not abort itself.
            if let Some((_, mut entry)) =
                timers.remove_if(&cleanup_key, |_, entry| entry.generation == generation)
            {
                entry.timer.detach();
            }
            on_complete();
        });

        let receiver = timer.subscribe();
        if timer.state() != CountdownState::Completed {
            self.timers.insert(key, Entry { generation, timer });
        }
        receiver
    }

    /// Cancel the countdown for `key`. Returns whether one was live.
    pub fn cancel(&self, key: &str) -> bool {
        self.timers.remove(key).is_some()
    }

    pub fn state(&self, key: &str) -> Option<CountdownState> {
        self.timers.get(key).map(|entry| entry.timer.state())
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Default for CountdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}
