use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, SystemTime};

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::debug;

use crate::session::{Clock, FinishReport, Phase, Session};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        self.step_within(None)
    }

    /// Like [`Runner::step`], but wakes no later than `due`, the time left
    /// until the running countdown's next second.
    pub fn step_within(&self, due: Option<Duration>) -> AppEvent {
        let wait = match due {
            Some(due) => due.min(self.ticker.interval()),
            None => self.ticker.interval(),
        };
        match self.event_source.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

const SECOND: Duration = Duration::from_secs(1);

/// Turns wall-clock time into one-second session ticks.
///
/// A countdown belongs to the session epoch it was armed on. Once the session
/// is reset it is stale and [`Countdown::poll`] leaves the session alone; the
/// host arms a fresh one when the new attempt becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    epoch: u64,
    next_due: SystemTime,
}

impl Countdown {
    /// Arms a countdown on an active session, anchored to its start time.
    pub fn arm<C: Clock>(session: &Session<C>) -> Option<Self> {
        if session.phase() != Phase::Active {
            return None;
        }
        let started_at = session.started_at()?;
        Some(Self {
            epoch: session.epoch(),
            next_due: started_at + SECOND,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current<C: Clock>(&self, session: &Session<C>) -> bool {
        self.epoch == session.epoch()
    }

    /// Time until the next second is due; zero when it is overdue.
    pub fn due_in<C: Clock>(&self, session: &Session<C>) -> Duration {
        self.next_due
            .duration_since(session.clock().now())
            .unwrap_or(Duration::ZERO)
    }

    /// Applies every whole second that has elapsed since the last poll.
    ///
    /// Returns the finish report if the countdown ran the session out.
    pub fn poll<C: Clock>(&mut self, session: &mut Session<C>) -> Option<FinishReport> {
        if !self.is_current(session) {
            debug!(
                countdown = self.epoch,
                session = session.epoch(),
                "ignoring stale countdown"
            );
            return None;
        }

        let now = session.clock().now();
        while session.phase() == Phase::Active && now >= self.next_due {
            self.next_due += SECOND;
            if let Some(report) = session.tick() {
                return Some(report);
            }
        }
        None
    }
}
