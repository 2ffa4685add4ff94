use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::scoring::SessionStats;

/// Source of wall-clock time for a session.
pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Hand-driven clock for tests and replays. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: SystemTime,
    offset_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target text must not be empty")]
    EmptyText,
    #[error("duration must be at least one second")]
    ZeroDuration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub target_text: String,
    pub duration_secs: u32,
    pub allow_backspace: bool,
    pub highlight: bool,
}

impl SessionConfig {
    pub fn new(target_text: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            target_text: target_text.into(),
            duration_secs,
            allow_backspace: true,
            highlight: true,
        }
    }

    pub fn allow_backspace(mut self, allow: bool) -> Self {
        self.allow_backspace = allow;
        self
    }

    pub fn highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Active,
    Finished,
}

/// Classification of one reference character against what has been typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharState {
    Correct,
    Incorrect,
    /// the next character expected
    Current,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharStatus {
    pub ch: char,
    pub state: CharState,
}

/// Emitted exactly once when a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishReport {
    pub wpm: u32,
    pub accuracy: u32,
    pub total_chars: usize,
    pub correct_chars: usize,
    pub errors: usize,
    pub time_spent_secs: f64,
}

impl From<SessionStats> for FinishReport {
    fn from(stats: SessionStats) -> Self {
        Self {
            wpm: stats.wpm(),
            accuracy: stats.accuracy_pct(),
            total_chars: stats.total_chars,
            correct_chars: stats.correct_chars,
            errors: stats.errors,
            time_spent_secs: stats.elapsed_secs,
        }
    }
}

impl fmt::Display for FinishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wpm   {}% acc   {} errors   {:.1}s",
            self.wpm, self.accuracy, self.errors, self.time_spent_secs
        )
    }
}

/// One timed attempt at typing a fixed text.
#[derive(Debug)]
pub struct Session<C: Clock = SystemClock> {
    target: Vec<char>,
    duration_secs: u32,
    allow_backspace: bool,
    highlight: bool,
    input: Vec<char>,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    seconds_remaining: u32,
    phase: Phase,
    epoch: u64,
    report: Option<FinishReport>,
    clock: C,
}

impl Session<SystemClock> {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(config: SessionConfig, clock: C) -> Result<Self, ConfigError> {
        if config.target_text.is_empty() {
            return Err(ConfigError::EmptyText);
        }
        if config.duration_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        Ok(Self {
            target: config.target_text.chars().collect(),
            duration_secs: config.duration_secs,
            allow_backspace: config.allow_backspace,
            highlight: config.highlight,
            input: Vec::new(),
            started_at: None,
            finished_at: None,
            seconds_remaining: config.duration_secs,
            phase: Phase::Idle,
            epoch: 0,
            report: None,
            clock,
        })
    }

    /// Replaces the typed text with `value`.
    ///
    /// Returns the finish report on the call that completes the text. Input
    /// after finishing, and shrinking or rewriting edits while backspace is
    /// disallowed, are dropped without touching state.
    pub fn submit_input(&mut self, value: &str) -> Option<FinishReport> {
        if self.phase == Phase::Finished {
            return None;
        }

        let mut next: Vec<char> = value.chars().collect();
        if !self.allow_backspace && !next.starts_with(&self.input) {
            debug!(
                from = self.input.len(),
                to = next.len(),
                "rejected edit, backspace disallowed"
            );
            return None;
        }
        next.truncate(self.target.len());

        if self.phase == Phase::Idle {
            if next.is_empty() {
                return None;
            }
            self.started_at = Some(self.clock.now());
            self.phase = Phase::Active;
            debug!(epoch = self.epoch, "session active");
        }

        self.input = next;

        if self.input.len() >= self.target.len() {
            return Some(self.finish());
        }
        None
    }

    /// Appends one keystroke.
    pub fn type_char(&mut self, c: char) -> Option<FinishReport> {
        let mut value: String = self.input.iter().collect();
        value.push(c);
        self.submit_input(&value)
    }

    /// Removes the last typed character, if the session allows it.
    pub fn backspace(&mut self) {
        if self.input.is_empty() {
            return;
        }
        let value: String = self.input[..self.input.len() - 1].iter().collect();
        self.submit_input(&value);
    }

    /// One second of countdown. Only an active session counts down.
    pub fn tick(&mut self) -> Option<FinishReport> {
        if self.phase != Phase::Active {
            return None;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            return Some(self.finish());
        }
        None
    }

    fn finish(&mut self) -> FinishReport {
        self.finished_at = Some(self.stop_time());
        self.phase = Phase::Finished;

        let report = FinishReport::from(self.current_stats());
        self.report = Some(report);
        info!(
            wpm = report.wpm,
            accuracy = report.accuracy,
            errors = report.errors,
            seconds_remaining = self.seconds_remaining,
            "session finished"
        );
        report
    }

    pub fn current_stats(&self) -> SessionStats {
        let stop = match self.phase {
            Phase::Idle => return SessionStats::baseline(),
            Phase::Active => self.stop_time(),
            Phase::Finished => self.finished_at.unwrap_or_else(|| self.stop_time()),
        };
        let elapsed = self
            .started_at
            .map(|start| stop.duration_since(start).unwrap_or_default());

        SessionStats::compute(&self.input, &self.target, elapsed)
    }

    /// When the countdown runs out, measured from the first keystroke.
    pub fn deadline(&self) -> Option<SystemTime> {
        self.started_at
            .map(|start| start + Duration::from_secs(self.duration_secs.into()))
    }

    // now, but never past the deadline: a late tick must not stretch the attempt
    fn stop_time(&self) -> SystemTime {
        let now = self.clock.now();
        match self.deadline() {
            Some(deadline) => now.min(deadline),
            None => now,
        }
    }

    /// Back to a fresh, idle attempt over the same text and rules.
    pub fn reset(&mut self) {
        self.input.clear();
        self.started_at = None;
        self.finished_at = None;
        self.seconds_remaining = self.duration_secs;
        self.phase = Phase::Idle;
        self.report = None;
        self.epoch += 1;
        debug!(epoch = self.epoch, "session reset");
    }

    pub fn char_state(&self, idx: usize) -> CharState {
        match self.input.get(idx) {
            Some(typed) if self.target.get(idx) == Some(typed) => CharState::Correct,
            Some(_) => CharState::Incorrect,
            None if idx == self.input.len() => CharState::Current,
            None => CharState::Pending,
        }
    }

    pub fn char_statuses(&self) -> Vec<CharStatus> {
        self.target
            .iter()
            .enumerate()
            .map(|(idx, &ch)| CharStatus {
                ch,
                state: self.char_state(idx),
            })
            .collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub fn allow_backspace(&self) -> bool {
        self.allow_backspace
    }

    /// The report emitted when this attempt finished.
    pub fn report(&self) -> Option<&FinishReport> {
        self.report.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
