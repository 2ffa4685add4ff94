use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::exam::ExamKind;
use crate::runtime::Countdown;
use crate::session::{Clock, ConfigError, FinishReport, Phase, Session, SessionConfig, SystemClock};
use crate::texts::{Level, Lessons, Passages, TextPicker};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Typing,
    Results,
}

/// What kind of attempt is running; decides where the next text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Test { duration_secs: u32 },
    Exam(ExamKind),
    Lesson { level: Level, number: usize },
    Custom,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Test { duration_secs } => write!(f, "test-{duration_secs}s"),
            Mode::Exam(kind) => write!(f, "exam:{kind}"),
            Mode::Lesson { level, number } => write!(f, "lesson:{level}/{number}"),
            Mode::Custom => write!(f, "custom"),
        }
    }
}

/// What the key loop should do after a key was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    None,
    Quit,
    Save,
    Share,
}

#[derive(Debug)]
pub struct App<C: Clock + Clone = SystemClock> {
    pub session: Session<C>,
    pub countdown: Option<Countdown>,
    pub state: AppState,
    pub mode: Mode,
    pub last_report: Option<FinishReport>,
    /// Outcome of the last save request, for the result screen.
    pub saved: Option<bool>,
    pub logged_in: bool,
    base_config: SessionConfig,
    passages: Passages,
    lessons: Lessons,
    picker: TextPicker,
}

impl App<SystemClock> {
    pub fn new(mode: Mode, config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(mode, config, SystemClock)
    }
}

impl<C: Clock + Clone> App<C> {
    pub fn with_clock(mode: Mode, config: SessionConfig, clock: C) -> Result<Self, ConfigError> {
        let session = Session::with_clock(config.clone(), clock)?;
        Ok(Self {
            session,
            countdown: None,
            state: AppState::Typing,
            mode,
            last_report: None,
            saved: None,
            logged_in: false,
            base_config: config,
            passages: Passages::load(),
            lessons: Lessons::load(),
            picker: TextPicker::new(),
        })
    }

    pub fn on_char(&mut self, c: char) {
        // a key that lands after the deadline belongs to no attempt
        self.on_tick();
        if self.state != AppState::Typing {
            return;
        }
        let report = self.session.type_char(c);
        self.arm_countdown();
        if let Some(report) = report {
            self.on_finish(report);
        }
    }

    pub fn on_backspace(&mut self) {
        self.on_tick();
        if self.state == AppState::Typing {
            self.session.backspace();
        }
    }

    pub fn on_tick(&mut self) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        if let Some(report) = countdown.poll(&mut self.session) {
            self.on_finish(report);
        }
        if self.session.phase() != Phase::Active {
            self.countdown = None;
        }
    }

    /// How long the key loop may wait before the countdown needs a poll.
    pub fn next_tick_in(&self) -> Option<Duration> {
        self.countdown.map(|c| c.due_in(&self.session))
    }

    fn arm_countdown(&mut self) {
        let stale = self
            .countdown
            .is_some_and(|c| !c.is_current(&self.session));
        if self.countdown.is_none() || stale {
            self.countdown = Countdown::arm(&self.session);
        }
    }

    fn on_finish(&mut self, report: FinishReport) {
        info!(mode = %self.mode, %report, "attempt finished");
        self.countdown = None;
        self.last_report = Some(report);
        self.saved = None;
        self.state = AppState::Results;
    }

    /// Same text, fresh attempt.
    pub fn restart(&mut self) {
        self.session.reset();
        self.countdown = None;
        self.last_report = None;
        self.saved = None;
        self.state = AppState::Typing;
    }

    /// A new text where the mode has one to offer; otherwise a restart.
    pub fn next_text(&mut self) {
        let text = match self.mode.clone() {
            Mode::Test { duration_secs } => self
                .picker
                .pick_for_duration(&self.passages, duration_secs),
            Mode::Exam(kind) => self
                .picker
                .pick_for_duration(&self.passages, kind.preset().duration_secs),
            Mode::Lesson { level, number } => {
                let next = if number < self.lessons.for_level(level).len() {
                    number + 1
                } else {
                    1
                };
                let text = self.lessons.get(level, next).map(|l| l.text.clone());
                self.mode = Mode::Lesson {
                    level,
                    number: next,
                };
                text
            }
            Mode::Custom => None,
        };

        match text {
            Some(text) => {
                let config = SessionConfig {
                    target_text: text,
                    ..self.base_config.clone()
                };
                let clock = self.session.clock().clone();
                match Session::with_clock(config, clock) {
                    Ok(session) => {
                        debug!(mode = %self.mode, "new text");
                        self.session = session;
                        self.countdown = None;
                        self.last_report = None;
                        self.saved = None;
                        self.state = AppState::Typing;
                    }
                    Err(_) => self.restart(),
                }
            }
            None => self.restart(),
        }
    }

    /// Applies one key press. Esc and Ctrl-C quit from every screen.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return AppAction::Quit;
        }

        match (self.state, key.code) {
            (_, KeyCode::Left) => self.restart(),
            (_, KeyCode::Right) => self.next_text(),
            (AppState::Typing, KeyCode::Backspace) => self.on_backspace(),
            (AppState::Typing, KeyCode::Enter) => self.on_char('\n'),
            (AppState::Typing, KeyCode::Char(c)) => self.on_char(c),
            (AppState::Results, KeyCode::Char('r')) => self.restart(),
            (AppState::Results, KeyCode::Char('n')) => self.next_text(),
            (AppState::Results, KeyCode::Char('s')) => return AppAction::Save,
            (AppState::Results, KeyCode::Char('t')) => return AppAction::Share,
            _ => {}
        }
        AppAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ManualClock;
    use assert_matches::assert_matches;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(text: &str, secs: u32) -> (App<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let app = App::with_clock(
            Mode::Test {
                duration_secs: secs,
            },
            SessionConfig::new(text, secs),
            clock.clone(),
        )
        .unwrap();
        (app, clock)
    }

    #[test]
    fn test_typing_to_results() {
        let (mut app, _) = app("hi", 60);

        app.handle_key(key(KeyCode::Char('h')));
        assert!(app.countdown.is_some());
        app.handle_key(key(KeyCode::Char('i')));

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.last_report.map(|r| r.correct_chars), Some(2));
        assert!(app.countdown.is_none());
    }

    #[test]
    fn test_timeout_to_results() {
        let (mut app, clock) = app("a long text nobody finishes", 3);

        app.on_char('a');
        clock.advance(Duration::from_secs(2));
        app.on_tick();
        assert_eq!(app.state, AppState::Typing);
        assert_eq!(app.session.seconds_remaining(), 1);

        clock.advance(Duration::from_secs(1));
        app.on_tick();
        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.last_report.map(|r| r.total_chars), Some(1));
    }

    #[test]
    fn test_keys_after_deadline_are_dropped() {
        let (mut app, clock) = app("abcdefghij", 3);

        app.on_char('a');
        clock.advance(Duration::from_millis(2900));
        app.on_char('b');
        assert_eq!(app.session.seconds_remaining(), 1);
        assert_eq!(app.next_tick_in(), Some(Duration::from_millis(100)));

        // no tick in between: the key itself must notice the expiry
        clock.advance(Duration::from_millis(500));
        app.on_char('c');

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.session.input(), &['a', 'b']);
        let report = app.last_report.unwrap();
        assert_eq!(report.total_chars, 2);
        assert_eq!(report.time_spent_secs, 3.0);
    }

    #[test]
    fn test_restart_drops_old_countdown() {
        let (mut app, clock) = app("a long text nobody finishes", 10);

        app.on_char('a');
        clock.advance(Duration::from_secs(4));
        app.handle_key(key(KeyCode::Left));
        assert!(app.countdown.is_none());

        app.on_tick();
        assert_eq!(app.session.seconds_remaining(), 10);
        assert_eq!(app.session.phase(), Phase::Idle);
    }

    #[test]
    fn test_result_keys() {
        let (mut app, _) = app("a", 60);
        app.on_char('a');

        assert_eq!(app.handle_key(key(KeyCode::Char('s'))), AppAction::Save);
        assert_eq!(app.handle_key(key(KeyCode::Char('t'))), AppAction::Share);
        assert_eq!(app.handle_key(key(KeyCode::Esc)), AppAction::Quit);

        // typing keys do nothing on the result screen
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.session.input(), &['a']);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.state, AppState::Typing);
        assert!(app.session.input().is_empty());
    }

    #[test]
    fn test_ctrl_c_quits_while_typing() {
        let (mut app, _) = app("abc", 60);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

        assert_eq!(app.handle_key(ctrl_c), AppAction::Quit);
        assert!(app.session.input().is_empty());
    }

    #[test]
    fn test_next_text_for_test_mode() {
        let (mut app, _) = app("placeholder", 60);
        let passages = Passages::load();

        app.next_text();

        let text = app.session.target_text();
        assert!(passages.one_minute.contains(&text));
        assert_eq!(app.session.duration_secs(), 60);
    }

    #[test]
    fn test_next_lesson_wraps() {
        let lessons = Lessons::load();
        let last = lessons.for_level(Level::Beginner).len();
        let mut app = App::with_clock(
            Mode::Lesson {
                level: Level::Beginner,
                number: last,
            },
            SessionConfig::new("x", 60),
            ManualClock::new(),
        )
        .unwrap();

        app.next_text();

        assert_matches!(app.mode, Mode::Lesson { number: 1, .. });
        assert_eq!(
            app.session.target_text(),
            lessons.get(Level::Beginner, 1).unwrap().text
        );
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(Mode::Test { duration_secs: 60 }.to_string(), "test-60s");
        assert_eq!(Mode::Exam(ExamKind::SscCgl).to_string(), "exam:ssc-cgl");
        assert_eq!(
            Mode::Lesson {
                level: Level::Advanced,
                number: 2
            }
            .to_string(),
            "lesson:advanced/2"
        );
    }
}
