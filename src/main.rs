use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::KeyEventKind,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use typewise::{
    app::{App, AppAction, AppState, Mode},
    app_dirs::AppDirs,
    auth::{FileLoginFlag, SessionStateProvider},
    config::{ConfigStore, FileConfigStore},
    exam::{ExamKind, ExamPreset},
    history::ResultStore,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scoring::{accuracy_percent, WpmCalculation},
    session::{FinishReport, SessionConfig},
    texts::{Level, Lessons, Passages, TextPicker, LESSON_DURATION_SECS},
    ui::screen::{current_screen, Screen},
};
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 100;

/// touch-typing practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed typing tests, graded lessons, and government exam simulations with live WPM, accuracy, and error tracking."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// disallow corrections: backspace is ignored for the whole attempt
    #[clap(long, global = true)]
    no_backspace: bool,

    /// do not colour correct and incorrect characters while typing
    #[clap(long, global = true)]
    no_highlight: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// timed speed test on a random passage (default)
    Test {
        /// number of seconds to run the test
        #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
        secs: Option<u32>,
    },
    /// simulate an exam with its official duration and rules
    Exam {
        /// exam to simulate; defaults to the last one taken
        kind: Option<ExamKind>,
    },
    /// list the available exam simulations
    Exams,
    /// practise a lesson; lessons are numbered from 1 within each level
    Lesson {
        #[clap(value_enum)]
        level: Level,
        #[clap(default_value_t = 1)]
        number: usize,
    },
    /// type your own text
    Prompt {
        text: String,
        #[clap(short = 's', long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
        secs: u32,
    },
    /// typing calculators
    #[command(subcommand)]
    Calc(Calc),
    /// remember a name so results can be saved
    Signin { name: String },
    /// forget the signed-in name
    Signout,
    /// show saved results
    History {
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// show or change saved preferences
    Config {
        /// default test length in seconds
        #[clap(long, value_parser = clap::value_parser!(u32).range(1..))]
        secs: Option<u32>,
        /// allow corrections by default
        #[clap(long)]
        backspace: Option<bool>,
        /// colour correct and incorrect characters by default
        #[clap(long)]
        highlight: Option<bool>,
    },
    /// Hindi (KrutiDev / Mangal) practice
    Hindi,
}

#[derive(Subcommand, Debug, Clone)]
enum Calc {
    /// gross and net words per minute
    Wpm {
        /// total characters typed
        chars: u64,
        #[clap(short, long, default_value_t = 1.0)]
        minutes: f64,
        #[clap(short, long, default_value_t = 0)]
        errors: u64,
    },
    /// accuracy percentage
    Accuracy {
        /// total characters typed
        total: u64,
        #[clap(default_value_t = 0)]
        errors: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let auth = FileLoginFlag::new();

    match cli.command.clone() {
        Some(Command::Calc(calc)) => {
            run_calc(calc);
            return Ok(());
        }
        Some(Command::Exams) => {
            for preset in ExamPreset::all() {
                println!(
                    "{:<14} {:<14} {:>4} min  {}",
                    preset.kind.to_string(),
                    preset.name,
                    preset.duration_secs / 60,
                    preset.description
                );
            }
            return Ok(());
        }
        Some(Command::Signin { name }) => {
            auth.sign_in(&name)?;
            println!("Signed in as {}. Results can now be saved.", name.trim());
            return Ok(());
        }
        Some(Command::Signout) => {
            auth.sign_out()?;
            println!("Signed out.");
            return Ok(());
        }
        Some(Command::History { limit }) => {
            print_history(limit)?;
            return Ok(());
        }
        Some(Command::Config {
            secs,
            backspace,
            highlight,
        }) => {
            update_config(secs, backspace, highlight)?;
            return Ok(());
        }
        Some(Command::Hindi) => {
            println!("Hindi typing (KrutiDev 010, Mangal Remington GAIL) is coming soon.");
            return Ok(());
        }
        _ => {}
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = build_app(&cli)?;
    let store = match ResultStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "result store unavailable");
            None
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, store.as_ref(), &auth);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

/// Logs go to a file; the terminal belongs to the TUI.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("TYPEWISE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn build_app(cli: &Cli) -> Result<App, Box<dyn Error>> {
    let store = FileConfigStore::new();
    let mut config = store.load();
    let passages = Passages::load();
    let mut picker = TextPicker::new();

    let (mode, session_config) = match cli.command.clone() {
        Some(Command::Exam { kind }) => {
            let kind = kind
                .or_else(|| config.last_exam_kind())
                .ok_or("no exam given and none taken before; see `typewise exams`")?;
            let preset = kind.preset();
            let text = picker
                .pick_for_duration(&passages, preset.duration_secs)
                .ok_or("no passage for this exam")?;
            config.last_exam = Some(kind.to_string());
            (Mode::Exam(kind), preset.session_config(text))
        }
        Some(Command::Lesson { level, number }) => {
            let lesson = Lessons::load()
                .get(level, number)
                .cloned()
                .ok_or_else(|| format!("no {level} lesson number {number}"))?;
            info!(lesson = %lesson.id, "starting lesson");
            (
                Mode::Lesson { level, number },
                SessionConfig::new(lesson.text, LESSON_DURATION_SECS),
            )
        }
        Some(Command::Prompt { text, secs }) => (
            Mode::Custom,
            SessionConfig::new(text, secs)
                .allow_backspace(config.allow_backspace)
                .highlight(config.highlight),
        ),
        _ => {
            let secs = match cli.command {
                Some(Command::Test { secs: Some(secs) }) => secs,
                _ => config.duration_secs,
            };
            config.duration_secs = secs;
            let text = picker
                .pick_for_duration(&passages, secs)
                .ok_or("no passage for this duration")?;
            (
                Mode::Test {
                    duration_secs: secs,
                },
                SessionConfig::new(text, secs)
                    .allow_backspace(config.allow_backspace)
                    .highlight(config.highlight),
            )
        }
    };

    // command line flags only ever tighten the rules
    let allow_backspace = session_config.allow_backspace && !cli.no_backspace;
    let highlight = session_config.highlight && !cli.no_highlight;
    let session_config = session_config
        .allow_backspace(allow_backspace)
        .highlight(highlight);

    if let Err(e) = store.save(&config) {
        warn!(error = %e, "could not save config");
    }

    Ok(App::new(mode, session_config)?)
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: Option<&ResultStore>,
    auth: &dyn SessionStateProvider,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| current_screen(&app.state).render(app, f))?;

        let was_typing = app.state == AppState::Typing;
        let event = runner.step_within(app.next_tick_in());
        // keys arriving faster than the tick interval must not starve the countdown
        app.on_tick();
        // the key that raced the deadline must not act on the result screen
        let expired = was_typing && app.state == AppState::Results;
        match event {
            AppEvent::Tick | AppEvent::Resize => {}
            AppEvent::Key(key) if key.kind == KeyEventKind::Press && !expired => match app.handle_key(key) {
                AppAction::Quit => break,
                AppAction::Save => {
                    if app.saved != Some(true) {
                        app.saved = Some(save_result(app, store, auth));
                    }
                }
                AppAction::Share => {
                    if let Some(report) = app.last_report {
                        share(&report);
                    }
                }
                AppAction::None => {}
            },
            AppEvent::Key(_) => {}
        }

        if was_typing && app.state == AppState::Results {
            app.logged_in = auth.is_logged_in();
        }
    }

    Ok(())
}

fn update_config(
    secs: Option<u32>,
    backspace: Option<bool>,
    highlight: Option<bool>,
) -> Result<(), Box<dyn Error>> {
    let store = FileConfigStore::new();
    let mut config = store.load();
    let changed = secs.is_some() || backspace.is_some() || highlight.is_some();

    if let Some(secs) = secs {
        config.duration_secs = secs;
    }
    if let Some(backspace) = backspace {
        config.allow_backspace = backspace;
    }
    if let Some(highlight) = highlight {
        config.highlight = highlight;
    }
    if changed {
        store.save(&config)?;
        info!(?config, "preferences updated");
    }

    print!("{config}");
    Ok(())
}

fn save_result(app: &App, store: Option<&ResultStore>, auth: &dyn SessionStateProvider) -> bool {
    let (Some(store), Some(report)) = (store, app.last_report) else {
        return false;
    };
    match store.save_if_logged_in(auth, &report, &app.mode.to_string()) {
        Ok(saved) => saved,
        Err(e) => {
            warn!(error = %e, "saving result failed");
            false
        }
    }
}

fn share(report: &FinishReport) {
    if Browser::is_available() {
        webbrowser::open(&format!(
            "https://twitter.com/intent/tweet?text={}%20wpm%20%2F%20{}%25%20acc%20%2F%20{}%20errors%20on%20typewise",
            report.wpm, report.accuracy, report.errors
        ))
        .unwrap_or_default();
    }
}

fn run_calc(calc: Calc) {
    match calc {
        Calc::Wpm {
            chars,
            minutes,
            errors,
        } => {
            let result = WpmCalculation::new(chars, minutes, errors);
            println!("Gross WPM: {}", result.gross_wpm.round());
            println!("Net WPM:   {}", result.net_wpm.round());
        }
        Calc::Accuracy { total, errors } => {
            println!("Accuracy: {:.2}%", accuracy_percent(total, errors));
        }
    }
}

fn print_history(limit: usize) -> Result<(), Box<dyn Error>> {
    let store = ResultStore::open_default()?;
    let recent = store.recent(limit)?;
    if recent.is_empty() {
        println!("No saved results yet. Sign in with `typewise signin <name>` and press (s) after a test.");
        return Ok(());
    }

    for saved in &recent {
        println!(
            "{}  {:<22} {}",
            saved.recorded_at.format("%Y-%m-%d %H:%M"),
            saved.mode,
            saved.report
        );
    }
    println!("\n{} saved results", store.count()?);
    if let Some(best) = store.personal_best()? {
        println!("Personal best: {} ({})", best.report, best.mode);
    }
    Ok(())
}
