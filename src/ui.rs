pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, AppState};
use crate::session::{CharState, CharStatus, Clock};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const CARD_HEIGHT: u16 = 3;

impl<C: Clock + Clone> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Typing => render_typing(self, area, buf),
            AppState::Results => render_results(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn stat_card<'a>(label: &'a str, value: String, color: Color) -> Paragraph<'a> {
    Paragraph::new(Span::styled(value, bold().fg(color)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(label))
}

fn render_typing<C: Clock + Clone>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let stats = session.current_stats();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt = session.target_text();
    let prompt_width = prompt.width();
    let prompt_lines = if prompt_width <= max_chars_per_line as usize {
        1
    } else {
        ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(CARD_HEIGHT),
            Constraint::Length(1),
            Constraint::Min(prompt_lines),
            Constraint::Length(1),
        ])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(chunks[0]);

    stat_card("WPM", stats.wpm().to_string(), Color::Blue).render(cards[0], buf);
    stat_card("Accuracy", format!("{}%", stats.accuracy_pct()), Color::Green).render(cards[1], buf);
    stat_card(
        "Time Left",
        format!("{}s", session.seconds_remaining()),
        Color::Yellow,
    )
    .render(cards[2], buf);
    stat_card("Errors", stats.errors.to_string(), Color::Red).render(cards[3], buf);

    let widget = Paragraph::new(Line::from(prompt_spans(
        &session.char_statuses(),
        session.highlight(),
    )))
    .alignment(if prompt_lines == 1 {
        Alignment::Center
    } else {
        Alignment::Left
    })
    .wrap(Wrap { trim: false });
    widget.render(chunks[2], buf);

    let mut rules = vec![];
    if !session.allow_backspace() {
        rules.push("backspace disabled");
    }
    if !session.highlight() {
        rules.push("highlighting off");
    }
    let footer = format!("{}   {}", app.mode, rules.join(" · "));
    Paragraph::new(Span::styled(
        footer.trim_end().to_string(),
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

fn state_style(state: CharState, highlight: bool) -> Style {
    match (state, highlight) {
        (CharState::Correct, true) => bold().fg(Color::Green),
        (CharState::Incorrect, true) => bold().fg(Color::White).bg(Color::Red),
        (CharState::Current, true) => bold()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
        (CharState::Current, false) => bold().add_modifier(Modifier::UNDERLINED),
        (CharState::Correct | CharState::Incorrect, false) => bold(),
        (CharState::Pending, _) => dim_bold(),
    }
}

/// Consecutive characters in the same state share one span.
pub fn prompt_spans(statuses: &[CharStatus], highlight: bool) -> Vec<Span<'static>> {
    statuses
        .iter()
        .chunk_by(|s| s.state)
        .into_iter()
        .map(|(state, group)| {
            let text: String = group
                .map(|s| match (state, s.ch) {
                    // a mistyped space would be invisible
                    (CharState::Incorrect, ' ') if highlight => '·',
                    (_, c) => c,
                })
                .collect();
            Span::styled(text, state_style(state, highlight))
        })
        .collect()
}

fn render_results<C: Clock + Clone>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // headline
            Constraint::Length(1), // detail
            Constraint::Length(1), // padding
            Constraint::Length(1), // save prompt
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(report) = app.last_report else {
        return;
    };

    Paragraph::new(Span::styled(
        format!("{} wpm   {}% acc", report.wpm, report.accuracy),
        bold().fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{}/{} correct   {} errors   {:.1}s",
            report.correct_chars, report.total_chars, report.errors, report.time_spent_secs
        ),
        dim_bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let save_line = match (app.logged_in, app.saved) {
        (true, Some(true)) => Span::styled("Result saved to your progress history.", bold().fg(Color::Green)),
        (true, Some(false)) => Span::styled("Could not save this result.", bold().fg(Color::Red)),
        (true, None) => Span::styled(
            "Great job! Press (s) to save this result to your progress history.",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
        (false, _) => Span::styled(
            "Sign in with `typewise signin <name>` to save your progress.",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
    };
    Paragraph::new(save_line)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    let legend = Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (s)ave / (t)weet / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    legend.render(chunks[6], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Mode;
    use crate::session::{ManualClock, SessionConfig};

    fn statuses(target: &str, typed: &str) -> Vec<CharStatus> {
        let mut session =
            crate::session::Session::with_clock(SessionConfig::new(target, 60), ManualClock::new())
                .unwrap();
        session.submit_input(typed);
        session.char_statuses()
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn spans_group_by_state() {
        let spans = prompt_spans(&statuses("hello world", "hexl"), true);
        let texts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();

        assert_eq!(texts, vec!["he", "l", "l", "o", " world"]);
        assert_eq!(spans[1].style.bg, Some(Color::Red));
    }

    #[test]
    fn wrong_space_is_visible_only_with_highlight() {
        let highlighted = prompt_spans(&statuses("a b", "ax"), true);
        assert_eq!(highlighted[1].content, "·");

        let plain = prompt_spans(&statuses("a b", "ax"), false);
        assert_eq!(plain[1].content, " ");
        assert_eq!(plain[1].style.bg, None);
    }

    #[test]
    fn typing_screen_shows_cards() {
        let app = App::with_clock(
            Mode::Custom,
            SessionConfig::new("hello", 60),
            ManualClock::new(),
        )
        .unwrap();
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);

        (&app).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("WPM"));
        assert!(text.contains("Accuracy"));
        assert!(text.contains("100%"));
        assert!(text.contains("60s"));
        assert!(text.contains("hello"));
    }

    #[test]
    fn results_screen_prompts_sign_in() {
        let mut app = App::with_clock(
            Mode::Custom,
            SessionConfig::new("hi", 60),
            ManualClock::new(),
        )
        .unwrap();
        app.on_char('h');
        app.on_char('i');
        let area = Rect::new(0, 0, 100, 20);
        let mut buf = Buffer::empty(area);

        (&app).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("100% acc"));
        assert!(text.contains("Sign in"));
    }
}
