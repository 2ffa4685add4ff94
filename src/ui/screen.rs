use ratatui::Frame;

use crate::app::{App, AppState};
use crate::session::Clock;

/// A UI Screen boundary: responsible for drawing one application state
pub trait Screen<C: Clock + Clone> {
    fn render(&self, app: &App<C>, f: &mut Frame);
}

/// Typing screen - stat cards and the highlighted prompt
pub struct TypingScreen;

impl<C: Clock + Clone> Screen<C> for TypingScreen {
    fn render(&self, app: &App<C>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Results screen - the finish report and what to do next
pub struct ResultsScreen;

impl<C: Clock + Clone> Screen<C> for ResultsScreen {
    fn render(&self, app: &App<C>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen<C: Clock + Clone + 'static>(state: &AppState) -> Box<dyn Screen<C>> {
    match state {
        AppState::Typing => Box::new(TypingScreen),
        AppState::Results => Box::new(ResultsScreen),
    }
}
