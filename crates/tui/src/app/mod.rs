pub(crate) mod handlers;
pub(crate) mod runtime;
pub(crate) mod session;
pub(crate) mod state;
pub(crate) mod util;
pub(crate) mod view;

use crate::app::session::{Session, SessionOptions};
use crate::app::state::{DiagnosticLevel, InputState};
use ratatui::text::Line;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

const SPINNER_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
const SPINNER_INTERVAL: Duration = Duration::from_millis(120);

/// Selection state for the option list of the pending request.
#[derive(Default)]
pub struct HitlCursor {
    pub selected: usize,
    pub toggled: BTreeSet<usize>,
}

impl HitlCursor {
    pub fn reset(&mut self) {
        self.selected = 0;
        self.toggled.clear();
    }

    pub fn move_by(&mut self, delta: isize, option_count: usize) {
        if option_count == 0 {
            self.selected = 0;
            return;
        }
        let count = option_count as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(count) as usize;
    }

    pub fn toggle(&mut self, index: usize) {
        if !self.toggled.remove(&index) {
            self.toggled.insert(index);
        }
    }
}

/// Wrapped scrollback rows for one (version, width) pair.
pub struct WrappedLogCache {
    pub version: u64,
    pub width: usize,
    pub rows: Vec<Line<'static>>,
}

pub struct AppState {
    pub session: Session,
    pub input: InputState,
    pub answer_input: InputState,
    pub hitl_cursor: HitlCursor,
    pub scroll_from_bottom: usize,
    pub last_log_viewport_height: usize,
    pub wrapped_log_cache: Option<WrappedLogCache>,
    pub pending_initial_message: Option<String>,
    pub spinner_index: usize,
    pub spinner_last_tick: Instant,
    pub last_ctrl_c_at: Option<Instant>,
}

impl AppState {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            session: Session::new(options),
            input: InputState::default(),
            answer_input: InputState::default(),
            hitl_cursor: HitlCursor::default(),
            scroll_from_bottom: 0,
            last_log_viewport_height: 0,
            wrapped_log_cache: None,
            pending_initial_message: None,
            spinner_index: 0,
            spinner_last_tick: Instant::now(),
            last_ctrl_c_at: None,
        }
    }

    pub fn push_diagnostic(&mut self, level: DiagnosticLevel, text: impl Into<String>) {
        self.session.push_diagnostic(level, text);
        self.scroll_from_bottom = 0;
    }

    pub fn is_active(&self) -> bool {
        self.session.state().status.active
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_index % SPINNER_FRAMES.len()]
    }

    /// Advances the spinner while the bridge reports activity; true when a redraw is due.
    pub fn update_spinner(&mut self, now: Instant) -> bool {
        if !self.is_active() {
            return false;
        }
        if now.duration_since(self.spinner_last_tick) < SPINNER_INTERVAL {
            return false;
        }
        self.spinner_index = (self.spinner_index + 1) % SPINNER_FRAMES.len();
        self.spinner_last_tick = now;
        true
    }

    /// Clears per-request UI after a request was answered or dropped.
    pub fn reset_hitl_ui(&mut self) {
        self.hitl_cursor.reset();
        self.answer_input.clear();
    }

    pub fn scroll_page_up(&mut self) {
        let page = self.last_log_viewport_height.max(1);
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(page);
    }

    pub fn scroll_page_down(&mut self) {
        let page = self.last_log_viewport_height.max(1);
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(page);
    }

    pub fn clear_log(&mut self) {
        self.session.clear_scrollback();
        self.wrapped_log_cache = None;
        self.scroll_from_bottom = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runtime::protocol::{BridgeMessage, RunState, StatusUpdate};

    #[test]
    fn cursor_wraps_in_both_directions() {
        let mut cursor = HitlCursor::default();
        cursor.move_by(-1, 3);
        assert_eq!(cursor.selected, 2);
        cursor.move_by(1, 3);
        assert_eq!(cursor.selected, 0);
        cursor.move_by(1, 0);
        assert_eq!(cursor.selected, 0);

        cursor.toggle(1);
        cursor.toggle(2);
        cursor.toggle(1);
        assert_eq!(cursor.toggled.iter().copied().collect::<Vec<_>>(), vec![2]);
        cursor.reset();
        assert!(cursor.toggled.is_empty());
    }

    #[test]
    fn spinner_only_advances_while_active() {
        let mut app = AppState::new(SessionOptions::default());
        let later = app.spinner_last_tick + SPINNER_INTERVAL;
        assert!(!app.update_spinner(later));

        app.session.apply(BridgeMessage::StatusUpdate(StatusUpdate {
            label: "Running...".to_string(),
            status: RunState::Running,
        }));
        assert!(app.update_spinner(later));
        assert_eq!(app.spinner_frame(), SPINNER_FRAMES[1]);
        assert!(!app.update_spinner(later));
    }

    #[test]
    fn page_scrolling_is_bounded_below() {
        let mut app = AppState::new(SessionOptions::default());
        app.last_log_viewport_height = 10;
        app.scroll_page_up();
        app.scroll_page_up();
        assert_eq!(app.scroll_from_bottom, 20);
        app.scroll_page_down();
        app.scroll_page_down();
        app.scroll_page_down();
        assert_eq!(app.scroll_from_bottom, 0);
    }
}
