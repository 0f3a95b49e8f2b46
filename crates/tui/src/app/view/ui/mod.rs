mod constants;
mod hitl;
mod input;
mod log;
mod status;
mod style;

use crate::app::view::theme::Theme;
use crate::app::AppState;
use ratatui::layout::Rect;
use ratatui::text::{Line, Text};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use self::constants::{
    INPUT_PADDING_X, INPUT_PADDING_Y, MAX_INPUT_HEIGHT, PANEL_GAP, RUN_HEIGHT, STATUS_HEIGHT,
};
use self::hitl::build_hitl_lines;
use self::input::{active_input, compute_input_layout, render_input};
use self::log::{cached_wrap_log_lines, live_rows};
use self::status::{build_run_line, build_status_line};

/// Top to bottom: history and live text, run line, request panel, input box, status line.
pub fn draw_ui(f: &mut Frame, app: &mut AppState, theme: &Theme) {
    let size = f.area();
    if size.width == 0 || size.height == 0 {
        return;
    }

    // Paragraph does not overwrite every cell; clear so shorter rows leave no ghosts.
    f.render_widget(Clear, size);

    let width = size.width as usize;
    let input_width = size.width.saturating_sub(INPUT_PADDING_X.saturating_mul(2)) as usize;
    let footer_height = STATUS_HEIGHT + RUN_HEIGHT;

    let (input, prompt) = active_input(app);
    let input_layout = compute_input_layout(input_width.max(1), input, prompt);
    let max_input_height = size
        .height
        .saturating_sub(footer_height + INPUT_PADDING_Y.saturating_mul(2))
        .clamp(1, MAX_INPUT_HEIGHT);
    let input_height = (input_layout.lines.len() as u16).clamp(1, max_input_height);
    let input_total = input_height + INPUT_PADDING_Y.saturating_mul(2);
    if size.height < input_total + footer_height {
        return;
    }

    let available_for_panel = size.height - input_total - footer_height;
    let mut panel_lines = build_hitl_lines(app, theme, input_width.max(1));
    let mut panel_gap = 0_u16;
    if !panel_lines.is_empty() {
        let max_lines = if available_for_panel > PANEL_GAP {
            panel_gap = PANEL_GAP;
            available_for_panel - PANEL_GAP
        } else {
            available_for_panel
        } as usize;
        panel_lines.truncate(max_lines);
        if panel_lines.is_empty() {
            panel_gap = 0;
        }
    }
    let panel_height = panel_lines.len() as u16 + panel_gap;

    let max_log_height = size
        .height
        .saturating_sub(input_total + footer_height + panel_height);
    app.last_log_viewport_height = max_log_height as usize;

    let requested_scroll = app.scroll_from_bottom;
    let live = live_rows(app.session.live_text(), theme, width);
    let history = cached_wrap_log_lines(app, theme, width);
    let total_rows = history.len() + live.len();
    let log_height = total_rows.min(max_log_height as usize);
    let max_scroll = total_rows.saturating_sub(log_height);
    let scroll = requested_scroll.min(max_scroll);
    let visible_end = total_rows - scroll;
    let visible_start = visible_end.saturating_sub(log_height);
    let visible: Vec<Line> = history
        .iter()
        .chain(live.iter())
        .skip(visible_start)
        .take(visible_end - visible_start)
        .cloned()
        .collect();
    app.scroll_from_bottom = scroll;

    let mut y = size.y;
    let log_area = Rect {
        x: size.x,
        y,
        width: size.width,
        height: log_height as u16,
    };
    if log_area.height > 0 {
        f.render_widget(Paragraph::new(Text::from(visible)), log_area);
    }
    y += log_area.height;

    let run_area = Rect {
        x: size.x,
        y,
        width: size.width,
        height: RUN_HEIGHT,
    };
    f.render_widget(Paragraph::new(build_run_line(app, theme, width)), run_area);
    y += RUN_HEIGHT;

    if !panel_lines.is_empty() {
        let panel_area = Rect {
            x: size.x.saturating_add(INPUT_PADDING_X),
            y: y + panel_gap,
            width: input_width as u16,
            height: panel_lines.len() as u16,
        };
        f.render_widget(Paragraph::new(Text::from(panel_lines)), panel_area);
    }
    y += panel_height;

    let input_area = Rect {
        x: size.x,
        y,
        width: size.width,
        height: input_total,
    };
    render_input(f, input_area, &input_layout, theme);
    y += input_total;

    let status_area = Rect {
        x: size.x,
        y,
        width: size.width,
        height: STATUS_HEIGHT,
    };
    f.render_widget(
        Paragraph::new(build_status_line(app, theme, width)),
        status_area,
    );
}

#[cfg(test)]
mod tests {
    use super::draw_ui;
    use crate::app::runtime::protocol::{
        BootstrapMethod, BootstrapRequest, BridgeMessage, UserInputRequest,
    };
    use crate::app::session::SessionOptions;
    use crate::app::view::theme::Theme;
    use crate::app::AppState;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(app: &mut AppState, width: u16, height: u16) -> Vec<String> {
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|f| draw_ui(f, app, &theme))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn draws_history_live_text_and_status() {
        let mut app = AppState::new(SessionOptions::default());
        app.session.apply(BridgeMessage::Ready);
        app.session.apply(BridgeMessage::TextStream {
            content: "Hello there".to_string(),
        });
        let rows = screen(&mut app, 40, 12);
        assert!(rows.iter().any(|row| row.contains("● Hello there")));
        assert!(rows.iter().any(|row| row.contains("ready • /help")));
        assert!(rows.iter().any(|row| row.starts_with("  >")));
    }

    #[test]
    fn pending_request_draws_panel_and_answer_prompt() {
        let mut app = AppState::new(SessionOptions::default());
        app.session.apply(BridgeMessage::Ready);
        app.session
            .apply(BridgeMessage::UserInputRequired(UserInputRequest::Bootstrap(
                BootstrapRequest {
                    method: BootstrapMethod::Text,
                    options: None,
                    prompt: Some("API key?".to_string()),
                },
            )));
        let rows = screen(&mut app, 50, 14);
        assert!(rows.iter().any(|row| row.contains("API key?")));
        assert!(rows.iter().any(|row| row.contains("awaiting input")));
        assert!(rows.iter().any(|row| row.starts_with("  ?")));
    }

    #[test]
    fn tiny_terminal_draws_nothing_without_panicking() {
        let mut app = AppState::new(SessionOptions::default());
        let rows = screen(&mut app, 10, 2);
        assert!(rows.iter().all(String::is_empty));
    }

    #[test]
    fn scrolling_is_clamped_to_history() {
        let mut app = AppState::new(SessionOptions::default());
        for n in 0..30 {
            app.push_diagnostic(crate::app::state::DiagnosticLevel::Info, format!("line {n}"));
        }
        app.scroll_from_bottom = 1_000;
        let rows = screen(&mut app, 30, 10);
        assert!(rows[0].contains("line 0"));
        assert!(app.scroll_from_bottom < 30);
    }
}
