use crate::app::runtime::protocol::{BootstrapMethod, QuestionKind};
use crate::app::state::hitl::PendingRequest;
use crate::app::state::InputState;
use crate::app::util::text::char_width;
use crate::app::view::theme::Theme;
use crate::app::AppState;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;

use super::constants::{INPUT_PADDING_X, INPUT_PADDING_Y};

pub(super) struct InputLayout {
    pub(super) lines: Vec<String>,
    pub(super) cursor_x: u16,
    pub(super) cursor_y: u16,
}

/// True while the pending request is answered by typing, so the input box edits the
/// answer instead of the task composer.
pub(super) fn answer_mode(app: &AppState) -> bool {
    match app.session.hitl().pending() {
        Some(PendingRequest::Bootstrap(request)) => request.method == BootstrapMethod::Text,
        Some(PendingRequest::Form(walker)) => {
            walker.is_awaiting_custom()
                || walker
                    .current()
                    .is_some_and(|question| question.kind == QuestionKind::Text)
        }
        None => false,
    }
}

pub(super) fn active_input(app: &AppState) -> (&InputState, &'static str) {
    if answer_mode(app) {
        (&app.answer_input, "? ")
    } else {
        (&app.input, "> ")
    }
}

pub(super) fn compute_input_layout(
    width: usize,
    input: &InputState,
    prompt: &'static str,
) -> InputLayout {
    if width == 0 {
        return InputLayout {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        };
    }

    let indent = " ".repeat(prompt.chars().count());
    let mut lines: Vec<String> = Vec::new();
    let mut line = prompt.to_string();
    let prefix_width = line.chars().map(char_width).sum::<usize>();
    let mut col = prefix_width;

    let cursor = input.cursor();
    let mut cursor_x = col;
    let mut cursor_y = 0_usize;
    let mut cursor_set = cursor == 0;

    for (idx, ch) in input.current().chars().enumerate() {
        if idx == cursor && !cursor_set {
            cursor_x = col;
            cursor_y = lines.len();
            cursor_set = true;
        }

        if ch == '\n' {
            lines.push(std::mem::replace(&mut line, indent.clone()));
            col = prefix_width;
            continue;
        }

        let ch_width = char_width(ch);
        if col + ch_width > width && col > prefix_width {
            lines.push(std::mem::replace(&mut line, indent.clone()));
            col = prefix_width;
        }

        line.push(ch);
        col += ch_width;
    }

    if !cursor_set {
        cursor_x = col;
        cursor_y = lines.len();
    }
    lines.push(line);

    let max_x = width.saturating_sub(1);
    InputLayout {
        cursor_x: cursor_x.min(max_x) as u16,
        cursor_y: cursor_y.min(lines.len().saturating_sub(1)) as u16,
        lines,
    }
}

/// Draws the padded input box and places the terminal cursor. Rows above the visible
/// window are dropped so the cursor line stays on screen.
pub(super) fn render_input(
    f: &mut ratatui::Frame,
    area: Rect,
    layout: &InputLayout,
    theme: &Theme,
) {
    let background = Style::default().bg(theme.input_bg);
    f.render_widget(Paragraph::new("").style(background), area);

    let inner = Rect {
        x: area.x.saturating_add(INPUT_PADDING_X),
        y: area.y.saturating_add(INPUT_PADDING_Y),
        width: area.width.saturating_sub(INPUT_PADDING_X.saturating_mul(2)),
        height: area.height.saturating_sub(INPUT_PADDING_Y.saturating_mul(2)),
    };
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let visible = inner.height as usize;
    let skip = (layout.cursor_y as usize + 1).saturating_sub(visible);
    let lines: Vec<Line> = layout
        .lines
        .iter()
        .skip(skip)
        .take(visible)
        .map(|line| Line::from(Span::raw(line.clone())))
        .collect();
    f.render_widget(Paragraph::new(Text::from(lines)).style(background), inner);

    let cursor_row = layout.cursor_y.saturating_sub(skip as u16);
    f.set_cursor_position((inner.x + layout.cursor_x, inner.y + cursor_row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_wraps_and_tracks_cursor() {
        let mut input = InputState::default();
        input.set_from("abcdef");
        let layout = compute_input_layout(6, &input, "> ");
        assert_eq!(layout.lines, vec!["> abcd", "  ef"]);
        assert_eq!((layout.cursor_x, layout.cursor_y), (4, 1));

        input.move_home();
        let layout = compute_input_layout(6, &input, "> ");
        assert_eq!((layout.cursor_x, layout.cursor_y), (2, 0));
    }

    #[test]
    fn newlines_start_indented_rows() {
        let mut input = InputState::default();
        input.set_from("a\nb");
        let layout = compute_input_layout(20, &input, "> ");
        assert_eq!(layout.lines, vec!["> a", "  b"]);
        assert_eq!((layout.cursor_x, layout.cursor_y), (3, 1));
    }
}
