use crate::app::runtime::protocol::{BootstrapMethod, BootstrapRequest, QuestionKind};
use crate::app::state::hitl::{FormWalker, PendingRequest};
use crate::app::util::text::{sanitize_for_tui, truncate_to_width, wrap_line};
use crate::app::view::theme::Theme;
use crate::app::{AppState, HitlCursor};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

const DEFAULT_TITLE: &str = "Input requested";

struct PanelBuilder<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
}

impl<'t> PanelBuilder<'t> {
    fn new(theme: &'t Theme, width: usize) -> Self {
        Self {
            theme,
            width: width.max(1),
            lines: Vec::new(),
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        let clean = sanitize_for_tui(text);
        for row in wrap_line(&clean, self.width) {
            self.lines.push(Line::from(Span::styled(row, style)));
        }
    }

    fn single(&mut self, text: &str, style: Style) {
        let clean = sanitize_for_tui(text);
        self.lines
            .push(Line::from(Span::styled(truncate_to_width(&clean, self.width), style)));
    }

    fn options(&mut self, options: &[String], cursor: &HitlCursor, multi: bool) {
        for (index, option) in options.iter().enumerate() {
            let number = if index < 9 {
                format!("{}.", index + 1)
            } else {
                "  ".to_string()
            };
            let check = match (multi, cursor.toggled.contains(&index)) {
                (false, _) => "",
                (true, true) => "[x] ",
                (true, false) => "[ ] ",
            };
            let pointer = if index == cursor.selected { "›" } else { " " };
            let style = if index == cursor.selected {
                self.theme.hitl_selected
            } else {
                Style::default()
            };
            self.single(&format!("{pointer} {number} {check}{option}"), style);
        }
    }

    fn yes_no(&mut self, cursor: &HitlCursor) {
        let yes_style = if cursor.selected == 0 {
            self.theme.hitl_selected
        } else {
            Style::default()
        };
        let no_style = if cursor.selected == 1 {
            self.theme.hitl_selected
        } else {
            Style::default()
        };
        self.lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(" Yes ", yes_style),
            Span::raw("  "),
            Span::styled(" No ", no_style),
        ]));
    }

    fn hint(&mut self, text: &str) {
        let style = self.theme.status_muted;
        self.single(text, style);
    }

    fn finish(self) -> Vec<Line<'static>> {
        self.lines
    }
}

/// Panel rows for the pending request, or nothing when no request is waiting.
pub(super) fn build_hitl_lines(app: &AppState, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut panel = PanelBuilder::new(theme, width);
    match app.session.hitl().pending() {
        None => return Vec::new(),
        Some(PendingRequest::Bootstrap(request)) => bootstrap_panel(&mut panel, request, app),
        Some(PendingRequest::Form(walker)) => form_panel(&mut panel, walker, app),
    }
    panel.finish()
}

fn bootstrap_panel(panel: &mut PanelBuilder<'_>, request: &BootstrapRequest, app: &AppState) {
    let title = request.prompt.as_deref().unwrap_or(DEFAULT_TITLE);
    let theme = panel.theme;
    panel.text(title, theme.hitl_title);
    match request.method {
        BootstrapMethod::Confirm => {
            panel.yes_no(&app.hitl_cursor);
            panel.hint("y/n answer • ←/→ move • Enter confirm • Esc no");
        }
        BootstrapMethod::Select => {
            panel.options(request.options(), &app.hitl_cursor, false);
            panel.hint("↑/↓ move • 1-9 pick • Enter select • Esc cancel");
        }
        BootstrapMethod::Text => {
            panel.hint("type below • Enter send • Esc cancel");
        }
    }
}

fn form_panel(panel: &mut PanelBuilder<'_>, walker: &FormWalker, app: &AppState) {
    let theme = panel.theme;
    let request = walker.request();
    let title = request.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let (current, total) = walker.progress();
    let header = if total > 0 {
        format!("{title}  {current}/{total}")
    } else {
        title.to_string()
    };
    panel.single(&header, theme.hitl_title);
    if !request.goal.trim().is_empty() {
        panel.text(&request.goal, theme.status_muted);
    }
    let skip_hint = if request.allow_skip { " • Esc skip" } else { "" };

    let Some(question) = walker.current() else {
        panel.single("press Enter to submit", Style::default().add_modifier(Modifier::BOLD));
        panel.hint(&format!("Enter submit{skip_hint}"));
        return;
    };

    panel.text(&question.question, Style::default().add_modifier(Modifier::BOLD));
    if let Some(hint) = question.hint.as_deref() {
        panel.text(hint, theme.status_muted);
    }

    if walker.is_awaiting_custom() {
        panel.hint("type your answer below • Enter confirm • Esc back to options");
        return;
    }

    match question.kind {
        QuestionKind::Choice => {
            panel.options(&walker.display_options(), &app.hitl_cursor, false);
            panel.hint(&format!("↑/↓ move • 1-9 pick • Enter select{skip_hint}"));
        }
        QuestionKind::Multiselect => {
            panel.options(&walker.display_options(), &app.hitl_cursor, true);
            panel.hint(&format!("Space toggle • Enter submit{skip_hint}"));
        }
        QuestionKind::Yesno => {
            panel.yes_no(&app.hitl_cursor);
            panel.hint(&format!("y/n answer{skip_hint}"));
        }
        QuestionKind::Text => {
            if app.answer_input.is_empty() {
                if let Some(placeholder) = question.placeholder.as_deref() {
                    panel.single(placeholder, theme.status_muted);
                }
            }
            let optional = if question.required { "" } else { " (optional)" };
            panel.hint(&format!("type below • Enter send{optional}{skip_hint}"));
        }
    }
}
