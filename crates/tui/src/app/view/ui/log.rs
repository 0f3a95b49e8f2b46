use crate::app::state::{ScrollbackItem, SubagentStatus};
use crate::app::util::text::{display_width, sanitize_for_tui, truncate_to_width, wrap_line};
use crate::app::view::theme::Theme;
use crate::app::{AppState, WrappedLogCache};
use ratatui::text::{Line, Span};
use serde_json::Value;

use super::constants::{ARGUMENT_PREVIEW_WIDTH, OUTPUT_PREVIEW_LINES};
use super::style::{marker_for, marker_style, style_for};

const LIVE_MARKER: &str = "● ";

fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn argument_preview(arguments: &Value) -> Option<String> {
    let raw = match arguments {
        Value::Null => return None,
        Value::Object(map) if map.is_empty() => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let flat = sanitize_for_tui(&raw.replace('\n', " "));
    Some(truncate_to_width(&flat, ARGUMENT_PREVIEW_WIDTH))
}

fn output_preview(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let mut preview: Vec<String> = lines
        .iter()
        .take(OUTPUT_PREVIEW_LINES)
        .map(|line| line.to_string())
        .collect();
    if lines.len() > OUTPUT_PREVIEW_LINES {
        preview.push(format!("… {} more lines", lines.len() - OUTPUT_PREVIEW_LINES));
    }
    preview
}

/// Body text of one entry, one string per logical row.
fn item_text(item: &ScrollbackItem) -> Vec<String> {
    match item {
        ScrollbackItem::User { content } => split_lines(content),
        ScrollbackItem::Spacing | ScrollbackItem::AgentBlank => vec![String::new()],
        ScrollbackItem::AgentLine { content, .. } => vec![content.clone()],
        ScrollbackItem::ToolStart { tool, arguments } => {
            let preview = arguments.as_ref().and_then(argument_preview);
            vec![match preview {
                Some(preview) => format!("{tool}({preview})"),
                None => tool.clone(),
            }]
        }
        ScrollbackItem::ToolLog { content } => split_lines(content),
        ScrollbackItem::ToolDone {
            tool,
            success,
            output,
            error,
        } => {
            if *success {
                let mut lines = vec![tool.clone()];
                lines.extend(output.as_deref().map(output_preview).unwrap_or_default());
                lines
            } else {
                let mut lines = vec![format!("{tool} failed")];
                let detail = error.as_deref().or(output.as_deref()).unwrap_or_default();
                lines.extend(output_preview(detail));
                lines
            }
        }
        ScrollbackItem::Subagent {
            agent,
            status,
            success,
        } => vec![match (status, success) {
            (SubagentStatus::Running, _) => format!("{agent} running…"),
            (SubagentStatus::Done, Some(false)) => format!("{agent} failed"),
            (SubagentStatus::Done, _) => format!("{agent} done"),
        }],
        ScrollbackItem::Diagnostic { text, .. } => split_lines(text),
    }
}

pub(super) fn wrap_item(item: &ScrollbackItem, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let marker = marker_for(item);
    let indent = display_width(marker);
    let text_width = width.saturating_sub(indent).max(1);
    let style = style_for(item, theme);
    let mut rows = Vec::new();
    for (line_index, line) in item_text(item).iter().enumerate() {
        let clean = sanitize_for_tui(line);
        for (row_index, row) in wrap_line(&clean, text_width).into_iter().enumerate() {
            let prefix = if line_index == 0 && row_index == 0 {
                Span::styled(marker, marker_style(item, theme))
            } else {
                Span::styled(" ".repeat(indent), style)
            };
            rows.push(Line::from(vec![prefix, Span::styled(row, style)]));
        }
    }
    rows
}

/// Wrapped rows of committed history, recomputed only when the scrollback or the width
/// changed.
pub(super) fn cached_wrap_log_lines<'a>(
    app: &'a mut AppState,
    theme: &Theme,
    width: usize,
) -> &'a [Line<'static>] {
    let version = app.session.scrollback().version();
    let fresh = app
        .wrapped_log_cache
        .as_ref()
        .is_some_and(|cache| cache.version == version && cache.width == width);
    if !fresh {
        let rows = app
            .session
            .scrollback()
            .items()
            .iter()
            .flat_map(|item| wrap_item(item, theme, width))
            .collect();
        app.wrapped_log_cache = Some(WrappedLogCache {
            version,
            width,
            rows,
        });
    }
    match app.wrapped_log_cache.as_ref() {
        Some(cache) => &cache.rows,
        None => &[],
    }
}

/// Uncommitted agent text, drawn after the history and never cached.
pub(super) fn live_rows(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let text = text.trim_start_matches(['\n', '\r']);
    if text.trim().is_empty() {
        return Vec::new();
    }
    let indent = display_width(LIVE_MARKER);
    let text_width = width.saturating_sub(indent).max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let clean = sanitize_for_tui(line);
        for row in wrap_line(&clean, text_width) {
            let prefix = if rows.is_empty() {
                Span::styled(LIVE_MARKER, theme.agent_marker)
            } else {
                Span::raw(" ".repeat(indent))
            };
            rows.push(Line::from(vec![prefix, Span::styled(row, theme.live)]));
        }
    }
    rows
}
