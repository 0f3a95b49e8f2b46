use crate::app::session::Connection;
use crate::app::state::status::StatusCategory;
use crate::app::util::text::truncate_to_width;
use crate::app::view::theme::Theme;
use crate::app::AppState;
use ratatui::text::{Line, Span};

pub(super) fn build_run_line(app: &AppState, theme: &Theme, width: usize) -> Line<'static> {
    if app.session.hitl().is_pending() {
        return Line::from(Span::styled(
            truncate_to_width("◆ awaiting input", width),
            theme.hitl_title,
        ));
    }
    let status = &app.session.state().status;
    match status.label.as_deref() {
        Some(label) if status.active => {
            let tag = match status.category {
                StatusCategory::Tool => "tool",
                StatusCategory::Subagent => "subagent",
                StatusCategory::Progress => "working",
            };
            let text = format!("{} {tag} • {label}", app.spinner_frame());
            Line::from(Span::styled(
                truncate_to_width(&text, width),
                theme.status_active,
            ))
        }
        _ => Line::from(Span::styled(
            truncate_to_width("● idle", width),
            theme.status_muted,
        )),
    }
}

pub(super) fn build_status_line(app: &AppState, theme: &Theme, width: usize) -> Line<'static> {
    let mut segments = Vec::new();
    if let Some(boot) = app.session.state().boot_info.as_ref() {
        segments.push(format!("{}/{}", boot.agent_id, boot.session_id));
    }
    segments.push(
        match app.session.connection() {
            Connection::Starting => "starting",
            Connection::Ready => "ready",
            Connection::Offline => "offline",
        }
        .to_string(),
    );
    if app.scroll_from_bottom > 0 {
        segments.push(format!("scrolled ↑{}", app.scroll_from_bottom));
    }
    match app.session.connection() {
        Connection::Offline => segments.push("/restart to retry".to_string()),
        _ if app.is_active() => segments.push("Ctrl+C abort".to_string()),
        _ => segments.push("/help".to_string()),
    }
    let text = segments.join(" • ");
    Line::from(Span::styled(
        truncate_to_width(&text, width),
        theme.status_muted,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runtime::protocol::{BootInfo, BridgeMessage, RunState, StatusUpdate};
    use crate::app::session::SessionOptions;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn run_line_follows_classified_status() {
        let theme = Theme::default();
        let mut app = AppState::new(SessionOptions::default());
        assert_eq!(plain(&build_run_line(&app, &theme, 80)), "● idle");

        app.session.apply(BridgeMessage::StatusUpdate(StatusUpdate {
            label: "Tool: read_file".to_string(),
            status: RunState::Running,
        }));
        let line = plain(&build_run_line(&app, &theme, 80));
        assert!(line.ends_with("tool • Tool: read_file"));

        app.session.apply(BridgeMessage::StatusUpdate(StatusUpdate {
            label: "Tool: read_file".to_string(),
            status: RunState::Done,
        }));
        assert_eq!(plain(&build_run_line(&app, &theme, 80)), "● idle");
    }

    #[test]
    fn status_line_shows_identity_and_connection() {
        let theme = Theme::default();
        let mut app = AppState::new(SessionOptions::default());
        assert_eq!(plain(&build_status_line(&app, &theme, 80)), "starting • /help");

        app.session.apply(BridgeMessage::Ready);
        app.session.apply(BridgeMessage::BootComplete(BootInfo {
            agent_id: "proxi".to_string(),
            session_id: "s-1".to_string(),
        }));
        assert_eq!(
            plain(&build_status_line(&app, &theme, 80)),
            "proxi/s-1 • ready • /help"
        );
    }
}
