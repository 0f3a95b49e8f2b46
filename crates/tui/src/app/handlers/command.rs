use super::{handle_input_edit_key, LoopAction};
use crate::app::runtime::MessageSink;
use crate::app::state::DiagnosticLevel;
use crate::app::util::sanitize_paste;
use crate::app::AppState;
use crate::error::SessionError;
use crossterm::event::{KeyCode, KeyModifiers};
use std::time::{Duration, Instant};

pub(crate) const CTRL_C_FORCE_QUIT_WINDOW: Duration = Duration::from_secs(2);

#[derive(Clone, Copy)]
struct SlashCommandSpec {
    command: &'static str,
    summary: &'static str,
}

const SLASH_COMMANDS: &[SlashCommandSpec] = &[
    SlashCommandSpec {
        command: "/help",
        summary: "Show commands and keys",
    },
    SlashCommandSpec {
        command: "/clear",
        summary: "Clear the scrollback (the agent keeps its history)",
    },
    SlashCommandSpec {
        command: "/switch",
        summary: "Switch to the next agent",
    },
    SlashCommandSpec {
        command: "/abort",
        summary: "Ask the agent to stop the current task",
    },
    SlashCommandSpec {
        command: "/restart",
        summary: "Start a fresh bridge process",
    },
    SlashCommandSpec {
        command: "/quit",
        summary: "Exit",
    },
    SlashCommandSpec {
        command: "/exit",
        summary: "Exit",
    },
];

const KEY_HELP: &[&str] = &[
    "Enter submit  •  Alt+Enter / Ctrl+J newline  •  Up/Down history",
    "PageUp/PageDown scroll  •  Ctrl+C abort (twice to quit)",
];

fn find_command(command: &str) -> Option<&'static SlashCommandSpec> {
    SLASH_COMMANDS.iter().find(|spec| spec.command == command)
}

fn unknown_command_message(command: &str) -> String {
    let suggestions: Vec<&str> = SLASH_COMMANDS
        .iter()
        .filter(|spec| spec.command.starts_with(command) || command.starts_with(spec.command))
        .map(|spec| spec.command)
        .take(2)
        .collect();
    match suggestions.as_slice() {
        [] => format!("command not found: {command} (type /help)"),
        [only] => format!("command not found: {command} (did you mean {only}?)"),
        [first, second, ..] => {
            format!("command not found: {command} (did you mean {first} or {second}?)")
        }
    }
}

pub(crate) fn report_session_error(app: &mut AppState, error: &SessionError) {
    let level = match error {
        SessionError::Send(_) => DiagnosticLevel::Error,
        _ => DiagnosticLevel::Warn,
    };
    app.push_diagnostic(level, error.to_string());
}

/// Starts `task` unless the bridge cannot take it yet. True when the task was sent.
pub(crate) fn start_task(app: &mut AppState, sink: &mut dyn MessageSink, task: &str) -> bool {
    match app.session.start(sink, task) {
        Ok(()) => {
            app.input.record_history(task.trim());
            app.scroll_from_bottom = 0;
            true
        }
        Err(error) => {
            report_session_error(app, &error);
            false
        }
    }
}

/// Sends the queued `--initial-message` once the bridge accepts input.
pub(crate) fn maybe_start_initial_message(app: &mut AppState, sink: &mut dyn MessageSink) -> bool {
    if app.pending_initial_message.is_none() || !app.session.accepts_input() {
        return false;
    }
    let Some(message) = app.pending_initial_message.take() else {
        return false;
    };
    start_task(app, sink, &message);
    true
}

pub(crate) fn handle_enter(app: &mut AppState, sink: &mut dyn MessageSink) -> LoopAction {
    let raw_input = app.input.current();
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        app.input.clear();
        return LoopAction::Redraw;
    }

    if trimmed.starts_with('/') && !trimmed.contains('\n') {
        let command = trimmed.split_whitespace().next().unwrap_or_default();
        let Some(spec) = find_command(command) else {
            app.push_diagnostic(DiagnosticLevel::Error, unknown_command_message(command));
            return LoopAction::Redraw;
        };
        app.input.record_history(trimmed);
        app.input.clear();
        return run_command(app, sink, spec.command);
    }

    if start_task(app, sink, &raw_input) {
        app.input.clear();
    }
    LoopAction::Redraw
}

fn run_command(app: &mut AppState, sink: &mut dyn MessageSink, command: &str) -> LoopAction {
    let result = match command {
        "/quit" | "/exit" => return LoopAction::Quit,
        "/restart" => return LoopAction::Restart,
        "/help" => {
            for spec in SLASH_COMMANDS {
                app.push_diagnostic(
                    DiagnosticLevel::Info,
                    format!("{:<10} {}", spec.command, spec.summary),
                );
            }
            for line in KEY_HELP {
                app.push_diagnostic(DiagnosticLevel::Info, *line);
            }
            Ok(())
        }
        "/clear" => {
            app.clear_log();
            Ok(())
        }
        "/switch" => app.session.switch_agent(sink),
        "/abort" => app.session.abort(sink).map(|()| {
            app.push_diagnostic(DiagnosticLevel::Info, "abort requested");
        }),
        _ => Ok(()),
    };
    if let Err(error) = result {
        report_session_error(app, &error);
    }
    LoopAction::Redraw
}

/// First Ctrl+C aborts a running task; otherwise, or when pressed twice quickly, quit.
pub(crate) fn handle_ctrl_c(
    app: &mut AppState,
    sink: &mut dyn MessageSink,
    now: Instant,
) -> LoopAction {
    if let Some(previous) = app.last_ctrl_c_at {
        if now.duration_since(previous) <= CTRL_C_FORCE_QUIT_WINDOW {
            return LoopAction::Quit;
        }
    }
    if !app.is_active() {
        return LoopAction::Quit;
    }
    app.last_ctrl_c_at = Some(now);
    match app.session.abort(sink) {
        Ok(()) => app.push_diagnostic(
            DiagnosticLevel::Info,
            "abort requested (Ctrl+C again quickly to force quit)",
        ),
        Err(error) => report_session_error(app, &error),
    }
    LoopAction::Redraw
}

/// Log scrolling works in every mode, including while a request is pending.
pub(crate) fn handle_scroll_key(app: &mut AppState, key: KeyCode) -> Option<LoopAction> {
    match key {
        KeyCode::PageUp => app.scroll_page_up(),
        KeyCode::PageDown => app.scroll_page_down(),
        _ => return None,
    }
    Some(LoopAction::Redraw)
}

pub(crate) fn handle_composer_key(
    app: &mut AppState,
    key: KeyCode,
    modifiers: KeyModifiers,
    sink: &mut dyn MessageSink,
) -> LoopAction {
    match key {
        KeyCode::Enter if modifiers.contains(KeyModifiers::ALT) => {
            app.input.insert_char('\n');
            LoopAction::Redraw
        }
        KeyCode::Enter => handle_enter(app, sink),
        KeyCode::Up => {
            let moved = app.input.move_up() || app.input.history_prev();
            LoopAction::from_redraw(moved)
        }
        KeyCode::Down => {
            let moved = app.input.move_down() || app.input.history_next();
            LoopAction::from_redraw(moved)
        }
        KeyCode::Esc if app.scroll_from_bottom > 0 => {
            app.scroll_from_bottom = 0;
            LoopAction::Redraw
        }
        KeyCode::Char('l') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_log();
            LoopAction::Redraw
        }
        _ => handle_input_edit_key(&mut app.input, key, modifiers, true)
            .map_or(LoopAction::Ignored, LoopAction::from_redraw),
    }
}

pub(crate) fn handle_paste(app: &mut AppState, text: &str) -> bool {
    let cleaned = sanitize_paste(text);
    if cleaned.is_empty() {
        return false;
    }
    if app.session.hitl().is_pending() {
        app.answer_input.insert_str(&cleaned.replace('\n', " "));
    } else {
        app.input.insert_str(&cleaned);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runtime::protocol::{BridgeMessage, FrontendMessage, RunState, StatusUpdate};
    use crate::app::session::SessionOptions;
    use crate::app::state::ScrollbackItem;
    use crate::error::BridgeError;

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<FrontendMessage>,
    }

    impl MessageSink for RecordingSink {
        fn send(&mut self, message: &FrontendMessage) -> Result<(), BridgeError> {
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn ready_app() -> AppState {
        let mut app = AppState::new(SessionOptions::default());
        app.session.apply(BridgeMessage::Ready);
        app
    }

    fn set_running(app: &mut AppState) {
        app.session.apply(BridgeMessage::StatusUpdate(StatusUpdate {
            label: "Running...".to_string(),
            status: RunState::Running,
        }));
    }

    #[test]
    fn enter_starts_task_and_clears_composer() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();
        app.input.set_from("check my calendar");
        assert_eq!(handle_enter(&mut app, &mut sink), LoopAction::Redraw);
        assert!(app.input.is_empty());
        assert_eq!(sink.sent.len(), 1);
        assert!(app.input.history_prev());
        assert_eq!(app.input.current(), "check my calendar");
    }

    #[test]
    fn rejected_task_keeps_input_and_reports() {
        let mut app = AppState::new(SessionOptions::default());
        let mut sink = RecordingSink::default();
        app.input.set_from("too early");
        handle_enter(&mut app, &mut sink);
        assert_eq!(app.input.current(), "too early");
        assert!(sink.sent.is_empty());
        assert!(matches!(
            app.session.scrollback().items().last(),
            Some(ScrollbackItem::Diagnostic {
                level: DiagnosticLevel::Warn,
                ..
            })
        ));
    }

    #[test]
    fn slash_commands_dispatch() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();

        app.input.set_from("/quit");
        assert_eq!(handle_enter(&mut app, &mut sink), LoopAction::Quit);
        app.input.set_from("/restart");
        assert_eq!(handle_enter(&mut app, &mut sink), LoopAction::Restart);

        app.input.set_from("/switch");
        handle_enter(&mut app, &mut sink);
        assert_eq!(sink.sent, vec![FrontendMessage::SwitchAgent]);

        app.input.set_from("/help");
        handle_enter(&mut app, &mut sink);
        assert!(app.session.scrollback().items().len() > SLASH_COMMANDS.len());

        app.input.set_from("/clear");
        handle_enter(&mut app, &mut sink);
        assert!(app.session.scrollback().items().is_empty());
    }

    #[test]
    fn unknown_command_keeps_input() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();
        app.input.set_from("/swit");
        handle_enter(&mut app, &mut sink);
        assert_eq!(app.input.current(), "/swit");
        let Some(ScrollbackItem::Diagnostic { text, .. }) = app.session.scrollback().items().last() else {
            panic!("expected diagnostic");
        };
        assert!(text.contains("did you mean /switch?"));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn unknown_command_message_variants() {
        assert_eq!(
            unknown_command_message("/zzz"),
            "command not found: /zzz (type /help)"
        );
        assert!(unknown_command_message("/e").contains("/exit"));
    }

    #[test]
    fn ctrl_c_aborts_when_active_then_force_quits() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();
        set_running(&mut app);
        let now = Instant::now();
        assert_eq!(handle_ctrl_c(&mut app, &mut sink, now), LoopAction::Redraw);
        assert_eq!(sink.sent, vec![FrontendMessage::Abort]);
        assert_eq!(
            handle_ctrl_c(&mut app, &mut sink, now + Duration::from_millis(500)),
            LoopAction::Quit
        );
    }

    #[test]
    fn ctrl_c_when_idle_quits() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();
        assert_eq!(
            handle_ctrl_c(&mut app, &mut sink, Instant::now()),
            LoopAction::Quit
        );
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn initial_message_waits_for_ready() {
        let mut app = AppState::new(SessionOptions::default());
        let mut sink = RecordingSink::default();
        app.pending_initial_message = Some("summarise my inbox".to_string());
        assert!(!maybe_start_initial_message(&mut app, &mut sink));
        app.session.apply(BridgeMessage::Ready);
        assert!(maybe_start_initial_message(&mut app, &mut sink));
        assert!(app.pending_initial_message.is_none());
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn alt_enter_inserts_newline() {
        let mut app = ready_app();
        let mut sink = RecordingSink::default();
        app.input.set_from("line one");
        handle_composer_key(&mut app, KeyCode::Enter, KeyModifiers::ALT, &mut sink);
        assert_eq!(app.input.current(), "line one\n");
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn page_keys_scroll_and_others_fall_through() {
        let mut app = ready_app();
        app.last_log_viewport_height = 5;
        assert_eq!(
            handle_scroll_key(&mut app, KeyCode::PageUp),
            Some(LoopAction::Redraw)
        );
        assert_eq!(app.scroll_from_bottom, 5);
        handle_scroll_key(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll_from_bottom, 0);
        assert_eq!(handle_scroll_key(&mut app, KeyCode::Enter), None);
    }
}
