mod app;
mod config;
mod error;
mod logging;

use crate::app::handlers::command::{
    handle_composer_key, handle_ctrl_c, handle_paste, handle_scroll_key,
    maybe_start_initial_message,
};
use crate::app::handlers::hitl::handle_hitl_key;
use crate::app::handlers::LoopAction;
use crate::app::runtime::{spawn_bridge, BridgeProcess, Disconnected, MessageSink};
use crate::app::session::SessionOptions;
use crate::app::state::DiagnosticLevel;
use crate::app::view::theme::Theme;
use crate::app::view::ui::draw_ui;
use crate::app::AppState;
use crate::config::Config;
use crossterm::cursor::Show;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::time::{Duration, Instant};
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct TerminalRestoreGuard;

impl Drop for TerminalRestoreGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = std::io::stdout();
        let _ = stdout.execute(DisableBracketedPaste);
        let _ = stdout.execute(LeaveAlternateScreen);
        let _ = stdout.execute(Show);
    }
}

fn start_bridge(app: &mut AppState, config: &Config) -> Option<BridgeProcess> {
    match spawn_bridge(config) {
        Ok(process) => Some(process),
        Err(error) => {
            app.session.on_spawn_error(&error);
            None
        }
    }
}

/// Runs `f` against the live bridge, or against a sink that rejects every send once the
/// bridge is gone.
fn with_sink<R>(
    bridge: &mut Option<BridgeProcess>,
    f: impl FnOnce(&mut dyn MessageSink) -> R,
) -> R {
    match bridge.as_mut() {
        Some(process) => f(process.sink()),
        None => f(&mut Disconnected),
    }
}

/// Feeds everything the supervisor produced into the session, in arrival order.
fn drain_bridge(app: &mut AppState, bridge: &mut Option<BridgeProcess>) -> bool {
    let Some(process) = bridge.as_mut() else {
        return false;
    };
    let events = process.poll();
    let exited = process.has_exited();
    if exited {
        *bridge = None;
    }
    if events.is_empty() {
        return false;
    }
    let had_request = app.session.hitl().is_pending();
    for event in events {
        app.session.handle(event);
    }
    if app.session.hitl().is_pending() != had_request {
        app.reset_hitl_ui();
    }
    true
}

fn restart_bridge(app: &mut AppState, bridge: &mut Option<BridgeProcess>, config: &Config) {
    if let Some(mut process) = bridge.take() {
        process.shutdown();
    }
    app.session.reset_for_restart();
    app.reset_hitl_ui();
    *bridge = start_bridge(app, config);
}

fn handle_key(app: &mut AppState, key: KeyEvent, sink: &mut dyn MessageSink) -> LoopAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return handle_ctrl_c(app, sink, Instant::now());
    }
    app.last_ctrl_c_at = None;
    if let Some(action) = handle_scroll_key(app, key.code) {
        return action;
    }
    if let Some(action) = handle_hitl_key(app, key.code, key.modifiers, sink) {
        return action;
    }
    handle_composer_key(app, key.code, key.modifiers, sink)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    logging::init(&config.log_file);
    info!(
        bridge = %config.bridge_command.join(" "),
        cwd = %config.working_dir.display(),
        "proxi-tui starting"
    );

    let theme = Theme::new(config.theme);
    let mut app = AppState::new(SessionOptions::from_config(&config));
    for warning in &config.warnings {
        app.push_diagnostic(DiagnosticLevel::Warn, warning.clone());
    }
    app.pending_initial_message = config.initial_message.clone();
    if app.pending_initial_message.is_some() {
        app.push_diagnostic(
            DiagnosticLevel::Info,
            "queued initial message; it starts once the agent is ready",
        );
    }
    let mut bridge = start_bridge(&mut app, &config);

    let mut stdout = std::io::stdout();
    let _restore_guard = TerminalRestoreGuard;
    stdout.execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    // Multi-line paste arrives as Event::Paste instead of a stream of Enter keys.
    let _ = stdout.execute(EnableBracketedPaste);
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut needs_redraw = true;
    loop {
        if drain_bridge(&mut app, &mut bridge) {
            needs_redraw = true;
        }
        if with_sink(&mut bridge, |sink| maybe_start_initial_message(&mut app, sink)) {
            needs_redraw = true;
        }

        let mut action = LoopAction::Ignored;
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    action = with_sink(&mut bridge, |sink| handle_key(&mut app, key, sink));
                }
                Event::Paste(text) => {
                    action = LoopAction::from_redraw(handle_paste(&mut app, &text));
                }
                Event::Resize(..) => action = LoopAction::Redraw,
                _ => {}
            }
        }

        match action {
            LoopAction::Quit => break,
            LoopAction::Restart => {
                restart_bridge(&mut app, &mut bridge, &config);
                needs_redraw = true;
            }
            LoopAction::Redraw => needs_redraw = true,
            LoopAction::Ignored => {}
        }

        if app.update_spinner(Instant::now()) {
            needs_redraw = true;
        }
        if needs_redraw {
            terminal.draw(|f| draw_ui(f, &mut app, &theme))?;
            needs_redraw = false;
        }
    }

    if let Some(mut process) = bridge.take() {
        process.shutdown();
    }
    info!("proxi-tui exiting");
    Ok(())
}
