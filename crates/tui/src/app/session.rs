use crate::app::runtime::{ExitOutcome, MessageSink, SupervisorEvent};
use crate::app::runtime::protocol::{BootInfo, BridgeMessage, FrontendMessage};
use crate::app::state::hitl::{BootstrapAnswer, FormOutcome, HitlCorrelator, PendingRequest};
use crate::app::state::log::{DiagnosticLevel, Scrollback, ScrollbackItem, SubagentStatus};
use crate::app::state::status::{classify, StatusView};
use crate::app::state::stream::StreamBuffer;
use crate::config::Config;
use crate::error::{BridgeError, SessionError};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

const STDERR_TAIL_LINES: usize = 20;

#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub provider: Option<String>,
    pub max_turns: Option<u32>,
    pub show_stderr: bool,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.provider.clone(),
            max_turns: config.max_turns,
            show_stderr: config.show_stderr,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connection {
    #[default]
    Starting,
    Ready,
    Offline,
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub ready: bool,
    pub offline: bool,
    pub boot_info: Option<BootInfo>,
    pub status: StatusView,
}

/// One bridge session: every incoming message and every local action goes through here,
/// in order, and nothing else mutates the scrollback.
pub struct Session {
    options: SessionOptions,
    state: SessionState,
    scrollback: Scrollback,
    stream: StreamBuffer,
    hitl: HitlCorrelator,
    stderr_tail: VecDeque<String>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: SessionState::default(),
            scrollback: Scrollback::new(),
            stream: StreamBuffer::default(),
            hitl: HitlCorrelator::default(),
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL_LINES),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn live_text(&self) -> &str {
        self.stream.live()
    }

    pub fn hitl(&self) -> &HitlCorrelator {
        &self.hitl
    }

    pub fn hitl_mut(&mut self) -> &mut HitlCorrelator {
        &mut self.hitl
    }

    pub fn connection(&self) -> Connection {
        if self.state.ready {
            Connection::Ready
        } else if self.state.offline {
            Connection::Offline
        } else {
            Connection::Starting
        }
    }

    /// Free-form input goes to the composer only when no request is waiting.
    pub fn accepts_input(&self) -> bool {
        self.state.ready && !self.hitl.is_pending()
    }

    pub fn handle(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::Message(message) => self.apply(message),
            SupervisorEvent::Stderr(line) => self.on_stderr(line),
            SupervisorEvent::Exited(outcome) => self.on_exit(outcome),
        }
    }

    pub fn apply(&mut self, message: BridgeMessage) {
        match message {
            BridgeMessage::Ready => {
                info!("bridge ready");
                self.state.ready = true;
            }
            BridgeMessage::BootComplete(boot) => {
                info!(agent = %boot.agent_id, session = %boot.session_id, "boot complete");
                self.state.boot_info = Some(boot);
            }
            BridgeMessage::TextStream { content } => self.stream.push(&content),
            BridgeMessage::StatusUpdate(update) => {
                self.commit_stream();
                self.state.status = classify(&update.label, update.status);
            }
            BridgeMessage::ToolStart(start) => {
                self.commit_stream();
                self.scrollback.append(ScrollbackItem::ToolStart {
                    tool: start.tool,
                    arguments: start.arguments,
                });
            }
            BridgeMessage::ToolLog { content } => {
                self.scrollback.append(ScrollbackItem::ToolLog { content });
            }
            BridgeMessage::ToolDone(done) => {
                self.scrollback.append(ScrollbackItem::ToolDone {
                    tool: done.tool,
                    success: done.success,
                    output: done.output,
                    error: done.error,
                });
            }
            BridgeMessage::SubagentStart(start) => {
                self.commit_stream();
                debug!(agent = %start.agent, task = %start.task, "subagent started");
                self.scrollback.append(ScrollbackItem::Subagent {
                    agent: start.agent,
                    status: SubagentStatus::Running,
                    success: None,
                });
            }
            BridgeMessage::SubagentDone(done) => {
                if !self.scrollback.complete_subagent(&done.agent, done.success) {
                    debug!(agent = %done.agent, "subagent_done without a running entry");
                    self.scrollback.append(ScrollbackItem::Subagent {
                        agent: done.agent,
                        status: SubagentStatus::Done,
                        success: Some(done.success),
                    });
                }
            }
            BridgeMessage::UserInputRequired(request) => {
                if self.hitl.begin(request) {
                    info!("user input requested");
                } else {
                    warn!("input request arrived while another is pending; dropped");
                    self.push_diagnostic(
                        DiagnosticLevel::Warn,
                        "bridge asked for input again before the previous request was answered; ignoring the new one",
                    );
                }
            }
        }
    }

    pub fn on_stderr(&mut self, line: String) {
        if self.stderr_tail.len() == STDERR_TAIL_LINES {
            self.stderr_tail.pop_front();
        }
        if self.options.show_stderr {
            self.push_diagnostic(DiagnosticLevel::Info, format!("[stderr] {line}"));
        }
        self.stderr_tail.push_back(line);
    }

    pub fn on_exit(&mut self, outcome: ExitOutcome) {
        self.commit_stream();
        self.state.ready = false;
        self.state.offline = true;
        self.state.status = StatusView::default();
        self.hitl.clear();
        if !outcome.is_error() {
            self.push_diagnostic(DiagnosticLevel::Info, outcome.summary());
            return;
        }
        let mut text = outcome.summary();
        if let Some(hint) = outcome.hint() {
            text.push_str(" (");
            text.push_str(hint);
            text.push(')');
        }
        if let Some(last) = self.stderr_tail.iter().rev().find(|line| !line.trim().is_empty()) {
            text.push_str(": ");
            text.push_str(last);
        }
        warn!(?outcome, "bridge exited with an error");
        self.push_diagnostic(DiagnosticLevel::Error, text);
    }

    pub fn on_spawn_error(&mut self, error: &BridgeError) {
        warn!(%error, "bridge failed to start");
        self.state = SessionState {
            offline: true,
            ..SessionState::default()
        };
        self.push_diagnostic(
            DiagnosticLevel::Error,
            format!("could not start the bridge: {error}. Use /restart to retry or /quit to exit."),
        );
    }

    /// Fresh protocol state for a new bridge process; history stays.
    pub fn reset_for_restart(&mut self) {
        self.commit_stream();
        self.state = SessionState::default();
        self.hitl.clear();
        self.stderr_tail.clear();
        self.push_diagnostic(DiagnosticLevel::Info, "restarting bridge");
    }

    pub fn start(&mut self, sink: &mut dyn MessageSink, task: &str) -> Result<(), SessionError> {
        if self.hitl.is_pending() {
            return Err(SessionError::HitlPending);
        }
        if !self.state.ready {
            return Err(SessionError::NotReady);
        }
        let task = task.trim();
        if task.is_empty() {
            return Err(SessionError::EmptyTask);
        }
        self.commit_stream();
        sink.send(&FrontendMessage::Start {
            task: task.to_string(),
            provider: self.options.provider.clone(),
            max_turns: self.options.max_turns,
        })?;
        info!(chars = task.chars().count(), "task started");
        self.scrollback.append_all(vec![
            ScrollbackItem::User {
                content: task.to_string(),
            },
            ScrollbackItem::Spacing,
        ]);
        Ok(())
    }

    pub fn submit_answer(
        &mut self,
        sink: &mut dyn MessageSink,
        answer: BootstrapAnswer,
    ) -> Result<(), SessionError> {
        let reply = self.hitl.bootstrap_reply(answer)?;
        sink.send(&reply)?;
        info!("bootstrap answer sent");
        self.hitl.clear();
        Ok(())
    }

    pub fn submit_form(
        &mut self,
        sink: &mut dyn MessageSink,
        outcome: FormOutcome,
    ) -> Result<(), SessionError> {
        let skipped = outcome.skipped;
        let reply = self.hitl.form_reply(outcome)?;
        sink.send(&reply)?;
        info!(skipped, "form response sent");
        self.hitl.clear();
        Ok(())
    }

    pub fn skip_form(&mut self, sink: &mut dyn MessageSink) -> Result<(), SessionError> {
        let outcome = match self.hitl.pending() {
            None => return Err(SessionError::NoPendingRequest),
            Some(PendingRequest::Bootstrap(_)) => return Err(SessionError::WrongResponseShape),
            Some(PendingRequest::Form(walker)) => walker.skip().ok_or(SessionError::SkipNotAllowed)?,
        };
        self.submit_form(sink, outcome)
    }

    /// Advisory: the bridge decides when to stop and reports it with `status_update`.
    pub fn abort(&mut self, sink: &mut dyn MessageSink) -> Result<(), SessionError> {
        if !self.state.ready {
            return Err(SessionError::NotReady);
        }
        self.commit_stream();
        sink.send(&FrontendMessage::Abort)?;
        info!("abort requested");
        Ok(())
    }

    pub fn switch_agent(&mut self, sink: &mut dyn MessageSink) -> Result<(), SessionError> {
        if !self.state.ready {
            return Err(SessionError::NotReady);
        }
        self.commit_stream();
        sink.send(&FrontendMessage::SwitchAgent)?;
        info!("agent switch requested");
        Ok(())
    }

    pub fn push_diagnostic(&mut self, level: DiagnosticLevel, text: impl Into<String>) {
        self.scrollback.append(ScrollbackItem::diagnostic(level, text));
    }

    /// Front-end reset only; the bridge is not told.
    pub fn clear_scrollback(&mut self) {
        self.scrollback.clear();
    }

    fn commit_stream(&mut self) {
        if self.stream.is_empty() {
            return;
        }
        let items = self.stream.commit();
        self.scrollback.append_all(items);
    }
}
