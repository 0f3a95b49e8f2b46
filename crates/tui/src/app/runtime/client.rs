use super::framing::LineDecoder;
use super::protocol::{encode_line, BridgeMessage, FrontendMessage};
use crate::config::Config;
use crate::error::BridgeError;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READ_CHUNK_BYTES: usize = 8 * 1024;
const MAX_EVENTS_PER_POLL: usize = 256;
/// How long an observed exit may wait for stdout to drain before it is reported anyway.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Outbound half of the protocol. The session only ever talks to the bridge through this.
pub trait MessageSink {
    fn send(&mut self, message: &FrontendMessage) -> Result<(), BridgeError>;
}

pub struct LineWriter<W: Write> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> MessageSink for LineWriter<W> {
    fn send(&mut self, message: &FrontendMessage) -> Result<(), BridgeError> {
        let line = encode_line(message)?;
        self.inner.write_all(line.as_bytes())?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Stands in for the bridge while no process is running.
pub struct Disconnected;

impl MessageSink for Disconnected {
    fn send(&mut self, _message: &FrontendMessage) -> Result<(), BridgeError> {
        Err(BridgeError::Closed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    Clean,
    Failed { code: i32 },
    Signaled { signal: i32 },
}

const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

impl ExitOutcome {
    /// `requested` is true when the front end itself asked the process to go away.
    pub fn classify(code: Option<i32>, signal: Option<i32>, requested: bool) -> Self {
        if requested {
            return ExitOutcome::Clean;
        }
        match (code, signal) {
            (Some(0), _) => ExitOutcome::Clean,
            (Some(code), _) => ExitOutcome::Failed { code },
            (None, Some(SIGINT | SIGTERM)) | (None, None) => ExitOutcome::Clean,
            (None, Some(signal)) => ExitOutcome::Signaled { signal },
        }
    }

    pub fn from_status(status: ExitStatus, requested: bool) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;
        Self::classify(status.code(), signal, requested)
    }

    pub fn is_error(self) -> bool {
        !matches!(self, ExitOutcome::Clean)
    }

    pub fn summary(self) -> String {
        match self {
            ExitOutcome::Clean => "bridge exited".to_string(),
            ExitOutcome::Failed { code } => format!("bridge exited with code {code}"),
            ExitOutcome::Signaled { signal } => format!("bridge killed by signal {signal}"),
        }
    }

    pub fn hint(self) -> Option<&'static str> {
        match self {
            ExitOutcome::Clean => None,
            ExitOutcome::Failed { code: 1 } => Some(
                "check your provider API key (OPENAI_API_KEY / ANTHROPIC_API_KEY) and PROXI_PROVIDER",
            ),
            ExitOutcome::Failed { code: 2 } => Some("check the bridge command line (PROXI_BRIDGE_BIN)"),
            ExitOutcome::Failed { code: 126 | 127 } => {
                Some("bridge command not found or not executable; set PROXI_BRIDGE_BIN")
            }
            ExitOutcome::Failed { .. } | ExitOutcome::Signaled { .. } => {
                Some("see the log file for details; /restart to try again")
            }
        }
    }
}

enum RuntimeEvent {
    Stdout(Vec<u8>),
    StdoutClosed,
    Stderr(String),
}

/// What the supervisor hands to the session, already in arrival order.
#[derive(Debug, PartialEq)]
pub enum SupervisorEvent {
    Message(BridgeMessage),
    Stderr(String),
    Exited(ExitOutcome),
}

pub struct BridgeProcess {
    child: Child,
    writer: LineWriter<BufWriter<ChildStdin>>,
    events: Receiver<RuntimeEvent>,
    decoder: LineDecoder,
    stdout_closed: bool,
    exit_seen_at: Option<(Instant, ExitStatus)>,
    exit_reported: bool,
    shutdown_requested: bool,
}

fn build_command(config: &Config, env: impl Fn(&str) -> Option<String>) -> Result<Command, BridgeError> {
    let (program, args) = config
        .bridge_command
        .split_first()
        .ok_or(BridgeError::EmptyCommand)?;
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&config.working_dir)
        .env("PYTHONUNBUFFERED", "1")
        .env("PROXI_WORKING_DIR", &config.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(provider) = config.provider.as_deref() {
        command.env("PROXI_PROVIDER", provider);
    }
    if let Some(max_turns) = config.max_turns {
        command.env("PROXI_MAX_TURNS", max_turns.to_string());
    }
    for key in &config.forward_env {
        match env(key.as_str()) {
            Some(value) => {
                command.env(key, value);
            }
            None => debug!(key = %key, "credential not set in parent environment"),
        }
    }
    Ok(command)
}

fn spawn_stdout_reader<R: Read + Send + 'static>(mut reader: R, tx: mpsc::Sender<RuntimeEvent>) {
    thread::spawn(move || {
        let mut buf = [0_u8; READ_CHUNK_BYTES];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    if tx.send(RuntimeEvent::Stdout(buf[..read].to_vec())).is_err() {
                        return;
                    }
                }
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    warn!(%error, "bridge stdout read failed");
                    break;
                }
            }
        }
        let _ = tx.send(RuntimeEvent::StdoutClosed);
    });
}

fn spawn_stderr_reader<R: Read + Send + 'static>(reader: R, tx: mpsc::Sender<RuntimeEvent>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    let trimmed = text.trim_end();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if tx.send(RuntimeEvent::Stderr(trimmed.to_string())).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

pub fn spawn_bridge(config: &Config) -> Result<BridgeProcess, BridgeError> {
    let mut command = build_command(config, |key| std::env::var(key).ok())?;
    let missing: Vec<&str> = config
        .forward_env
        .iter()
        .filter(|key| std::env::var_os(key).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "some credentials are not set; the bridge may refuse to start");
    }

    let command_line = config.bridge_command.join(" ");
    let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
        command: command_line.clone(),
        source,
    })?;
    info!(command = %command_line, pid = child.id(), cwd = %config.working_dir.display(), "bridge spawned");

    let stdin = child.stdin.take().ok_or(BridgeError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(BridgeError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(BridgeError::MissingPipe("stderr"))?;
    let (tx, rx) = mpsc::channel::<RuntimeEvent>();
    spawn_stdout_reader(stdout, tx.clone());
    spawn_stderr_reader(stderr, tx);

    Ok(BridgeProcess {
        child,
        writer: LineWriter::new(BufWriter::new(stdin)),
        events: rx,
        decoder: LineDecoder::new(),
        stdout_closed: false,
        exit_seen_at: None,
        exit_reported: false,
        shutdown_requested: false,
    })
}

impl BridgeProcess {
    pub fn sink(&mut self) -> &mut impl MessageSink {
        &mut self.writer
    }

    pub fn has_exited(&self) -> bool {
        self.exit_reported
    }

    /// Drains whatever the reader threads have produced so far. Each stdout chunk is fully
    /// framed and decoded before the next one is looked at.
    pub fn poll(&mut self) -> Vec<SupervisorEvent> {
        let mut out = Vec::new();
        if self.exit_reported {
            return out;
        }
        for _ in 0..MAX_EVENTS_PER_POLL {
            match self.events.try_recv() {
                Ok(RuntimeEvent::Stdout(chunk)) => {
                    out.extend(
                        self.decoder
                            .push(&chunk)
                            .into_iter()
                            .map(SupervisorEvent::Message),
                    );
                }
                Ok(RuntimeEvent::StdoutClosed) => {
                    debug!(pending = self.decoder.pending_len(), "bridge stdout closed");
                    self.stdout_closed = true;
                    if let Some(message) = self.decoder.finish() {
                        out.push(SupervisorEvent::Message(message));
                    }
                }
                Ok(RuntimeEvent::Stderr(line)) => {
                    debug!(target: "proxi_tui::bridge_stderr", "{line}");
                    out.push(SupervisorEvent::Stderr(line));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.stdout_closed = true;
                    break;
                }
            }
        }

        if self.exit_seen_at.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.exit_seen_at = Some((Instant::now(), status)),
                Ok(None) => {}
                Err(error) => warn!(%error, "failed to poll bridge status"),
            }
        }
        if let Some((seen_at, status)) = self.exit_seen_at {
            if self.stdout_closed || seen_at.elapsed() >= EXIT_DRAIN_GRACE {
                self.exit_reported = true;
                let outcome = ExitOutcome::from_status(status, self.shutdown_requested);
                info!(?outcome, %status, "bridge exited");
                out.push(SupervisorEvent::Exited(outcome));
            }
        }
        out
    }

    /// Session teardown. Abort never goes through here.
    pub fn shutdown(&mut self) {
        self.shutdown_requested = true;
        if self.exit_seen_at.is_some() {
            return;
        }
        if let Err(error) = self.child.kill() {
            debug!(%error, "bridge kill failed");
        }
        match self.child.wait() {
            Ok(status) => info!(%status, "bridge stopped"),
            Err(error) => warn!(%error, "failed to reap bridge"),
        }
    }
}
