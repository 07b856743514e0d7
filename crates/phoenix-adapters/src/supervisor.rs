//! Process session state machine and drain tick.
//!
//! `Idle → Starting → Running → Draining → Terminated → (reported) → Idle`
//!
//! All transitions after `start` happen inside [`Supervisor::tick`] or on a
//! failed [`Supervisor::send`]. The supervisor never blocks on the child: the
//! tick reads only what is already available and checks liveness without
//! waiting.

use crate::backend::{CapturedProcess, NativeBackend, ProcessBackend, StreamStatus};
use crate::error::{ControlError, LaunchError};
use crate::reaper::Reaper;
use crate::sink::OutputSink;
use chrono::{DateTime, Utc};
use phoenix_core::{ExitPolicy, ExitReport};
use phoenix_proto::{ExitInfo, LAUNCH_FAILED_CODE, LaunchMode, LaunchSpec, RemoteCommand, SessionState};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on polls per tick while draining.
const MAX_DRAIN_POLLS: usize = 256;

/// How long output may keep arriving after the child exited.
///
/// A background grandchild that inherited the output pipe keeps the stream
/// open after the child is gone; the session is finished without waiting for
/// it once this much time has passed.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Returned by a successful [`Supervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub pid: u32,
    pub mode: LaunchMode,
    pub started: DateTime<Utc>,
}

/// What a tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    /// No foreground session.
    Idle,
    /// The child is alive.
    Running,
    /// The child exited or the stream broke; collecting what is left.
    Draining,
    /// The session ended during this tick. Reported exactly once.
    Finished(ExitReport),
}

struct Session<P> {
    state: SessionState,
    process: P,
    pid: u32,
    command_line: String,
    started_at: Instant,
    exit: Option<ExitInfo>,
    exited_at: Option<Instant>,
    stream_closed: bool,
}

impl<P: CapturedProcess> Session<P> {
    fn transition(&mut self, to: SessionState) {
        debug!(pid = self.pid, from = %self.state, to = %to, "Session transition");
        self.state = to;
    }

    /// Reads what is available right now. A transport error ends the stream.
    fn pump(&mut self, fragments: &mut Vec<String>) {
        if self.stream_closed {
            return;
        }
        match self.process.poll_output(fragments) {
            Ok(StreamStatus::Idle | StreamStatus::Pending) => {}
            Ok(StreamStatus::Closed) => {
                debug!(pid = self.pid, "Output stream closed");
                self.stream_closed = true;
            }
            Err(e) => {
                warn!(pid = self.pid, error = %e, "Output read failed, treating as end of stream");
                self.stream_closed = true;
                self.transition(SessionState::Draining);
            }
        }
    }

    /// Non-blocking liveness check.
    fn check_exit(&mut self) {
        if self.exit.is_some() {
            return;
        }
        let exit = match self.process.try_exit() {
            Ok(exit) => exit,
            Err(e) => {
                warn!(pid = self.pid, error = %e, "Liveness check failed, reporting abnormal exit");
                Some(ExitInfo::abnormal(LAUNCH_FAILED_CODE))
            }
        };
        if let Some(info) = exit {
            debug!(pid = self.pid, ?info, "Child exited");
            self.exit = Some(info);
            self.exited_at = Some(Instant::now());
            if self.state == SessionState::Running {
                self.transition(SessionState::Draining);
            }
        }
    }

    /// Flush after exit is known. Never blocks.
    ///
    /// Returns `true` once the session is Terminated: the stream reached end
    /// of file, or `grace` ran out while something else still holds it open.
    fn drain(&mut self, fragments: &mut Vec<String>, grace: Duration) -> bool {
        let mut polls = 0;
        while !self.stream_closed && polls < MAX_DRAIN_POLLS {
            polls += 1;
            match self.process.poll_output(fragments) {
                Ok(StreamStatus::Pending) => {}
                Ok(StreamStatus::Idle) => break,
                Ok(StreamStatus::Closed) => self.stream_closed = true,
                Err(e) => {
                    warn!(pid = self.pid, error = %e, "Output read failed while draining");
                    self.stream_closed = true;
                }
            }
        }

        let grace_elapsed = self
            .exited_at
            .is_none_or(|exited_at| exited_at.elapsed() >= grace);
        if !self.stream_closed && !grace_elapsed {
            return false;
        }
        if !self.stream_closed {
            debug!(pid = self.pid, "Output stream still held open after exit, finishing without EOF");
        }

        self.process.finish(fragments);
        self.transition(SessionState::Terminated);
        true
    }
}

/// Supervises one foreground child at a time plus any number of detached ones.
pub struct Supervisor<B: ProcessBackend = NativeBackend> {
    backend: B,
    policy: ExitPolicy,
    session: Option<Session<B::Process>>,
    reaper: Reaper,
    drain_grace: Duration,
}

impl Supervisor<NativeBackend> {
    /// Creates a supervisor using the backend native to this target.
    pub fn new() -> Self {
        Self::with_backend(NativeBackend::default())
    }
}

impl Default for Supervisor<NativeBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ProcessBackend> Supervisor<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            policy: ExitPolicy::default(),
            session: None,
            reaper: Reaper::new(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Sets how long to keep collecting output after the child exited.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Replaces the exit policy used for reports.
    pub fn with_policy(mut self, policy: ExitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ExitPolicy {
        &self.policy
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    /// Pid of the foreground child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().map(|session| session.pid)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Detached children not yet reaped.
    pub fn detached_children(&self) -> usize {
        self.reaper.len()
    }

    /// Starts a child.
    ///
    /// Foreground specs create a session that is then driven by [`tick`].
    /// Detached specs are spawned, handed to the reaper, and leave the
    /// supervisor Idle. Either kind is rejected while a foreground session is
    /// in progress; the running session is not touched.
    ///
    /// [`tick`]: Supervisor::tick
    pub fn start(&mut self, spec: LaunchSpec) -> Result<Launch, LaunchError> {
        self.reaper.reap();

        if let Some(session) = &self.session {
            warn!(pid = session.pid, state = %session.state, "Rejecting launch, a session is active");
            return Err(LaunchError::AlreadyActive {
                pid: session.pid,
                state: session.state,
            });
        }

        let mode = spec.mode();
        info!(command = %spec.command_line(), ?mode, "Launching");
        let started = Utc::now();

        if mode == LaunchMode::Detached {
            let child = self.backend.spawn_detached(&spec)?;
            let pid = child.id();
            self.reaper.adopt(child);
            return Ok(Launch { pid, mode, started });
        }

        debug!(from = %SessionState::Idle, to = %SessionState::Starting, "Session transition");
        let process = match self.backend.spawn_captured(&spec) {
            Ok(process) => process,
            Err(e) => {
                warn!(error = %e, "Launch failed, session back to idle");
                return Err(e);
            }
        };

        let pid = process.id();
        let mut session = Session {
            state: SessionState::Starting,
            process,
            pid,
            command_line: spec.command_line(),
            started_at: Instant::now(),
            exit: None,
            exited_at: None,
            stream_closed: false,
        };
        session.transition(SessionState::Running);
        self.session = Some(session);

        Ok(Launch { pid, mode, started })
    }

    /// One drain tick.
    ///
    /// Forwards available output to `sink`, checks liveness, and when the
    /// child is gone flushes the rest, reports the outcome through
    /// `sink.on_complete` and returns to Idle. Output still arriving after the
    /// exit is collected over the following ticks, for at most the drain grace.
    pub fn tick<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> TickStatus {
        self.reaper.reap();

        let Some(session) = self.session.as_mut() else {
            return TickStatus::Idle;
        };

        let mut fragments = Vec::new();

        if session.state == SessionState::Running {
            session.pump(&mut fragments);
        }
        session.check_exit();

        let status = match (session.state, session.exit) {
            (SessionState::Draining, Some(_)) => {
                if session.drain(&mut fragments, self.drain_grace) {
                    None
                } else {
                    Some(TickStatus::Draining)
                }
            }
            (SessionState::Draining, None) => Some(TickStatus::Draining),
            _ => Some(TickStatus::Running),
        };

        for fragment in &fragments {
            sink.on_fragment(fragment);
        }

        if let Some(status) = status {
            return status;
        }

        let report = self.finish_session();
        sink.on_complete(&report);
        TickStatus::Finished(report)
    }

    /// Tears down a Terminated session and computes its outcome.
    fn finish_session(&mut self) -> ExitReport {
        let Some(session) = self.session.take() else {
            return self.policy.report(&ExitInfo::abnormal(LAUNCH_FAILED_CODE));
        };

        let info = session.exit.unwrap_or(ExitInfo::abnormal(LAUNCH_FAILED_CODE));
        let runtime_ms = u64::try_from(session.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = self.policy.report(&info).with_runtime_ms(runtime_ms);

        info!(
            pid = session.pid,
            command = %session.command_line,
            code = report.code,
            kind = ?report.kind,
            runtime_ms,
            "{}",
            report.message
        );

        // Dropping the session closes every remaining pipe end and handle.
        drop(session);
        report
    }

    /// Sends one command line to the child's stdin.
    ///
    /// A trailing `\n` is appended when missing; the bytes are otherwise sent
    /// unchanged. Nothing is read back. Fails without any I/O unless a
    /// foreground session is Running. A failed write moves the session to
    /// Draining.
    pub fn send(&mut self, line: &str) -> Result<(), ControlError> {
        let session = match self.session.as_mut() {
            Some(session) if session.state == SessionState::Running => session,
            other => {
                return Err(ControlError::NotRunning {
                    state: other.map_or(SessionState::Idle, |session| session.state),
                });
            }
        };

        let Some(writer) = session.process.control() else {
            return Err(ControlError::Unavailable);
        };

        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        if !payload.ends_with('\n') {
            payload.push('\n');
        }

        match writer.write_all(payload.as_bytes()).and_then(|()| writer.flush()) {
            Ok(()) => {
                debug!(pid = session.pid, command = payload.trim_end(), "Sent remote command");
                Ok(())
            }
            Err(e) => {
                warn!(pid = session.pid, error = %e, "Remote channel write failed");
                session.stream_closed = true;
                session.transition(SessionState::Draining);
                Err(ControlError::Io(e))
            }
        }
    }

    /// Typed form of [`send`](Supervisor::send).
    pub fn send_command(&mut self, command: &RemoteCommand) -> Result<(), ControlError> {
        self.send(&command.to_string())
    }

    /// Accepted for interface parity with the download subsystem.
    ///
    /// A launched child is never killed from here; send
    /// [`RemoteCommand::Quit`] and let it exit on its own.
    pub fn cancel(&mut self) {
        debug!(state = %self.state(), "Cancel has no effect on a launched child");
    }

    /// Collects exited detached children without ticking a session.
    pub fn reap(&mut self) -> usize {
        self.reaper.reap()
    }
}

/// Collects whatever has already exited. A child still running is left running,
/// never waited on or killed.
impl<B: ProcessBackend> Drop for Supervisor<B> {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            match session.process.try_exit() {
                Ok(Some(info)) => {
                    debug!(pid = session.pid, ?info, "Reaped child on supervisor drop");
                }
                Ok(None) => {
                    warn!(pid = session.pid, state = %session.state, "Supervisor dropped with a live session, child left running");
                }
                Err(e) => {
                    warn!(pid = session.pid, error = %e, "Failed to query child on supervisor drop");
                }
            }
        }
        self.reaper.reap();
        if !self.reaper.is_empty() {
            debug!(count = self.reaper.len(), "Detached children left running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use phoenix_core::OutcomeKind;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, Write};
    use std::process::Child;
    use std::rc::Rc;
    use std::time::Duration;

    /// One scripted poll result.
    enum Poll {
        Data(&'static str),
        Idle,
        Closed,
        Fail,
    }

    #[derive(Default)]
    struct Script {
        polls: VecDeque<Poll>,
        /// Ticks (liveness checks) before the child reports exit.
        alive_for: usize,
        exit: Option<ExitInfo>,
        fail_liveness: bool,
        fail_writes: bool,
        written: Vec<u8>,
        finished: usize,
        liveness_checks: usize,
    }

    #[derive(Clone, Default)]
    struct ScriptedBackend {
        script: Rc<RefCell<Script>>,
        fail_spawn: bool,
    }

    struct ScriptedProcess {
        script: Rc<RefCell<Script>>,
        stdin: ScriptedStdin,
    }

    struct ScriptedStdin(Rc<RefCell<Script>>);

    impl Write for ScriptedStdin {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut script = self.0.borrow_mut();
            if script.fail_writes {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            script.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ProcessBackend for ScriptedBackend {
        type Process = ScriptedProcess;

        fn spawn_captured(&self, spec: &LaunchSpec) -> Result<ScriptedProcess, LaunchError> {
            if self.fail_spawn {
                return Err(LaunchError::spawn(spec, io::Error::from(io::ErrorKind::NotFound)));
            }
            Ok(ScriptedProcess {
                script: Rc::clone(&self.script),
                stdin: ScriptedStdin(Rc::clone(&self.script)),
            })
        }

        fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Child, LaunchError> {
            Err(LaunchError::spawn(spec, io::Error::other("not scripted")))
        }
    }

    impl CapturedProcess for ScriptedProcess {
        fn id(&self) -> u32 {
            4242
        }

        fn poll_output(&mut self, out: &mut Vec<String>) -> io::Result<StreamStatus> {
            match self.script.borrow_mut().polls.pop_front() {
                Some(Poll::Data(text)) => {
                    out.push(text.to_string());
                    Ok(StreamStatus::Idle)
                }
                Some(Poll::Idle) | None => Ok(StreamStatus::Idle),
                Some(Poll::Closed) => Ok(StreamStatus::Closed),
                Some(Poll::Fail) => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
            }
        }

        fn try_exit(&mut self) -> io::Result<Option<ExitInfo>> {
            let mut script = self.script.borrow_mut();
            script.liveness_checks += 1;
            if script.fail_liveness {
                return Err(io::Error::other("wait failed"));
            }
            if script.liveness_checks > script.alive_for {
                Ok(script.exit)
            } else {
                Ok(None)
            }
        }

        fn control(&mut self) -> Option<&mut dyn Write> {
            Some(&mut self.stdin)
        }

        fn finish(&mut self, out: &mut Vec<String>) {
            let mut script = self.script.borrow_mut();
            script.finished += 1;
            while let Some(Poll::Data(text)) = script.polls.pop_front() {
                out.push(text.to_string());
            }
        }
    }

    fn scripted(script: Script) -> (Supervisor<ScriptedBackend>, Rc<RefCell<Script>>) {
        let backend = ScriptedBackend {
            script: Rc::new(RefCell::new(script)),
            fail_spawn: false,
        };
        let handle = Rc::clone(&backend.script);
        let supervisor = Supervisor::with_backend(backend).with_drain_grace(Duration::ZERO);
        (supervisor, handle)
    }

    fn spec() -> LaunchSpec {
        LaunchSpec::new("retroarch").arg("game.sfc")
    }

    #[test]
    fn test_full_lifecycle_reports_once() {
        let (mut supervisor, script) = scripted(Script {
            polls: VecDeque::from([Poll::Data("A"), Poll::Idle, Poll::Data("B"), Poll::Data("C")]),
            alive_for: 2,
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        let mut sink = CollectingSink::new();

        let launch = supervisor.start(spec()).unwrap();
        assert_eq!(launch.pid, 4242);
        assert_eq!(launch.mode, LaunchMode::Foreground);
        assert_eq!(supervisor.state(), SessionState::Running);

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        let status = supervisor.tick(&mut sink);
        let TickStatus::Finished(report) = status else {
            panic!("expected Finished, got {status:?}");
        };

        assert_eq!(report.kind, OutcomeKind::Success);
        assert!(report.runtime_ms.is_some());
        assert_eq!(sink.fragments(), ["A", "B", "C"]);
        assert_eq!(sink.reports().len(), 1);
        assert_eq!(script.borrow().finished, 1);
        assert_eq!(supervisor.state(), SessionState::Idle);

        for _ in 0..5 {
            assert_eq!(supervisor.tick(&mut sink), TickStatus::Idle);
        }
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_read_error_forces_draining_until_exit() {
        let (mut supervisor, script) = scripted(Script {
            polls: VecDeque::from([Poll::Data("partial"), Poll::Fail, Poll::Data("never read")]),
            alive_for: 3,
            exit: Some(ExitInfo::exited(7)),
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);
        assert_eq!(supervisor.state(), SessionState::Draining);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);

        let TickStatus::Finished(report) = supervisor.tick(&mut sink) else {
            panic!("expected Finished");
        };
        assert_eq!(report.code, 7);
        assert_eq!(report.kind, OutcomeKind::Error);
        // The stream was closed, so only finish() harvested the queued data.
        assert_eq!(sink.text(), "partialnever read");
        assert_eq!(script.borrow().finished, 1);
    }

    #[test]
    fn test_liveness_failure_degrades_to_abnormal() {
        let (mut supervisor, _script) = scripted(Script {
            fail_liveness: true,
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        let TickStatus::Finished(report) = supervisor.tick(&mut sink) else {
            panic!("expected Finished");
        };
        assert_eq!(report.kind, OutcomeKind::Abnormal);
    }

    #[test]
    fn test_second_start_rejected_without_disturbing_session() {
        let (mut supervisor, _script) = scripted(Script {
            polls: VecDeque::from([Poll::Data("first")]),
            alive_for: 1,
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        let err = supervisor.start(spec()).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::AlreadyActive {
                pid: 4242,
                state: SessionState::Running
            }
        ));
        assert_eq!(supervisor.state(), SessionState::Running);

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Finished(_)));
        assert_eq!(sink.text(), "first");
    }

    #[test]
    fn test_spawn_failure_stays_idle() {
        let backend = ScriptedBackend {
            fail_spawn: true,
            ..Default::default()
        };
        let mut supervisor = Supervisor::with_backend(backend);

        let err = supervisor.start(spec()).unwrap_err();
        assert_eq!(err.exit_code(), Some(255));
        assert_eq!(
            err.report(supervisor.policy()).map(|r| r.kind),
            Some(OutcomeKind::LaunchFailed)
        );
        assert_eq!(supervisor.state(), SessionState::Idle);
        assert!(!supervisor.is_active());
    }

    #[test]
    fn test_send_appends_single_newline() {
        let (mut supervisor, script) = scripted(Script {
            alive_for: usize::MAX,
            ..Default::default()
        });
        supervisor.start(spec()).unwrap();

        supervisor.send("SAVE_STATE").unwrap();
        supervisor.send("LOAD_STATE\n").unwrap();
        supervisor
            .send_command(&RemoteCommand::SetShader("/shaders/crt.cgp".to_string()))
            .unwrap();

        assert_eq!(
            script.borrow().written,
            b"SAVE_STATE\nLOAD_STATE\nSET_SHADER /shaders/crt.cgp\n"
        );
    }

    #[test]
    fn test_send_when_idle_fails_without_io() {
        let (mut supervisor, script) = scripted(Script::default());

        let err = supervisor.send("QUIT").unwrap_err();
        assert!(matches!(
            err,
            ControlError::NotRunning {
                state: SessionState::Idle
            }
        ));
        assert!(script.borrow().written.is_empty());
    }

    #[test]
    fn test_send_after_termination_fails() {
        let (mut supervisor, script) = scripted(Script {
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Finished(_)));

        assert!(matches!(
            supervisor.send("QUIT"),
            Err(ControlError::NotRunning { .. })
        ));
        assert!(script.borrow().written.is_empty());
    }

    #[test]
    fn test_write_failure_moves_to_draining() {
        let (mut supervisor, script) = scripted(Script {
            alive_for: 1,
            exit: Some(ExitInfo::exited(0)),
            fail_writes: true,
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        assert!(matches!(supervisor.send("QUIT"), Err(ControlError::Io(_))));
        assert_eq!(supervisor.state(), SessionState::Draining);
        assert!(matches!(
            supervisor.send("QUIT"),
            Err(ControlError::NotRunning {
                state: SessionState::Draining
            })
        ));

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Finished(_)));
        assert_eq!(script.borrow().finished, 1);
    }

    #[test]
    fn test_closed_stream_still_waits_for_exit() {
        let (mut supervisor, _script) = scripted(Script {
            polls: VecDeque::from([Poll::Data("bye\n"), Poll::Closed]),
            alive_for: 3,
            exit: Some(ExitInfo::abnormal(139)),
            ..Default::default()
        });
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Running);
        let TickStatus::Finished(report) = supervisor.tick(&mut sink) else {
            panic!("expected Finished");
        };
        assert_eq!(report.kind, OutcomeKind::Abnormal);
        assert_eq!(sink.text(), "bye\n");
    }

    #[test]
    fn test_open_stream_after_exit_keeps_draining_within_grace() {
        let (supervisor, script) = scripted(Script {
            polls: VecDeque::from([Poll::Data("early")]),
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        let mut supervisor = supervisor.with_drain_grace(Duration::from_secs(3600));
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);
        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);
        assert_eq!(script.borrow().finished, 0);

        script
            .borrow_mut()
            .polls
            .extend([Poll::Data("late"), Poll::Closed]);
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Draining));
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Finished(_)));
        assert_eq!(sink.fragments(), ["early", "late"]);
        assert_eq!(script.borrow().finished, 1);
    }

    #[test]
    fn test_grace_expiry_finishes_without_eof() {
        let (supervisor, script) = scripted(Script {
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        let mut supervisor = supervisor.with_drain_grace(Duration::from_millis(20));
        let mut sink = CollectingSink::new();
        supervisor.start(spec()).unwrap();

        assert_eq!(supervisor.tick(&mut sink), TickStatus::Draining);
        std::thread::sleep(Duration::from_millis(40));
        assert!(matches!(supervisor.tick(&mut sink), TickStatus::Finished(_)));
        assert_eq!(script.borrow().finished, 1);
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_drop_collects_exited_child() {
        let (mut supervisor, script) = scripted(Script {
            alive_for: 0,
            exit: Some(ExitInfo::exited(0)),
            ..Default::default()
        });
        supervisor.start(spec()).unwrap();

        drop(supervisor);
        assert_eq!(script.borrow().liveness_checks, 1);
    }

    #[test]
    fn test_cancel_is_noop() {
        let (mut supervisor, _script) = scripted(Script {
            alive_for: usize::MAX,
            ..Default::default()
        });
        supervisor.start(spec()).unwrap();
        supervisor.cancel();
        assert_eq!(supervisor.state(), SessionState::Running);
    }
}
