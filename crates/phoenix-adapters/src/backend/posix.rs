//! POSIX backend.
//!
//! The child's stdout and stderr share one anonymous pipe whose read end is
//! switched to `O_NONBLOCK`, so the drain tick can read until `EAGAIN` without
//! ever blocking the host loop. Liveness is a `waitpid(WNOHANG)` through
//! `Child::try_wait`.

use super::{CapturedProcess, ProcessBackend, StreamStatus, base_command};
use crate::error::LaunchError;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use phoenix_core::OutputDecoder;
use phoenix_proto::{ExitInfo, LaunchSpec};
use std::io::{self, ErrorKind, PipeReader, Read, Write};
use std::os::fd::AsRawFd;
use std::process::{Child, ChildStdin, Stdio};
use tracing::debug;

/// Size of one non-blocking read.
const READ_CHUNK: usize = 2048;

/// Upper bound on reads per poll so a chatty child cannot starve the host loop.
const MAX_READS_PER_POLL: usize = 64;

/// Fork/exec backend with non-blocking pipe reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixBackend;

impl PosixBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for PosixBackend {
    type Process = PosixProcess;

    fn spawn_captured(&self, spec: &LaunchSpec) -> Result<PosixProcess, LaunchError> {
        // std pipes are created close-on-exec; the child only sees the dup'ed ends.
        let (reader, writer) = io::pipe().map_err(LaunchError::Pipe)?;
        set_nonblocking(&reader).map_err(LaunchError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(LaunchError::Pipe)?;

        let mut command = base_command(spec);
        command
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr_writer);

        let mut child = command
            .spawn()
            .map_err(|source| LaunchError::spawn(spec, source))?;
        // Release the parent's copies of the write end so EOF follows the child's exit.
        drop(command);

        let stdin = child.stdin.take();
        debug!(pid = child.id(), "Spawned child with non-blocking output pipe");

        Ok(PosixProcess {
            child,
            output: reader,
            stdin,
            decoder: OutputDecoder::new(),
            buf: vec![0; READ_CHUNK],
            closed: false,
        })
    }
}

/// A child spawned by [`PosixBackend`].
#[derive(Debug)]
pub struct PosixProcess {
    child: Child,
    output: PipeReader,
    stdin: Option<ChildStdin>,
    decoder: OutputDecoder,
    buf: Vec<u8>,
    closed: bool,
}

impl PosixProcess {
    fn close_stream(&mut self, out: &mut Vec<String>) {
        self.closed = true;
        out.extend(self.decoder.finish());
    }
}

impl CapturedProcess for PosixProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn poll_output(&mut self, out: &mut Vec<String>) -> io::Result<StreamStatus> {
        if self.closed {
            return Ok(StreamStatus::Closed);
        }

        let mut reads = 0;
        while reads < MAX_READS_PER_POLL {
            match self.output.read(&mut self.buf) {
                Ok(0) => {
                    debug!(pid = self.child.id(), "Output pipe reached EOF");
                    self.close_stream(out);
                    return Ok(StreamStatus::Closed);
                }
                Ok(n) => {
                    out.extend(self.decoder.push(&self.buf[..n]));
                    reads += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(StreamStatus::Idle),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.close_stream(out);
                    return Err(e);
                }
            }
        }

        Ok(StreamStatus::Pending)
    }

    fn try_exit(&mut self) -> io::Result<Option<ExitInfo>> {
        Ok(self.child.try_wait()?.map(ExitInfo::from_status))
    }

    fn control(&mut self) -> Option<&mut dyn Write> {
        self.stdin.as_mut().map(|stdin| stdin as &mut dyn Write)
    }

    fn finish(&mut self, out: &mut Vec<String>) {
        // Everything readable was taken by the drain polls. A grandchild may
        // still hold the write end, so EOF is not awaited here.
        self.stdin = None;
        if !self.closed {
            self.close_stream(out);
        }
    }
}

fn set_nonblocking(fd: &impl AsRawFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    let flags = fcntl(raw, FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(raw, FcntlArg::F_SETFL(flags))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> LaunchSpec {
        LaunchSpec::new("sh").arg("-c").arg(script)
    }

    fn wait_exit(process: &mut PosixProcess) -> ExitInfo {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(info) = process.try_exit().expect("try_exit") {
                return info;
            }
            assert!(Instant::now() < deadline, "child did not exit");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_poll_on_silent_child_does_not_block() {
        let mut process = PosixBackend.spawn_captured(&sh("sleep 1")).unwrap();
        let mut out = Vec::new();

        let start = Instant::now();
        let status = process.poll_output(&mut out).unwrap();

        assert_eq!(status, StreamStatus::Idle);
        assert!(out.is_empty());
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(process.try_exit().unwrap().is_none());

        wait_exit(&mut process);
    }

    #[test]
    fn test_stdout_and_stderr_share_the_pipe() {
        let mut process = PosixBackend
            .spawn_captured(&sh("echo out; echo err >&2"))
            .unwrap();
        let info = wait_exit(&mut process);

        let mut out = Vec::new();
        let status = process.poll_output(&mut out).unwrap();

        assert_eq!(info, ExitInfo::exited(0));
        assert_eq!(status, StreamStatus::Closed);
        assert_eq!(out.concat(), "out\nerr\n");
    }

    #[test]
    fn test_closed_stream_stays_closed() {
        let mut process = PosixBackend.spawn_captured(&sh("true")).unwrap();
        wait_exit(&mut process);

        let mut out = Vec::new();
        assert_eq!(process.poll_output(&mut out).unwrap(), StreamStatus::Closed);
        assert_eq!(process.poll_output(&mut out).unwrap(), StreamStatus::Closed);
        assert!(out.is_empty());
    }

    #[test]
    fn test_nonblocking_flag_is_set() {
        let (reader, _writer) = io::pipe().unwrap();
        set_nonblocking(&reader).unwrap();
        let flags = OFlag::from_bits_truncate(fcntl(reader.as_raw_fd(), FcntlArg::F_GETFL).unwrap());
        assert!(flags.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let err = PosixBackend
            .spawn_captured(&LaunchSpec::new("/nonexistent/phoenix-test-binary"))
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert_eq!(err.exit_code(), Some(255));
    }
}
