//! Reader-thread backend.
//!
//! Anonymous pipes on Windows cannot be polled without blocking, so one
//! dedicated thread per session performs the blocking reads and appends decoded
//! fragments to a mutex-guarded queue. The drain tick only ever locks the queue
//! and empties it, and never joins a reader that is still blocked: a
//! background grandchild holding the pipe open would otherwise stall the tick
//! until it exits. Such a reader is detached and ends on its own at EOF.
//!
//! The backend uses only portable std APIs and is compiled on every target so
//! it can be exercised on Unix as well.

use super::{CapturedProcess, ProcessBackend, StreamStatus, base_command};
use crate::error::LaunchError;
use phoenix_core::OutputDecoder;
use phoenix_proto::{ExitInfo, LaunchSpec};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, PipeReader, Read, Write};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Buffer size of the blocking reader.
const READ_BUFFER: usize = 1024;

/// Fragment queue shared between the reader thread and the drain tick.
#[derive(Debug, Default)]
struct SharedOutput {
    fragments: Mutex<VecDeque<String>>,
    eof: AtomicBool,
}

impl SharedOutput {
    fn push(&self, fragments: Vec<String>) {
        if fragments.is_empty() {
            return;
        }
        self.fragments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(fragments);
    }

    fn drain_into(&self, out: &mut Vec<String>) {
        let mut queue = self
            .fragments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        out.extend(queue.drain(..));
    }
}

/// CreateProcess-style backend with a blocking reader thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadedBackend;

impl ThreadedBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for ThreadedBackend {
    type Process = ThreadedProcess;

    fn spawn_captured(&self, spec: &LaunchSpec) -> Result<ThreadedProcess, LaunchError> {
        // The read end is never inherited; only the write ends reach the child.
        let (reader, writer) = io::pipe().map_err(LaunchError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(LaunchError::Pipe)?;

        let shared = Arc::new(SharedOutput::default());
        let reader_thread = spawn_reader(reader, Arc::clone(&shared)).map_err(LaunchError::Reader)?;

        let mut command = base_command(spec);
        command
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr_writer);

        let spawned = command.spawn();
        // Dropping the command closes our write ends; on failure this is what
        // lets the reader hit EOF and exit.
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                if reader_thread.join().is_err() {
                    warn!("Output reader thread panicked");
                }
                return Err(LaunchError::spawn(spec, source));
            }
        };

        let stdin = child.stdin.take();
        debug!(pid = child.id(), "Spawned child with output reader thread");

        Ok(ThreadedProcess {
            child,
            shared,
            reader: Some(reader_thread),
            stdin,
        })
    }
}

fn spawn_reader(mut reader: PipeReader, shared: Arc<SharedOutput>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("phoenix-output-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; READ_BUFFER];
            let mut decoder = OutputDecoder::new();
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("Output reader: EOF");
                        break;
                    }
                    Ok(n) => shared.push(decoder.push(&buf[..n])),
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        debug!(error = %e, "Output reader: read failed");
                        break;
                    }
                }
            }
            shared.push(decoder.finish());
            shared.eof.store(true, Ordering::Release);
        })
}

/// A child spawned by [`ThreadedBackend`].
#[derive(Debug)]
pub struct ThreadedProcess {
    child: Child,
    shared: Arc<SharedOutput>,
    reader: Option<JoinHandle<()>>,
    stdin: Option<ChildStdin>,
}

impl CapturedProcess for ThreadedProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn poll_output(&mut self, out: &mut Vec<String>) -> io::Result<StreamStatus> {
        // Load EOF before draining so a final push is never missed.
        let eof = self.shared.eof.load(Ordering::Acquire);
        self.shared.drain_into(out);
        Ok(if eof {
            StreamStatus::Closed
        } else {
            StreamStatus::Idle
        })
    }

    fn try_exit(&mut self) -> io::Result<Option<ExitInfo>> {
        Ok(self.child.try_wait()?.map(ExitInfo::from_status))
    }

    fn control(&mut self) -> Option<&mut dyn Write> {
        self.stdin.as_mut().map(|stdin| stdin as &mut dyn Write)
    }

    fn finish(&mut self, out: &mut Vec<String>) {
        self.stdin = None;
        if let Some(reader) = self.reader.take() {
            if reader.is_finished() {
                if reader.join().is_err() {
                    warn!(pid = self.child.id(), "Output reader thread panicked");
                }
            } else {
                debug!(pid = self.child.id(), "Output pipe still held open, detaching reader");
            }
        }
        self.shared.drain_into(out);
    }
}
