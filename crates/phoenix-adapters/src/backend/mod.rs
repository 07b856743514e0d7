//! OS-specific launch and reap backends.
//!
//! Both backends honour the same contract: every pipe end and process handle
//! opened while starting is owned by exactly one value and closed when that
//! value drops, on success and failure paths alike.

#[cfg(unix)]
mod posix;
mod threaded;

#[cfg(unix)]
pub use posix::{PosixBackend, PosixProcess};
pub use threaded::{ThreadedBackend, ThreadedProcess};

use crate::error::LaunchError;
use phoenix_proto::{ExitInfo, LaunchSpec};
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};

/// Backend used by [`Supervisor::new`](crate::Supervisor::new) on this target.
#[cfg(unix)]
pub type NativeBackend = PosixBackend;

/// Backend used by [`Supervisor::new`](crate::Supervisor::new) on this target.
#[cfg(not(unix))]
pub type NativeBackend = ThreadedBackend;

/// Result of polling the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Nothing more is available right now.
    Idle,
    /// The per-poll read budget ran out while data was still buffered.
    Pending,
    /// End of stream: every write end is closed.
    Closed,
}

/// A running child whose output is captured.
pub trait CapturedProcess {
    /// OS process id.
    fn id(&self) -> u32;

    /// Moves every immediately available output fragment into `out`.
    ///
    /// Never blocks. An error means the stream is unusable and is treated as
    /// end of stream by the caller.
    fn poll_output(&mut self, out: &mut Vec<String>) -> io::Result<StreamStatus>;

    /// Non-blocking liveness check. `Some` once the child has exited.
    fn try_exit(&mut self) -> io::Result<Option<ExitInfo>>;

    /// Write end of the control channel, if the session has one.
    fn control(&mut self) -> Option<&mut dyn Write>;

    /// Final harvest after exit has been confirmed.
    ///
    /// Moves any output still held by the backend into `out`. Never blocks,
    /// even when a grandchild still holds the output pipe open.
    fn finish(&mut self, out: &mut Vec<String>);
}

/// Creates child processes.
pub trait ProcessBackend {
    type Process: CapturedProcess;

    /// Spawns a foreground child with output capture and a control pipe.
    fn spawn_captured(&self, spec: &LaunchSpec) -> Result<Self::Process, LaunchError>;

    /// Spawns a fire-and-forget child with no pipes attached.
    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<Child, LaunchError> {
        spawn_detached_child(spec)
    }
}

/// Builds the base command shared by every backend.
pub(crate) fn base_command(spec: &LaunchSpec) -> Command {
    let mut command = Command::new(&spec.executable);
    command.args(&spec.args);

    // Keep the emulator from opening a console window of its own.
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    command
}

fn spawn_detached_child(spec: &LaunchSpec) -> Result<Child, LaunchError> {
    let mut command = base_command(spec);
    command.stdin(Stdio::null());
    command.spawn().map_err(|source| LaunchError::spawn(spec, source))
}
