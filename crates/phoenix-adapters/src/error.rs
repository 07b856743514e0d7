use phoenix_core::{ExitPolicy, ExitReport};
use phoenix_proto::{ExitInfo, LAUNCH_FAILED_CODE, LaunchSpec, SessionState};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously by [`Supervisor::start`](crate::Supervisor::start).
///
/// After any of these the supervisor is Idle (or still owns the session that
/// caused `AlreadyActive`) and no handle has leaked.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A session is already in progress.
    #[error("a session is already {state} (pid {pid})")]
    AlreadyActive { pid: u32, state: SessionState },

    /// Creating the output or control pipe failed.
    #[error("failed to create pipe: {0}")]
    Pipe(#[source] io::Error),

    /// The output reader thread could not be started.
    #[error("failed to start output reader: {0}")]
    Reader(#[source] io::Error),

    /// The OS refused to start the executable.
    #[error("failed to launch {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub(crate) fn spawn(spec: &LaunchSpec, source: io::Error) -> Self {
        LaunchError::Spawn {
            executable: spec.executable.clone(),
            source,
        }
    }

    /// Exit code this failure is reported with, if it stands in for a child exit.
    ///
    /// A spawn failure is reported like a child that exited with 255.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            LaunchError::Spawn { .. } => Some(LAUNCH_FAILED_CODE),
            _ => None,
        }
    }

    /// Outcome to show for this failure, if it maps onto one.
    pub fn report(&self, policy: &ExitPolicy) -> Option<ExitReport> {
        self.exit_code()
            .map(|code| policy.report(&ExitInfo::exited(code)))
    }
}

/// Errors returned by [`Supervisor::send`](crate::Supervisor::send).
#[derive(Debug, Error)]
pub enum ControlError {
    /// No foreground session is running.
    #[error("remote channel unavailable: session is {state}")]
    NotRunning { state: SessionState },

    /// The session was started without a control pipe.
    #[error("session has no control channel")]
    Unavailable,

    /// Writing to the child's stdin failed. The session moves to draining.
    #[error("failed to write remote command: {0}")]
    Io(#[from] io::Error),
}
