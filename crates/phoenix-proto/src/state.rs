use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a supervised session.
///
/// `Idle → Starting → Running → Draining → Terminated → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists.
    Idle,
    /// Pipes are being created and the child spawned.
    Starting,
    /// The child is alive; ticks forward output and check liveness.
    Running,
    /// Exit was observed (or the stream broke); flushing what is left.
    Draining,
    /// Output is exhausted and the outcome is about to be reported.
    Terminated,
}

impl SessionState {
    /// Returns true when a new launch would be rejected.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
