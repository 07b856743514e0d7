//! Launch descriptions handed to the supervisor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a launched child is supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Output is captured, exit is reported and the remote channel is live.
    Foreground,
    /// Fire-and-forget. The child is only reaped once it exits.
    Detached,
}

/// Executable path plus ordered arguments.
///
/// A spec is immutable once passed to the supervisor; builders consume `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Program to execute. Resolved through `PATH` when it has no separator.
    pub executable: PathBuf,
    /// Arguments, not including the program name.
    pub args: Vec<String>,
    /// Capture stdout/stderr and open the control channel.
    pub capture_output: bool,
}

impl LaunchSpec {
    /// Creates a foreground spec with no arguments.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            capture_output: true,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Switches to detached mode: no capture, no control pipe.
    pub fn detached(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Returns the supervision mode implied by `capture_output`.
    pub fn mode(&self) -> LaunchMode {
        if self.capture_output {
            LaunchMode::Foreground
        } else {
            LaunchMode::Detached
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Renders the command the way it is shown in the log header.
    ///
    /// Arguments containing whitespace are double-quoted. This is for display
    /// only; arguments are always passed to the OS as a vector.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}
