//! Decoded termination status of a child process.
//!
//! The numeric exit codes below are the contract between the launcher and the
//! launched emulator and must not change.

use serde::{Deserialize, Serialize};
use std::process::ExitStatus;

/// The child finished normally.
pub const SUCCESS_CODE: i32 = 0;
/// The child aborted on an internal assertion.
pub const ASSERTION_FAILED_CODE: i32 = 2;
/// The executable could not be found or failed to start.
pub const LAUNCH_FAILED_CODE: i32 = 255;

/// How a child terminated.
///
/// `abnormal` is independent of `code`: a child killed by a signal is abnormal
/// whatever value ends up in `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    /// The child returned from `main` or called `exit`.
    pub exited: bool,
    /// Exit code, or `128 + signal` for signal deaths on Unix.
    pub code: i32,
    /// The child did not exit on its own.
    pub abnormal: bool,
}

impl ExitInfo {
    /// A normal exit with the given code.
    pub fn exited(code: i32) -> Self {
        Self {
            exited: true,
            code,
            abnormal: false,
        }
    }

    /// An abnormal termination.
    pub fn abnormal(code: i32) -> Self {
        Self {
            exited: false,
            code,
            abnormal: true,
        }
    }

    /// Decodes an OS exit status.
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::abnormal(128 + signal);
            }
        }

        Self::abnormal(LAUNCH_FAILED_CODE)
    }

    pub fn is_success(&self) -> bool {
        !self.abnormal && self.code == SUCCESS_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited_constructor() {
        let info = ExitInfo::exited(3);
        assert!(info.exited);
        assert!(!info.abnormal);
        assert_eq!(info.code, 3);
        assert!(!info.is_success());
    }

    #[test]
    fn test_abnormal_is_never_success() {
        let info = ExitInfo::abnormal(0);
        assert!(info.abnormal);
        assert!(!info.exited);
        assert!(!info.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn test_from_status_decodes_normal_exit() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status: exit code lives in the second byte.
        let status = ExitStatus::from_raw(7 << 8);
        assert_eq!(ExitInfo::from_status(status), ExitInfo::exited(7));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_status_decodes_signal_death() {
        use std::os::unix::process::ExitStatusExt;
        // SIGKILL
        let status = ExitStatus::from_raw(9);
        let info = ExitInfo::from_status(status);
        assert!(info.abnormal);
        assert_eq!(info.code, 137);
    }

    #[test]
    fn test_exit_info_serializes() {
        let json = serde_json::to_string(&ExitInfo::exited(0)).unwrap();
        assert_eq!(json, r#"{"exited":true,"code":0,"abnormal":false}"#);
    }
}
