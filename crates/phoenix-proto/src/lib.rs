//! # phoenix-proto
//!
//! Shared types for the Phoenix launcher.
//!
//! This crate holds the data model every other Phoenix crate speaks:
//! - [`LaunchSpec`] and [`LaunchMode`] describe what to start and how
//! - [`ExitInfo`] is the decoded termination status of a child
//! - [`SessionState`] names the supervisor's lifecycle states
//! - [`RemoteCommand`] is the line-based vocabulary understood by the emulator
//!
//! Nothing in here performs I/O.

mod exit;
mod launch;
mod remote;
mod state;

pub use exit::{ASSERTION_FAILED_CODE, ExitInfo, LAUNCH_FAILED_CODE, SUCCESS_CODE};
pub use launch::{LaunchMode, LaunchSpec};
pub use remote::{ParseRemoteCommandError, RemoteCommand};
pub use state::SessionState;
