//! # phoenix-adapters
//!
//! Child-process supervision for the Phoenix launcher.
//!
//! The [`Supervisor`] owns at most one foreground session at a time. It is
//! driven cooperatively: the host calls [`Supervisor::tick`] from its own timer
//! (about every 100 ms), and each tick forwards whatever output is available to
//! an [`OutputSink`], checks whether the child is still alive, and finally
//! reports exactly one [`ExitReport`](phoenix_core::ExitReport).
//!
//! ## Backends
//!
//! Process creation and output transport sit behind [`ProcessBackend`]:
//! - [`PosixBackend`] (Unix): non-blocking pipe reads straight from the tick
//! - [`ThreadedBackend`] (Windows default, available everywhere): a dedicated
//!   reader thread fills a mutex-guarded queue that the tick drains
//!
//! [`NativeBackend`] names the one selected for the current target.
//!
//! ## Remote control
//!
//! While a foreground session is running, [`Supervisor::send`] writes one
//! `\n`-terminated line to the child's stdin. Nothing is read back.

mod backend;
mod error;
mod reaper;
mod sink;
mod supervisor;

#[cfg(unix)]
pub use backend::{PosixBackend, PosixProcess};
pub use backend::{
    CapturedProcess, NativeBackend, ProcessBackend, StreamStatus, ThreadedBackend,
    ThreadedProcess,
};
pub use error::{ControlError, LaunchError};
pub use reaper::Reaper;
pub use sink::{CollectingSink, OutputSink};
pub use supervisor::{Launch, Supervisor, TickStatus};
