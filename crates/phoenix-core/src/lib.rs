//! # phoenix-core
//!
//! Process-independent building blocks of the Phoenix launcher.
//!
//! This crate provides:
//! - The exit reporter: an ordered policy table mapping [`ExitInfo`] to an outcome
//! - Output decoding: NUL-delimited fragment splitting with UTF-8 carry-over
//! - Launcher configuration loaded from YAML
//! - Logging initialisation on top of `tracing-subscriber`
//!
//! [`ExitInfo`]: phoenix_proto::ExitInfo

mod chunk;
mod config;
mod exit_policy;
pub mod logging;

pub use chunk::{LineAssembler, OutputDecoder, split_fragments};
pub use config::{ConfigError, DEFAULT_TICK_INTERVAL_MS, LauncherConfig};
pub use exit_policy::{ExitMatch, ExitPolicy, ExitReport, ExitRule, OutcomeKind};
