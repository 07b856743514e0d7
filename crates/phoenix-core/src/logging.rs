//! Logging initialisation.
//!
//! Child output is printed to stdout by the frontend, so launcher logs must not
//! interleave with it when the user asks for a clean stream. Setting
//! `PHOENIX_DEBUG_LOG=<path>` sends logs to that file instead, without ANSI.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable naming a log file.
pub const DEBUG_LOG_ENV: &str = "PHOENIX_DEBUG_LOG";

/// Returns the filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)))
}

/// Installs the global subscriber.
///
/// Safe to call more than once; later calls are ignored. Logs go to stderr so
/// stdout stays reserved for child output.
pub fn init(verbose: bool) {
    let log_file = std::env::var_os(DEBUG_LOG_ENV)
        .map(PathBuf::from)
        .and_then(|path| File::create(path).ok());

    let result = match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(build_filter(verbose))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(build_filter(verbose))
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
