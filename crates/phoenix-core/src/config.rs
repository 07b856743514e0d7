//! Launcher configuration.
//!
//! Loaded from a YAML file, then overlaid with environment variables and
//! command-line flags by the binary. Every field has a default so an empty
//! file is a valid configuration.

use phoenix_proto::LaunchSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default period of the drain tick.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Program to launch.
    pub executable: Option<PathBuf>,

    /// Arguments placed before any given on the command line.
    pub args: Vec<String>,

    /// Launch without capturing output (fire-and-forget).
    pub detached: bool,

    /// Drain tick period in milliseconds.
    pub tick_interval_ms: u64,

    /// Remove ANSI escape sequences from captured output before display.
    pub strip_ansi: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            executable: None,
            args: Vec::new(),
            detached: false,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            strip_ansi: false,
        }
    }
}

impl LauncherConfig {
    /// Environment variable overriding `executable`.
    pub const ENV_EXECUTABLE: &'static str = "PHOENIX_EXECUTABLE";
    /// Environment variable overriding `detached` (`1`/`true`/`yes`).
    pub const ENV_DETACHED: &'static str = "PHOENIX_DETACHED";

    /// Reads and validates a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded launcher config");
        Ok(config)
    }

    /// Parses and validates YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null, not to an empty mapping.
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(exe) = &self.executable
            && exe.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("executable must not be empty".to_string()));
        }
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides using `lookup` as the environment.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(exe) = lookup(Self::ENV_EXECUTABLE).filter(|v| !v.is_empty()) {
            self.executable = Some(PathBuf::from(exe));
        }
        if let Some(value) = lookup(Self::ENV_DETACHED) {
            self.detached = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
    }

    /// Builds the launch spec: configured args first, then `extra_args`.
    pub fn to_launch_spec<I, S>(&self, extra_args: I) -> Result<LaunchSpec, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let executable = self
            .executable
            .clone()
            .ok_or_else(|| ConfigError::Invalid("no executable configured".to_string()))?;

        let mut spec = LaunchSpec::new(executable)
            .args(self.args.iter().cloned())
            .args(extra_args);
        if self.detached {
            spec = spec.detached();
        }
        Ok(spec)
    }
}
