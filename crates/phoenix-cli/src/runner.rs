//! The `run` subcommand: launch, drive ticks, forward terminal commands.

use crate::console::{ConsoleSink, format_outcome};
use anyhow::{Context, Result};
use phoenix_adapters::{ControlError, OutputSink, ProcessBackend, Supervisor, TickStatus};
use phoenix_core::{ExitReport, LauncherConfig};
use phoenix_proto::{LaunchMode, LaunchSpec, RemoteCommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Config file looked up in the working directory when `-c` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "phoenix.yml";

/// Settings for one `run` invocation after flags are applied.
#[derive(Debug)]
pub struct RunOptions {
    pub spec: LaunchSpec,
    pub tick_interval: Duration,
    pub strip_ansi: bool,
    pub json: bool,
    pub use_colors: bool,
}

/// Command-line overrides for the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub executable: Option<PathBuf>,
    pub detached: bool,
    pub strip_ansi: bool,
}

/// Resolves config precedence: flags > environment > file > defaults.
pub fn resolve_config(config_path: Option<&Path>, overrides: &Overrides) -> Result<LauncherConfig> {
    let mut config = match config_path {
        Some(path) => LauncherConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => LauncherConfig::load(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}"))?,
        None => LauncherConfig::default(),
    };

    config.apply_env();

    if let Some(executable) = &overrides.executable {
        config.executable = Some(executable.clone());
    }
    if overrides.detached {
        config.detached = true;
    }
    if overrides.strip_ansi {
        config.strip_ansi = true;
    }
    config.validate()?;
    Ok(config)
}

/// Runs one session to completion and returns the process exit code.
pub async fn run(options: RunOptions) -> Result<i32> {
    let mut supervisor = Supervisor::new();

    let launch = match supervisor.start(options.spec) {
        Ok(launch) => launch,
        Err(e) => {
            let Some(report) = e.report(supervisor.policy()) else {
                return Err(e.into());
            };
            warn!(error = %e, "Launch failed");
            print_report(&report, options.json, options.use_colors)?;
            return Ok(report.code);
        }
    };

    if launch.mode == LaunchMode::Detached {
        info!(pid = launch.pid, "Launched detached");
        if options.json {
            println!(
                "{}",
                serde_json::json!({ "pid": launch.pid, "mode": "detached", "started": launch.started })
            );
        } else {
            println!("Launched pid {} (detached)", launch.pid);
        }
        return Ok(0);
    }

    let mut sink = ConsoleSink::stdout(options.strip_ansi);
    let report = drive(&mut supervisor, &mut sink, options.tick_interval).await;
    print_report(&report, options.json, options.use_colors)?;
    Ok(report.code)
}

/// Ticks until the session finishes while forwarding stdin lines as commands.
async fn drive<B, S>(supervisor: &mut Supervisor<B>, sink: &mut S, tick_interval: Duration) -> ExitReport
where
    B: ProcessBackend,
    S: OutputSink,
{
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let TickStatus::Finished(report) = supervisor.tick(sink) {
                    return report;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(supervisor, &line),
                Ok(None) => {
                    debug!("Terminal input closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read terminal input");
                    stdin_open = false;
                }
            },
        }
    }
}

/// What a line typed at the terminal asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Nothing,
    Help,
    Command(RemoteCommand),
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Nothing;
    }
    if line.eq_ignore_ascii_case("help") || line == "?" {
        return Input::Help;
    }
    match line.parse::<RemoteCommand>() {
        Ok(command) => Input::Command(command),
        Err(e) => Input::Invalid(e.to_string()),
    }
}

fn handle_input<B: ProcessBackend>(supervisor: &mut Supervisor<B>, line: &str) {
    match parse_input(line) {
        Input::Nothing => {}
        Input::Help => print!("{}", command_listing()),
        Input::Invalid(message) => eprintln!("{message} (type 'help' for the list)"),
        Input::Command(command) => match supervisor.send_command(&command) {
            Ok(()) => {}
            Err(ControlError::NotRunning { state }) => {
                eprintln!("Cannot send {}: session is {state}", command.verb());
            }
            Err(e) => eprintln!("Failed to send {}: {e}", command.verb()),
        },
    }
}

/// The remote-command vocabulary as a two-column listing.
pub fn command_listing() -> String {
    let shader = RemoteCommand::SetShader("<path>".to_string());
    RemoteCommand::ALL_SIMPLE
        .iter()
        .chain(std::iter::once(&shader))
        .map(|command| format!("  {:<22} {}\n", command.to_string(), command.description()))
        .collect()
}

fn print_report(report: &ExitReport, json: bool, use_colors: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        eprintln!("{}", format_outcome(report, use_colors));
    }
    Ok(())
}
