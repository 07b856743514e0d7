//! # phoenix-cli
//!
//! Binary entry point for the Phoenix launcher.
//!
//! - `phoenix run` launches an executable, streams its output and forwards
//!   lines typed at the terminal as remote commands
//! - `phoenix commands` lists the remote-command vocabulary

mod console;
mod runner;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use phoenix_core::logging;
use runner::{Overrides, RunOptions};
use std::io::{IsTerminal, stdout};
use std::path::PathBuf;
use std::time::Duration;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Phoenix - launch and supervise an emulator process
#[derive(Parser, Debug)]
#[command(name = "phoenix", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults to ./phoenix.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an executable and supervise it until it exits
    Run(RunArgs),

    /// List the remote commands accepted on stdin during `run`
    Commands,
}

/// Arguments for the run subcommand.
#[derive(Parser, Debug)]
struct RunArgs {
    /// Executable to launch (overrides config and PHOENIX_EXECUTABLE)
    executable: Option<PathBuf>,

    /// Arguments passed to the executable after the configured ones
    #[arg(last = true)]
    args: Vec<String>,

    /// Launch without capturing output and return immediately
    #[arg(long)]
    detached: bool,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Remove ANSI escape sequences from the child's output
    #[arg(long)]
    strip_ansi: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let use_colors = cli.color.should_use_colors();
    colored::control::set_override(use_colors);

    match cli.command {
        Commands::Run(args) => {
            let code = run_command(cli.config, use_colors, args).await?;
            // Exit directly: the runtime would otherwise wait on the blocking stdin reader.
            std::process::exit(code);
        }
        Commands::Commands => {
            print!("{}", runner::command_listing());
            Ok(())
        }
    }
}

async fn run_command(config_path: Option<PathBuf>, use_colors: bool, args: RunArgs) -> Result<i32> {
    let overrides = Overrides {
        executable: args.executable,
        detached: args.detached,
        strip_ansi: args.strip_ansi,
    };
    let config = runner::resolve_config(config_path.as_deref(), &overrides)?;
    let spec = config.to_launch_spec(args.args)?;

    runner::run(RunOptions {
        spec,
        tick_interval: Duration::from_millis(config.tick_interval_ms),
        strip_ansi: config.strip_ansi,
        json: args.json,
        use_colors,
    })
    .await
}
