//! Remote-control vocabulary understood by the emulator.
//!
//! Commands travel over the child's stdin as plain ASCII, one per line. The
//! supervisor never interprets them; this type only gives the frontend a typed
//! way to build and validate lines.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A command the emulator accepts on its stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    SaveState,
    LoadState,
    FastForward,
    FullscreenToggle,
    Quit,
    StateSlotPlus,
    StateSlotMinus,
    MovieRecordToggle,
    PauseToggle,
    FrameAdvance,
    Reset,
    CheatIndexPlus,
    CheatIndexMinus,
    CheatToggle,
    Screenshot,
    DspConfig,
    VolumeUp,
    VolumeDown,
    Mute,
    /// Loads a shader preset. The path is sent as given, minus any line
    /// terminators; build it with [`RemoteCommand::set_shader`] to reject those.
    SetShader(String),
}

/// Error returned when a line does not name a known command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRemoteCommandError {
    #[error("empty remote command")]
    Empty,

    #[error("unknown remote command: {0}")]
    Unknown(String),

    #[error("{verb} requires an argument")]
    MissingArgument { verb: &'static str },

    #[error("{verb} takes no argument")]
    UnexpectedArgument { verb: &'static str },

    #[error("{verb} argument must not contain a line break")]
    LineBreak { verb: &'static str },
}

impl RemoteCommand {
    /// Every command that takes no argument, in the order the remote panel shows them.
    pub const ALL_SIMPLE: [RemoteCommand; 19] = [
        RemoteCommand::Quit,
        RemoteCommand::SaveState,
        RemoteCommand::LoadState,
        RemoteCommand::StateSlotPlus,
        RemoteCommand::StateSlotMinus,
        RemoteCommand::CheatIndexPlus,
        RemoteCommand::CheatIndexMinus,
        RemoteCommand::CheatToggle,
        RemoteCommand::Reset,
        RemoteCommand::PauseToggle,
        RemoteCommand::FrameAdvance,
        RemoteCommand::FastForward,
        RemoteCommand::FullscreenToggle,
        RemoteCommand::MovieRecordToggle,
        RemoteCommand::Screenshot,
        RemoteCommand::DspConfig,
        RemoteCommand::VolumeUp,
        RemoteCommand::VolumeDown,
        RemoteCommand::Mute,
    ];

    /// Builds a `SET_SHADER` command, refusing paths that would split the wire line.
    pub fn set_shader(path: impl Into<String>) -> Result<Self, ParseRemoteCommandError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(ParseRemoteCommandError::MissingArgument { verb: "SET_SHADER" });
        }
        if path.contains(['\r', '\n']) {
            return Err(ParseRemoteCommandError::LineBreak { verb: "SET_SHADER" });
        }
        Ok(RemoteCommand::SetShader(path))
    }

    /// The wire verb.
    pub fn verb(&self) -> &'static str {
        match self {
            RemoteCommand::SaveState => "SAVE_STATE",
            RemoteCommand::LoadState => "LOAD_STATE",
            RemoteCommand::FastForward => "FAST_FORWARD",
            RemoteCommand::FullscreenToggle => "FULLSCREEN_TOGGLE",
            RemoteCommand::Quit => "QUIT",
            RemoteCommand::StateSlotPlus => "STATE_SLOT_PLUS",
            RemoteCommand::StateSlotMinus => "STATE_SLOT_MINUS",
            RemoteCommand::MovieRecordToggle => "MOVIE_RECORD_TOGGLE",
            RemoteCommand::PauseToggle => "PAUSE_TOGGLE",
            RemoteCommand::FrameAdvance => "FRAMEADVANCE",
            RemoteCommand::Reset => "RESET",
            RemoteCommand::CheatIndexPlus => "CHEAT_INDEX_PLUS",
            RemoteCommand::CheatIndexMinus => "CHEAT_INDEX_MINUS",
            RemoteCommand::CheatToggle => "CHEAT_TOGGLE",
            RemoteCommand::Screenshot => "SCREENSHOT",
            RemoteCommand::DspConfig => "DSP_CONFIG",
            RemoteCommand::VolumeUp => "VOLUME_UP",
            RemoteCommand::VolumeDown => "VOLUME_DOWN",
            RemoteCommand::Mute => "MUTE",
            RemoteCommand::SetShader(_) => "SET_SHADER",
        }
    }

    /// Short label for help listings.
    pub fn description(&self) -> &'static str {
        match self {
            RemoteCommand::SaveState => "Save state",
            RemoteCommand::LoadState => "Load state",
            RemoteCommand::FastForward => "Fast forward toggle",
            RemoteCommand::FullscreenToggle => "Fullscreen toggle",
            RemoteCommand::Quit => "Quit",
            RemoteCommand::StateSlotPlus => "State/movie slot (+)",
            RemoteCommand::StateSlotMinus => "State/movie slot (-)",
            RemoteCommand::MovieRecordToggle => "Movie record toggle",
            RemoteCommand::PauseToggle => "Pause toggle",
            RemoteCommand::FrameAdvance => "Frame advance",
            RemoteCommand::Reset => "Reset",
            RemoteCommand::CheatIndexPlus => "Cheat index (+)",
            RemoteCommand::CheatIndexMinus => "Cheat index (-)",
            RemoteCommand::CheatToggle => "Cheat toggle",
            RemoteCommand::Screenshot => "Screenshot",
            RemoteCommand::DspConfig => "DSP config",
            RemoteCommand::VolumeUp => "Volume (+)",
            RemoteCommand::VolumeDown => "Volume (-)",
            RemoteCommand::Mute => "Mute audio",
            RemoteCommand::SetShader(_) => "Set shader <path>",
        }
    }

    /// Renders the command as one `\n`-terminated wire line.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCommand::SetShader(path) => {
                // A terminator inside the path would become a second command.
                write!(f, "{} ", self.verb())?;
                path.split(['\r', '\n']).try_for_each(|part| f.write_str(part))
            }
            other => f.write_str(other.verb()),
        }
    }
}

impl FromStr for RemoteCommand {
    type Err = ParseRemoteCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']).trim_start();
        if line.trim().is_empty() {
            return Err(ParseRemoteCommandError::Empty);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        if verb.eq_ignore_ascii_case("SET_SHADER") {
            return Self::set_shader(rest);
        }

        let command = Self::ALL_SIMPLE
            .iter()
            .find(|cmd| cmd.verb().eq_ignore_ascii_case(verb))
            .cloned()
            .ok_or_else(|| ParseRemoteCommandError::Unknown(verb.to_string()))?;

        if !rest.is_empty() {
            return Err(ParseRemoteCommandError::UnexpectedArgument {
                verb: command.verb(),
            });
        }

        Ok(command)
    }
}
