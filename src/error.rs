use thiserror::Error;

use crate::components::TeamSide;

/// Why a client command was not applied. None of these are fatal; the
/// scheduler logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("game is paused")]
    Paused,

    #[error("sender has no team")]
    Unassigned,

    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("player {player} does not belong to {team}")]
    NotOwnPlayer { player: String, team: TeamSide },

    #[error("{0} is not the active team")]
    NotActiveTeam(TeamSide),

    #[error("player is not the selected player")]
    NotSelected,

    #[error("previous kick is still in motion")]
    TurnInProgress,

    #[error("direction is not a finite vector")]
    InvalidDirection,
}

impl CommandError {
    /// Authorization failures are worth a warning; the rest are routine.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            CommandError::Unassigned
                | CommandError::UnknownPlayer(_)
                | CommandError::NotOwnPlayer { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("malformed client message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
