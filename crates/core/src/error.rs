//! Error types
//!
//! Rejected commands are ordinary outcomes: they leave the state untouched and
//! report why. Configuration errors indicate malformed data and are fatal at
//! load time.

use std::fmt;

/// Why a command was rejected. The state is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The move/rotation would leave the board or overlap a settled cell
    InvalidMove,
    /// A resolution is in flight
    ResolutionInProgress,
    Paused,
    /// The round has not started or has ended
    NotPlaying,
    /// Hold was already used since the last lock
    HoldUnavailable,
    NoActivePiece,
    /// A piece is already falling
    PieceActive,
}

impl CommandError {
    pub fn code(self) -> &'static str {
        match self {
            CommandError::InvalidMove => "invalid_move",
            CommandError::ResolutionInProgress => "resolution_in_progress",
            CommandError::Paused => "paused",
            CommandError::NotPlaying => "not_playing",
            CommandError::HoldUnavailable => "hold_unavailable",
            CommandError::NoActivePiece | CommandError::PieceActive => "invalid_state",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            CommandError::InvalidMove => "target cells are out of bounds or occupied",
            CommandError::ResolutionInProgress => "a chain resolution is in progress",
            CommandError::Paused => "game is paused",
            CommandError::NotPlaying => "game is not playable",
            CommandError::HoldUnavailable => "hold requested when unavailable",
            CommandError::NoActivePiece => "no active piece",
            CommandError::PieceActive => "a piece is already active",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for CommandError {}

/// Malformed configuration data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No template for a cell count the level curve can request
    MissingShapes { cells: usize },
    /// A template's offset count does not match its group
    ShapeSize { name: String, expected: usize, actual: usize },
    /// The first offset of a template must be the pivot (0, 0)
    ShapePivot { name: String },
    ShapeDuplicateOffset { name: String },
    /// Template cells must form one 4-connected region
    ShapeDisconnected { name: String },
    InvalidDimensions { width: u8, height: u8 },
    /// A level curve is empty or has an out-of-range entry
    InvalidCurve { name: &'static str },
    InvalidObjective { index: usize, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingShapes { cells } => {
                write!(f, "no shape templates with {} cells", cells)
            }
            ConfigError::ShapeSize {
                name,
                expected,
                actual,
            } => write!(
                f,
                "shape '{}' has {} offsets, expected {}",
                name, actual, expected
            ),
            ConfigError::ShapePivot { name } => {
                write!(f, "shape '{}' must start with the (0, 0) pivot", name)
            }
            ConfigError::ShapeDuplicateOffset { name } => {
                write!(f, "shape '{}' repeats an offset", name)
            }
            ConfigError::ShapeDisconnected { name } => {
                write!(f, "shape '{}' is not 4-connected", name)
            }
            ConfigError::InvalidDimensions { width, height } => {
                write!(f, "invalid board dimensions {}x{}", width, height)
            }
            ConfigError::InvalidCurve { name } => write!(f, "invalid level curve '{}'", name),
            ConfigError::InvalidObjective { index, reason } => {
                write!(f, "objective #{}: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
