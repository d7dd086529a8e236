//! Error taxonomy shared by the parser, the geometry engine and the block world.

use crate::world::GridPosition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the crate can report. All of them are recoverable values;
/// the caller decides how to present the message.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RobotError {
    /// Malformed line: missing/extra parentheses, trailing text, non-integer argument.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown command `{name}`")]
    UnknownCommand { line: usize, name: String },

    #[error("line {line}: `{name}` takes {expected} argument(s), got {found} (e.g. {example})")]
    Arity {
        line: usize,
        name: String,
        expected: &'static str,
        found: usize,
        example: &'static str,
    },

    #[error("line {line}: {message}")]
    InvalidArgument { line: usize, message: String },

    #[error("no commands given")]
    EmptyScript,

    #[error("position ({x:.1} mm, {y:.1} mm) is not reachable by the arm")]
    UnreachablePosition { x: f64, y: f64 },

    #[error("height {z:.1} mm is not reachable at this position")]
    UnreachableHeight { z: f64 },

    /// Only ever surfaced as a warning: the wrist is clamped instead.
    #[error("wrist angle {requested:.1}° is outside the servo range, using {applied:.1}°")]
    WristLimitExceeded { requested: f64, applied: f64 },

    #[error("pump activated over empty cell {position}")]
    EmptyGrip { position: GridPosition },

    #[error("cannot release in mid-air at {position}")]
    MidAirRelease { position: GridPosition },

    #[error("cell {position} is already occupied")]
    CellOccupied { position: GridPosition },

    #[error("the gripper is not holding a block")]
    NotHolding,

    #[error("the gripper is already holding a block")]
    GripperBusy,

    #[error("unknown challenge `{name}`")]
    UnknownChallenge { name: String },

    #[error("unknown block type `{name}`")]
    UnknownBlockType { name: String },

    #[error("actuator failure: {0}")]
    Actuator(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Field-less view of [`RobotError`] for matching and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Syntax,
    UnknownCommand,
    Arity,
    InvalidArgument,
    EmptyScript,
    UnreachablePosition,
    UnreachableHeight,
    WristLimitExceeded,
    EmptyGrip,
    MidAirRelease,
    CellOccupied,
    NotHolding,
    GripperBusy,
    UnknownChallenge,
    UnknownBlockType,
    Actuator,
    Config,
}

impl RobotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::EmptyScript => ErrorKind::EmptyScript,
            Self::UnreachablePosition { .. } => ErrorKind::UnreachablePosition,
            Self::UnreachableHeight { .. } => ErrorKind::UnreachableHeight,
            Self::WristLimitExceeded { .. } => ErrorKind::WristLimitExceeded,
            Self::EmptyGrip { .. } => ErrorKind::EmptyGrip,
            Self::MidAirRelease { .. } => ErrorKind::MidAirRelease,
            Self::CellOccupied { .. } => ErrorKind::CellOccupied,
            Self::NotHolding => ErrorKind::NotHolding,
            Self::GripperBusy => ErrorKind::GripperBusy,
            Self::UnknownChallenge { .. } => ErrorKind::UnknownChallenge,
            Self::UnknownBlockType { .. } => ErrorKind::UnknownBlockType,
            Self::Actuator(_) => ErrorKind::Actuator,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Parser errors are reported against a script line.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. }
            | Self::UnknownCommand { line, .. }
            | Self::Arity { line, .. }
            | Self::InvalidArgument { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for RobotError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RobotError>;
