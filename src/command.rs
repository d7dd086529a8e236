//! Typed arm commands and the script vocabulary.

use serde::{Deserialize, Serialize};

/// One arm command, with its arguments already validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    // --- Motion ---
    /// Move above grid cell `(x, y)` at the current height (`position`).
    MoveXY { x: i32, y: i32 },
    /// Change to grid height `z` (`hoehe`).
    MoveZ { z: i32 },

    // --- Gripper ---
    /// Switch the suction pump on and pick up what is below (`pumpe_an`).
    PumpOn,
    /// Switch the pump off and release the held block (`pumpe_aus`).
    PumpOff,
    /// Turn the wrist by a relative angle in degrees (`drehen`).
    RotateWrist { degrees: i32 },

    // --- Maintenance ---
    /// Hardware self-test (`diagnose`). Never touches the block world.
    Diagnostic { args: Vec<i32> },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::MoveXY { .. } => CommandKind::MoveXY,
            Self::MoveZ { .. } => CommandKind::MoveZ,
            Self::PumpOn => CommandKind::PumpOn,
            Self::PumpOff => CommandKind::PumpOff,
            Self::RotateWrist { .. } => CommandKind::RotateWrist,
            Self::Diagnostic { .. } => CommandKind::Diagnostic,
        }
    }
}

/// Payload-free tag of a [`Command`], used by the vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    MoveXY,
    MoveZ,
    PumpOn,
    PumpOff,
    RotateWrist,
    Diagnostic,
}

/// Accepted argument counts of a script function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtMost(usize),
}

impl Arity {
    /// Whether a call with `count` arguments fits.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtMost(n) => count <= n,
        }
    }

    /// Argument count in words, for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Exactly(0) => "no",
            Self::Exactly(1) => "exactly one",
            Self::Exactly(2) => "exactly two",
            Self::Exactly(_) => "a fixed number of",
            Self::AtMost(1) => "zero or one",
            Self::AtMost(_) => "a bounded number of",
        }
    }
}

/// A script function name and what it maps to.
#[derive(Clone, Copy, Debug)]
pub struct Word {
    pub name: &'static str,
    pub kind: CommandKind,
    pub arity: Arity,
    /// Shown in arity errors.
    pub example: &'static str,
}

/// Every function a script may call. Names are case-sensitive.
pub const VOCABULARY: [Word; 6] = [
    Word {
        name: "position",
        kind: CommandKind::MoveXY,
        arity: Arity::Exactly(2),
        example: "position(5, 5)",
    },
    Word {
        name: "hoehe",
        kind: CommandKind::MoveZ,
        arity: Arity::Exactly(1),
        example: "hoehe(2)",
    },
    Word {
        name: "pumpe_an",
        kind: CommandKind::PumpOn,
        arity: Arity::Exactly(0),
        example: "pumpe_an()",
    },
    Word {
        name: "pumpe_aus",
        kind: CommandKind::PumpOff,
        arity: Arity::Exactly(0),
        example: "pumpe_aus()",
    },
    Word {
        name: "drehen",
        kind: CommandKind::RotateWrist,
        arity: Arity::Exactly(1),
        example: "drehen(90)",
    },
    Word {
        name: "diagnose",
        kind: CommandKind::Diagnostic,
        arity: Arity::AtMost(1),
        example: "diagnose(0)",
    },
];

/// Finds a vocabulary entry by its exact name.
pub fn lookup(name: &str) -> Option<&'static Word> {
    VOCABULARY.iter().find(|w| w.name == name)
}

/// A command together with the script line it came from (1-based).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub line: usize,
    pub command: Command,
}

/// An ordered, immutable list of commands produced from one script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProgram {
    statements: Vec<Statement>,
}

impl ScriptProgram {
    /// Wraps already parsed statements.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Statements in script order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Commands without their line numbers.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.statements.iter().map(|s| &s.command)
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True for a script with only blank lines.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
