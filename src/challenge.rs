//! Challenge definitions, the catalog they are looked up in, and the in-memory
//! record of which challenges a session has solved.

use crate::error::{Result, RobotError};
use crate::world::{BlockType, ChallengeRuntimeState, GridPosition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Grid height at which a block lying on the board is gripped.
pub const DEFAULT_FLOOR_LEVEL: i32 = 1;

/// Longest side of a block type, in cells. One board side.
pub const MAX_BLOCK_EXTENT: i32 = 16;

/// Number of challenges a session has to solve by default.
pub const DEFAULT_REQUIRED_CHALLENGES: usize = 2;

fn default_floor_level() -> i32 {
    DEFAULT_FLOOR_LEVEL
}

/// Where a block starts or has to end up.
///
/// Serialized as `[x, y, z, type]` or `[x, y, z, rotation, type]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlacementRepr", into = "PlacementRepr")]
pub struct Placement {
    pub position: GridPosition,
    /// Degrees; 0 when omitted.
    pub rotation: i32,
    pub block_type: String,
}

impl Placement {
    pub fn new(position: GridPosition, rotation: i32, block_type: impl Into<String>) -> Self {
        Self {
            position,
            rotation,
            block_type: block_type.into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PlacementRepr {
    Plain(i32, i32, i32, String),
    Rotated(i32, i32, i32, i32, String),
}

impl From<PlacementRepr> for Placement {
    fn from(repr: PlacementRepr) -> Self {
        match repr {
            PlacementRepr::Plain(x, y, z, t) => Self::new(GridPosition::new(x, y, z), 0, t),
            PlacementRepr::Rotated(x, y, z, r, t) => Self::new(GridPosition::new(x, y, z), r, t),
        }
    }
}

impl From<Placement> for PlacementRepr {
    fn from(p: Placement) -> Self {
        let GridPosition { x, y, z } = p.position;
        if p.rotation == 0 {
            Self::Plain(x, y, z, p.block_type)
        } else {
            Self::Rotated(x, y, z, p.rotation, p.block_type)
        }
    }
}

/// A named puzzle: a start layout and the layout to reach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Script the editor starts from when the challenge is opened.
    #[serde(default)]
    pub sample: String,

    #[serde(default = "default_floor_level")]
    pub floor_level: i32,

    /// Block footprints `[width, depth]` by type name.
    pub block_types: BTreeMap<String, [i32; 2]>,

    pub start: Vec<Placement>,

    pub goal: Vec<Placement>,
}

impl ChallengeDefinition {
    /// An empty challenge on the default floor level.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sample: String::new(),
            floor_level: DEFAULT_FLOOR_LEVEL,
            block_types: BTreeMap::new(),
            start: Vec::new(),
            goal: Vec::new(),
        }
    }

    /// Registers a block type (builder pattern).
    pub fn with_block_type(mut self, name: impl Into<String>, width: i32, depth: i32) -> Self {
        self.block_types.insert(name.into(), [width, depth]);
        self
    }

    /// Sets the starting script shown to the user.
    pub fn with_sample(mut self, script: impl Into<String>) -> Self {
        self.sample = script.into();
        self
    }

    /// Adds a block to the start layout.
    pub fn with_start(mut self, placement: Placement) -> Self {
        self.start.push(placement);
        self
    }

    /// Adds a block to the layout to reach.
    pub fn with_goal(mut self, placement: Placement) -> Self {
        self.goal.push(placement);
        self
    }

    /// Parses and validates a single challenge document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let definition: Self = toml::from_str(input)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Looks up a block type; its sides must span 1..=[`MAX_BLOCK_EXTENT`] cells.
    pub fn block_type(&self, name: &str) -> Result<BlockType> {
        let &[width, depth] = self.block_types.get(name).ok_or_else(|| {
            RobotError::UnknownBlockType {
                name: name.to_string(),
            }
        })?;

        let extent = 1..=MAX_BLOCK_EXTENT;
        if !extent.contains(&width) || !extent.contains(&depth) {
            return Err(RobotError::Config(format!(
                "block type `{name}` of challenge `{}` is {width} x {depth} cells, \
                 each side must be 1..={MAX_BLOCK_EXTENT}",
                self.name
            )));
        }
        Ok(BlockType::new(name, width, depth))
    }

    /// Checks footprints, block type references and that start blocks do not
    /// overlap.
    pub fn validate(&self) -> Result<()> {
        for name in self.block_types.keys() {
            self.block_type(name)?;
        }
        for placement in self.goal.iter() {
            self.block_type(&placement.block_type)?;
        }
        ChallengeRuntimeState::new(self).map(|_| ())
    }

    /// A fresh runtime state for one script run.
    pub fn instantiate(&self) -> Result<ChallengeRuntimeState> {
        ChallengeRuntimeState::new(self)
    }
}

/// All challenges known to the application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeCatalog {
    #[serde(rename = "challenge", default)]
    challenges: Vec<ChallengeDefinition>,
}

impl ChallengeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document with one `[[challenge]]` table per definition.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(input)?;
        for definition in &catalog.challenges {
            definition.validate()?;
        }
        Ok(catalog)
    }

    /// Adds or replaces the definition with the same name.
    pub fn insert(&mut self, definition: ChallengeDefinition) {
        match self
            .challenges
            .iter_mut()
            .find(|c| c.name == definition.name)
        {
            Some(existing) => *existing = definition,
            None => self.challenges.push(definition),
        }
    }

    /// The definition called `name`, or [`RobotError::UnknownChallenge`].
    pub fn get(&self, name: &str) -> Result<&ChallengeDefinition> {
        self.challenges
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RobotError::UnknownChallenge {
                name: name.to_string(),
            })
    }

    /// Challenge names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.challenges.iter().map(|c| c.name.as_str())
    }

    /// Number of known challenges.
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// True when no challenge was loaded.
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

/// Which challenges were solved in this session. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    solved: BTreeSet<String>,
    required: usize,
}

impl Default for ChallengeProgress {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_CHALLENGES)
    }
}

impl ChallengeProgress {
    /// Empty progress that completes after `required` distinct challenges.
    pub fn new(required: usize) -> Self {
        Self {
            solved: BTreeSet::new(),
            required,
        }
    }

    /// Marks `name` solved and returns how many distinct challenges are solved.
    pub fn record(&mut self, name: &str) -> usize {
        self.solved.insert(name.to_string());
        self.solved.len()
    }

    /// Whether `name` was solved at least once.
    pub fn is_solved(&self, name: &str) -> bool {
        self.solved.contains(name)
    }

    /// Number of distinct challenges solved so far.
    pub fn solved(&self) -> usize {
        self.solved.len()
    }

    /// How many distinct challenges complete the session.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Enough challenges solved to finish the session.
    pub fn is_complete(&self) -> bool {
        self.solved.len() >= self.required
    }

    /// Forgets every solved challenge.
    pub fn clear(&mut self) {
        self.solved.clear();
    }
}
