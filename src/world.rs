//! The simulated block world: which cells each block covers, what the gripper
//! holds, and whether a release is supported.

use crate::challenge::{ChallengeDefinition, Placement};
use crate::error::{Result, RobotError};
use glam::{IVec2, IVec3};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A cell in the user grid frame; `z` is the grid height.
pub type GridPosition = IVec3;

/// Identifies a block within one runtime state.
pub type BlockId = u16;

/// A kind of block and its footprint in grid cells.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockType {
    pub name: String,
    /// Extent along X at rotation 0.
    pub width: i32,
    /// Extent along Y at rotation 0.
    pub depth: i32,
}

impl BlockType {
    pub fn new(name: impl Into<String>, width: i32, depth: i32) -> Self {
        Self {
            name: name.into(),
            width,
            depth,
        }
    }

    /// Smallest turn (degrees) that maps the footprint onto itself.
    pub fn symmetry(&self) -> i32 {
        if self.width == self.depth { 90 } else { 180 }
    }

    /// Snaps `degrees` to the grid (multiples of 90) and reduces it modulo
    /// [`symmetry`](Self::symmetry).
    pub fn normalize_rotation(&self, degrees: i32) -> i32 {
        let snapped = (degrees.rem_euclid(360) + 45).div_euclid(90) * 90;
        snapped.rem_euclid(self.symmetry())
    }

    /// Cell offsets from the centre cell at the given rotation.
    ///
    /// Even extents put the extra cell on the positive side.
    pub fn footprint(&self, rotation: i32) -> Vec<IVec2> {
        let (w, d) = if self.normalize_rotation(rotation) % 180 == 90 {
            (self.depth, self.width)
        } else {
            (self.width, self.depth)
        };
        if w <= 0 || d <= 0 {
            return Vec::new();
        }
        let (x0, y0) = (-((w - 1) / 2), -((d - 1) / 2));

        let mut cells = Vec::with_capacity(w.max(0) as usize * d.max(0) as usize);
        for dx in x0..x0 + w {
            for dy in y0..y0 + d {
                cells.push(IVec2::new(dx, dy));
            }
        }
        cells
    }
}

/// A block placed in (or held above) the world.
///
/// The occupied cells are derived from centre, rotation and footprint and are
/// recomputed on every change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    block_type: BlockType,
    center: GridPosition,
    rotation: i32,
    cells: Vec<GridPosition>,
}

impl Block {
    pub fn new(id: BlockId, block_type: BlockType, center: GridPosition, rotation: i32) -> Self {
        let mut block = Self {
            id,
            rotation: block_type.normalize_rotation(rotation),
            block_type,
            center,
            cells: Vec::new(),
        };
        block.refresh_cells();
        block
    }

    /// Index of the block in the start layout.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Type and footprint.
    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    /// The cell the gripper holds the block by.
    pub fn center(&self) -> GridPosition {
        self.center
    }

    /// Rotation in degrees, already reduced by the type's symmetry.
    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    /// Every cell the block covers.
    pub fn cells(&self) -> &[GridPosition] {
        &self.cells
    }

    /// Moves the block; its cells follow.
    pub fn set_center(&mut self, center: GridPosition) {
        self.center = center;
        self.refresh_cells();
    }

    /// Turns the block by `degrees`, snapped to the grid.
    pub fn rotate_by(&mut self, degrees: i32) {
        self.rotation = self
            .block_type
            .normalize_rotation(self.rotation + degrees.rem_euclid(360));
        self.refresh_cells();
    }

    /// Same type, same centre and the same orientation up to symmetry.
    pub fn matches(&self, other: &Block) -> bool {
        self.block_type == other.block_type
            && self.center == other.center
            && self.rotation == other.rotation
    }

    fn refresh_cells(&mut self) {
        let center = self.center;
        self.cells = self
            .block_type
            .footprint(self.rotation)
            .into_iter()
            .map(|offset| center.saturating_add(offset.extend(0)))
            .collect();
    }
}

/// What the suction gripper currently carries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum GripperState {
    #[default]
    Empty,
    Holding(Block),
}

impl GripperState {
    pub fn held(&self) -> Option<&Block> {
        match self {
            Self::Empty => None,
            Self::Holding(block) => Some(block),
        }
    }
}

/// Mutable world of one script run, seeded from a challenge's start layout.
#[derive(Clone, Debug)]
pub struct ChallengeRuntimeState {
    name: String,
    floor_level: i32,
    blocks: HashMap<BlockId, Block>,
    occupancy: HashMap<GridPosition, BlockId>,
    gripper: GripperState,
    goal: Vec<Block>,
}

impl ChallengeRuntimeState {
    /// Fresh state with every start block in place and an empty gripper.
    pub fn new(definition: &ChallengeDefinition) -> Result<Self> {
        let mut state = Self {
            name: definition.name.clone(),
            floor_level: definition.floor_level,
            blocks: HashMap::new(),
            occupancy: HashMap::new(),
            gripper: GripperState::Empty,
            goal: Vec::with_capacity(definition.goal.len()),
        };

        for (id, placement) in definition.start.iter().enumerate() {
            let block = state.block_from(definition, id, placement)?;
            state.insert(block)?;
        }
        for (id, placement) in definition.goal.iter().enumerate() {
            let block = state.block_from(definition, id, placement)?;
            state.goal.push(block);
        }

        Ok(state)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn floor_level(&self) -> i32 {
        self.floor_level
    }

    pub fn gripper(&self) -> &GripperState {
        &self.gripper
    }

    pub fn held(&self) -> Option<&Block> {
        self.gripper.held()
    }

    pub fn is_holding(&self) -> bool {
        self.held().is_some()
    }

    /// Blocks currently lying in the world (the held one excluded).
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_at(&self, position: GridPosition) -> Option<&Block> {
        self.occupancy
            .get(&position)
            .and_then(|id| self.blocks.get(id))
    }

    pub fn is_occupied(&self, position: GridPosition) -> bool {
        self.occupancy.contains_key(&position)
    }

    /// Picks up the block covering `position`.
    pub fn pump_on(&mut self, position: GridPosition) -> Result<BlockId> {
        if self.is_holding() {
            return Err(RobotError::GripperBusy);
        }
        let id = *self
            .occupancy
            .get(&position)
            .ok_or(RobotError::EmptyGrip { position })?;

        let block = self.remove(id).ok_or(RobotError::EmptyGrip { position })?;
        self.gripper = GripperState::Holding(block);
        Ok(id)
    }

    /// Puts the held block down centred on `position`.
    ///
    /// The release must rest on the floor, on the block right below
    /// `position`, or bridge at least two occupied cells below its footprint.
    /// On failure the gripper keeps the block.
    pub fn pump_off(&mut self, position: GridPosition) -> Result<BlockId> {
        let GripperState::Holding(held) = &self.gripper else {
            return Err(RobotError::NotHolding);
        };

        let on_floor = position.z <= self.floor_level;
        let mut placed = held.clone();
        placed.set_center(if on_floor {
            position.with_z(self.floor_level)
        } else {
            position
        });

        if let Some(&cell) = placed.cells().iter().find(|&&c| self.is_occupied(c)) {
            return Err(RobotError::CellOccupied { position: cell });
        }

        if !on_floor {
            let single = self.is_occupied(position.saturating_sub(IVec3::Z));
            let bridged = placed
                .cells()
                .iter()
                .filter(|&&c| self.is_occupied(c.saturating_sub(IVec3::Z)))
                .count()
                >= 2;
            if !single && !bridged {
                return Err(RobotError::MidAirRelease { position });
            }
        }

        let id = placed.id();
        self.gripper = GripperState::Empty;
        self.insert(placed)?;
        Ok(id)
    }

    /// Turns the held block; returns its new rotation.
    pub fn rotate_held(&mut self, degrees: i32) -> Result<i32> {
        match &mut self.gripper {
            GripperState::Holding(block) => {
                block.rotate_by(degrees);
                Ok(block.rotation())
            }
            GripperState::Empty => Err(RobotError::NotHolding),
        }
    }

    /// Whether every goal block is matched by a distinct block in the world.
    pub fn success(&self) -> bool {
        let mut used = HashSet::new();
        self.goal.iter().all(|goal| {
            let found = self
                .blocks
                .values()
                .find(|b| !used.contains(&b.id()) && b.matches(goal));
            match found {
                Some(block) => used.insert(block.id()),
                None => false,
            }
        })
    }

    fn block_from(
        &self,
        definition: &ChallengeDefinition,
        index: usize,
        placement: &Placement,
    ) -> Result<Block> {
        let block_type = definition.block_type(&placement.block_type)?;
        let id = BlockId::try_from(index)
            .map_err(|_| RobotError::Config(format!("too many blocks in `{}`", self.name)))?;
        Ok(Block::new(
            id,
            block_type,
            placement.position,
            placement.rotation,
        ))
    }

    fn insert(&mut self, block: Block) -> Result<()> {
        if let Some(&cell) = block.cells().iter().find(|&&c| self.is_occupied(c)) {
            return Err(RobotError::CellOccupied { position: cell });
        }
        for &cell in block.cells() {
            self.occupancy.insert(cell, block.id());
        }
        self.blocks.insert(block.id(), block);
        Ok(())
    }

    fn remove(&mut self, id: BlockId) -> Option<Block> {
        let block = self.blocks.remove(&id)?;
        for cell in block.cells() {
            self.occupancy.remove(cell);
        }
        Some(block)
    }
}
