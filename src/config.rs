//! Workspace configuration: the user board's placement in the arm frame and
//! the mechanical limits of the arm.

use crate::error::{Result, RobotError};
use serde::{Deserialize, Serialize};

/// Geometry of the board relative to the arm base, in millimetres.
///
/// Loaded once and shared read-only by the geometry engine. The defaults are
/// the values measured on the classroom setup: a 16 × 16 board of 40 mm cells
/// whose centre line runs through the arm base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Side length of one cube / grid cell.
    pub edge_length: f64,
    /// Offset of the grid origin along the arm's X axis.
    pub x_offset: f64,
    /// Offset of the grid origin along the arm's Y axis.
    pub y_offset: f64,
    /// Arm height at grid height 0.
    pub z_offset: f64,
    /// Horizontal distance of the shoulder joint from the base axis.
    /// The reachable region is a torus around this circle.
    pub xy_base_offset: f64,
    /// Height of the shoulder joint.
    pub z_base_offset: f64,
    /// Dead zone around the base.
    pub min_radius_xy: f64,
    /// Outer reach, measured from the base axis.
    pub max_radius_xy: f64,
    /// Lowest height the gripper may be sent to. `None` means `z_offset`.
    pub min_height: Option<f64>,
    /// Hard limits of the wrist servo (servo 3), in degrees.
    pub servo_three_limit: [f64; 2],
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            edge_length: 40.0,
            x_offset: 0.0,
            y_offset: -320.0,
            z_offset: 0.0,
            xy_base_offset: 0.0,
            z_base_offset: 0.0,
            min_radius_xy: 120.0,
            max_radius_xy: 346.0,
            min_height: None,
            // The servo turns 90 ± 78 degrees.
            servo_three_limit: [12.0, 168.0],
        }
    }
}

impl WorkspaceConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that leave no reachable workspace or an inverted wrist range.
    pub fn validate(&self) -> Result<()> {
        if !(self.edge_length > 0.0) {
            return Err(RobotError::Config(format!(
                "edge_length must be positive, got {}",
                self.edge_length
            )));
        }
        if self.min_radius_xy < 0.0 || self.min_radius_xy >= self.max_radius_xy {
            return Err(RobotError::Config(format!(
                "radius range {}..{} is empty",
                self.min_radius_xy, self.max_radius_xy
            )));
        }
        if self.xy_base_offset >= self.max_radius_xy {
            return Err(RobotError::Config(
                "xy_base_offset must be smaller than max_radius_xy".into(),
            ));
        }
        let [low, high] = self.servo_three_limit;
        if !(low < high) {
            return Err(RobotError::Config(format!(
                "servo_three_limit [{low}, {high}] is inverted"
            )));
        }
        Ok(())
    }

    /// Lowest gripper height in mm; `min_height` if set, else `z_offset`.
    pub fn floor_height(&self) -> f64 {
        self.min_height.unwrap_or(self.z_offset)
    }

    /// Lower wrist servo limit, degrees.
    pub fn wrist_low(&self) -> f64 {
        self.servo_three_limit[0]
    }

    /// Upper wrist servo limit, degrees.
    pub fn wrist_high(&self) -> f64 {
        self.servo_three_limit[1]
    }

    /// Middle of the wrist servo range; the neutral wrist pose.
    pub fn wrist_center(&self) -> f64 {
        (self.wrist_low() + self.wrist_high()) / 2.0
    }
}
