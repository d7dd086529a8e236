//! Transformations between the user grid frame and the arm frame, workspace
//! limits, and the wrist angle rules that keep a held block's orientation.
//!
//! Every function here is pure; the engine only reads its [`WorkspaceConfig`].

use crate::config::WorkspaceConfig;
use crate::error::{Result, RobotError};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Slack for angles that land on a servo limit up to rounding.
const ANGLE_EPSILON: f64 = 1e-9;

/// Result of a wrist angle computation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WristOutcome {
    /// The wanted angle lies within the servo limits.
    Exact(f64),
    /// No admissible angle existed; the closest servo limit is used instead.
    Clamped { requested: f64, applied: f64 },
}

impl WristOutcome {
    /// The angle to send to the servo.
    pub fn angle(&self) -> f64 {
        match *self {
            Self::Exact(angle) => angle,
            Self::Clamped { applied, .. } => applied,
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Clamped { .. })
    }

    /// The recoverable warning raised by a clamped outcome.
    pub fn warning(&self) -> Option<RobotError> {
        match *self {
            Self::Exact(_) => None,
            Self::Clamped { requested, applied } => {
                Some(RobotError::WristLimitExceeded { requested, applied })
            }
        }
    }
}

/// Workspace geometry for one arm setup.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceGeometry {
    config: WorkspaceConfig,
}

impl WorkspaceGeometry {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Centre of grid cell `(x, y)` in the arm frame, checked at shoulder height.
    ///
    /// `x_mm = (x + 0.5) * edge_length + x_offset`, likewise for `y`.
    pub fn grid_to_world_xy(&self, x: i32, y: i32) -> Result<DVec2> {
        self.grid_to_world_xy_at(x, y, self.config.z_base_offset)
    }

    /// Like [`grid_to_world_xy`](Self::grid_to_world_xy) but checks reachability
    /// at the arm height `z_mm`.
    pub fn grid_to_world_xy_at(&self, x: i32, y: i32, z_mm: f64) -> Result<DVec2> {
        let edge = self.config.edge_length;
        let xy = DVec2::new(
            (x as f64 + 0.5) * edge + self.config.x_offset,
            (y as f64 + 0.5) * edge + self.config.y_offset,
        );

        if !self.is_reachable(xy.extend(z_mm)) {
            return Err(RobotError::UnreachablePosition { x: xy.x, y: xy.y });
        }
        Ok(xy)
    }

    /// Arm height for grid height `z` above the point `xy`.
    pub fn grid_to_world_z(&self, z: i32, xy: DVec2) -> Result<f64> {
        let z_mm = self.config.z_offset + z as f64 * self.config.edge_length;

        if z_mm < self.config.floor_height() || !self.is_reachable(xy.extend(z_mm)) {
            return Err(RobotError::UnreachableHeight { z: z_mm });
        }
        Ok(z_mm)
    }

    /// Whether `point` lies in the toroidal workspace around the shoulder
    /// circle, in front of the base and outside the dead zone.
    pub fn is_reachable(&self, point: DVec3) -> bool {
        let c = &self.config;
        let xy_length = point.x.hypot(point.y);
        let xy_radius = (xy_length - c.xy_base_offset).abs();
        let z_radius = (point.z - c.z_base_offset).abs();
        let radius = xy_radius.hypot(z_radius);

        radius <= c.max_radius_xy - c.xy_base_offset
            && point.x >= 0.0
            && xy_length > c.min_radius_xy
    }

    /// Wrist angle after moving from `old` to `new` so that a held object
    /// keeps its orientation in the arm frame.
    pub fn wrist_for_move(&self, current_angle: f64, old: DVec2, new: DVec2) -> WristOutcome {
        self.choose_best_rotation(current_angle, bearing_delta(old, new))
    }

    /// Picks the servo angle realising a rotation of `delta` degrees.
    ///
    /// Candidates are `current + delta` and `current + delta - 180`; the first
    /// one within the servo limits wins. Otherwise the limit closest to either
    /// candidate is returned as [`WristOutcome::Clamped`].
    pub fn choose_best_rotation(&self, current_angle: f64, delta: f64) -> WristOutcome {
        let target = current_angle + delta;
        self.first_admissible(&[target, target - 180.0])
    }

    /// Servo angle for an explicit relative turn of `degrees`.
    ///
    /// The gripper looks the same after half a turn, so `target ± 180` are
    /// accepted when `target` itself is out of range.
    pub fn rotate_wrist(&self, current_angle: f64, degrees: f64) -> WristOutcome {
        let target = current_angle + degrees;
        self.first_admissible(&[target, target - 180.0, target + 180.0])
    }

    /// Wrist angle to take before gripping at `xy`.
    ///
    /// Keeps the wrist offset from the base bearing at the middle of the servo
    /// range, leaving the most room for later orientation-preserving moves.
    pub fn pre_grip_angle(&self, xy: DVec2) -> f64 {
        let angle = self.config.wrist_center() + bearing_deg(xy);
        angle.clamp(self.config.wrist_low(), self.config.wrist_high())
    }

    pub fn wrist_in_limits(&self, angle: f64) -> bool {
        (self.config.wrist_low()..=self.config.wrist_high()).contains(&angle)
    }

    fn first_admissible(&self, candidates: &[f64]) -> WristOutcome {
        let (low, high) = (self.config.wrist_low(), self.config.wrist_high());
        if let Some(&angle) = candidates
            .iter()
            .find(|&&a| a >= low - ANGLE_EPSILON && a <= high + ANGLE_EPSILON)
        {
            return WristOutcome::Exact(angle.clamp(low, high));
        }

        let requested = candidates[0];
        let distance = |limit: f64| {
            candidates
                .iter()
                .map(|c| (c - limit).abs())
                .fold(f64::INFINITY, f64::min)
        };
        let applied = if distance(low) <= distance(high) { low } else { high };

        WristOutcome::Clamped { requested, applied }
    }
}

/// Bearing of `xy` seen from the arm base, in degrees.
pub fn bearing_deg(xy: DVec2) -> f64 {
    xy.y.atan2(xy.x).to_degrees()
}

/// Change of bearing from `old` to `new`, reduced into (-90°, 90°].
pub fn bearing_delta(old: DVec2, new: DVec2) -> f64 {
    let delta = (bearing_deg(new) - bearing_deg(old)).rem_euclid(180.0);
    if delta > 90.0 { delta - 180.0 } else { delta }
}
