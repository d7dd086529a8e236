//! The seam to the physical arm.
//!
//! The transport (serial link, command queue, flushing) lives behind
//! [`Actuator`]; this crate only issues blocking calls in the arm frame.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RobotError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ActuatorError(pub String);

impl From<ActuatorError> for RobotError {
    fn from(err: ActuatorError) -> Self {
        RobotError::Actuator(err.0)
    }
}

/// Blocking interface to the arm. Coordinates are millimetres in the arm
/// frame, angles are servo degrees.
pub trait Actuator {
    /// Move horizontally, keeping the current height.
    fn move_xy(&mut self, x_mm: f64, y_mm: f64) -> Result<(), ActuatorError>;

    /// Move vertically, keeping the current horizontal position.
    fn move_z(&mut self, z_mm: f64) -> Result<(), ActuatorError>;

    /// Turn the wrist servo to an absolute angle.
    fn set_wrist(&mut self, angle_deg: f64) -> Result<(), ActuatorError>;

    /// Switch the suction pump.
    fn pump(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Drive the arm to its mechanical home position.
    fn reset(&mut self) -> Result<(), ActuatorError>;

    /// Where the arm reports itself to be.
    fn current_pose(&self) -> Result<DVec3, ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn move_xy(&mut self, x_mm: f64, y_mm: f64) -> Result<(), ActuatorError> {
        (**self).move_xy(x_mm, y_mm)
    }

    fn move_z(&mut self, z_mm: f64) -> Result<(), ActuatorError> {
        (**self).move_z(z_mm)
    }

    fn set_wrist(&mut self, angle_deg: f64) -> Result<(), ActuatorError> {
        (**self).set_wrist(angle_deg)
    }

    fn pump(&mut self, on: bool) -> Result<(), ActuatorError> {
        (**self).pump(on)
    }

    fn reset(&mut self) -> Result<(), ActuatorError> {
        (**self).reset()
    }

    fn current_pose(&self) -> Result<DVec3, ActuatorError> {
        (**self).current_pose()
    }
}

/// One call received by a [`RecordingActuator`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActuatorCall {
    MoveXY { x_mm: f64, y_mm: f64 },
    MoveZ { z_mm: f64 },
    SetWrist { angle_deg: f64 },
    Pump { on: bool },
    Reset,
}

/// Actuator without hardware: records every call and tracks the pose.
///
/// Used for dry runs when no arm is connected, and in tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingActuator {
    calls: Vec<ActuatorCall>,
    pose: DVec3,
    wrist: f64,
    pump_on: bool,
    fail_after: Option<usize>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call after the first `calls` fail, to simulate a lost link.
    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[ActuatorCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn wrist(&self) -> f64 {
        self.wrist
    }

    pub fn is_pump_on(&self) -> bool {
        self.pump_on
    }

    fn record(&mut self, call: ActuatorCall) -> Result<(), ActuatorError> {
        if self.fail_after.is_some_and(|limit| self.calls.len() >= limit) {
            return Err(ActuatorError("connection to the arm lost".into()));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn move_xy(&mut self, x_mm: f64, y_mm: f64) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::MoveXY { x_mm, y_mm })?;
        self.pose.x = x_mm;
        self.pose.y = y_mm;
        Ok(())
    }

    fn move_z(&mut self, z_mm: f64) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::MoveZ { z_mm })?;
        self.pose.z = z_mm;
        Ok(())
    }

    fn set_wrist(&mut self, angle_deg: f64) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::SetWrist { angle_deg })?;
        self.wrist = angle_deg;
        Ok(())
    }

    fn pump(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Pump { on })?;
        self.pump_on = on;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Reset)?;
        self.pose = DVec3::ZERO;
        Ok(())
    }

    fn current_pose(&self) -> Result<DVec3, ActuatorError> {
        Ok(self.pose)
    }
}
