//! Drives a [`ScriptProgram`] through an [`Actuator`] and records every applied
//! command in the block world.
//!
//! A run goes `Idle → Running → Completed | Aborted | Failed`. Commands are
//! applied strictly in order; the [`CancelToken`] is polled between commands
//! only. A command that fails leaves the block world untouched.

use crate::actuator::Actuator;
use crate::command::{Command, ScriptProgram, Statement};
use crate::config::WorkspaceConfig;
use crate::error::{Result, RobotError};
use crate::geometry::{WorkspaceGeometry, WristOutcome};
use crate::logging::{RunLog, Verbosity};
use crate::world::{ChallengeRuntimeState, GridPosition};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Settings of the executor beyond the workspace geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Grid cell and height the arm parks at.
    pub home: GridPosition,
    /// Extra descent while switching the pump on, so the cup seals on the
    /// block without pushing it during the approach.
    pub pick_up_correction_mm: f64,
    /// Wrist step of the servo sweep diagnostic.
    pub diagnostic_step_deg: f64,
    pub verbosity: Verbosity,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            home: GridPosition::new(3, 8, 2),
            pick_up_correction_mm: -9.0,
            diagnostic_step_deg: 10.0,
            verbosity: Verbosity::Normal,
        }
    }
}

/// Life cycle of a script run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
    Failed,
}

impl RunState {
    /// Whether the run has ended, for better or worse.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

/// Cooperative stop request, shared between the caller and a running script.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the running script to stop before its next command.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous request so the token can be reused.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Where the executor believes the arm is.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmState {
    /// Grid cell and grid height.
    pub cell: GridPosition,
    /// The same position in the arm frame.
    pub pose: DVec3,
    /// Wrist servo angle.
    pub wrist: f64,
}

/// Outcome of one run, handed back to the editor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    pub state: RunState,
    /// `None` when the run had no challenge or did not complete.
    pub success: Option<bool>,
    pub error: Option<RobotError>,
    /// Commands fully applied before the run ended.
    pub applied: usize,
    /// Recovered problems, e.g. a clamped wrist.
    pub warnings: Vec<RobotError>,
}

impl RunReport {
    pub(crate) fn failed(error: RobotError) -> Self {
        Self {
            state: RunState::Failed,
            error: Some(error),
            ..Self::default()
        }
    }

    /// A completed run that solved its challenge.
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Interprets scripts against an actuator and, optionally, a challenge world.
#[derive(Clone, Debug)]
pub struct ScriptExecutor {
    geometry: WorkspaceGeometry,
    config: ExecutorConfig,
    log: RunLog,
    state: RunState,
    arm: ArmState,
}

impl ScriptExecutor {
    /// Fails if the home pose is outside the workspace.
    pub fn new(workspace: WorkspaceConfig, config: ExecutorConfig) -> Result<Self> {
        workspace.validate()?;
        let geometry = WorkspaceGeometry::new(workspace);
        let home = config.home;
        let xy = geometry.grid_to_world_xy(home.x, home.y)?;
        let z = geometry.grid_to_world_z(home.z, xy)?;

        Ok(Self {
            arm: ArmState {
                cell: home,
                pose: xy.extend(z),
                wrist: geometry.config().wrist_center(),
            },
            log: RunLog::new(config.verbosity),
            geometry,
            config,
            state: RunState::Idle,
        })
    }

    pub fn geometry(&self) -> &WorkspaceGeometry {
        &self.geometry
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Last commanded arm position; the home pose between runs.
    pub fn arm(&self) -> &ArmState {
        &self.arm
    }

    /// Replaces the log context for the following runs.
    pub fn set_log(&mut self, log: RunLog) {
        self.log = log;
    }

    /// Parses `source` and runs it. Parse errors and empty scripts fail the run
    /// before any command is sent.
    pub fn run_source<A: Actuator>(
        &mut self,
        source: &str,
        actuator: &mut A,
        world: Option<&mut ChallengeRuntimeState>,
        cancel: &CancelToken,
    ) -> RunReport {
        let program = match ScriptProgram::parse(source) {
            Ok(program) if program.is_empty() => Err(RobotError::EmptyScript),
            other => other,
        };
        match program {
            Ok(program) => self.run(&program, actuator, world, cancel),
            Err(err) => {
                self.log.error(format!("script rejected: {err}"));
                self.state = RunState::Failed;
                RunReport::failed(err)
            }
        }
    }

    /// Runs `program` to the end, a cancellation, or the first failure.
    ///
    /// On completion the arm parks at the home pose and, if a `world` is
    /// given, the challenge verdict is evaluated.
    pub fn run<A: Actuator>(
        &mut self,
        program: &ScriptProgram,
        actuator: &mut A,
        mut world: Option<&mut ChallengeRuntimeState>,
        cancel: &CancelToken,
    ) -> RunReport {
        self.state = RunState::Running;
        let mut report = RunReport {
            state: RunState::Running,
            ..RunReport::default()
        };
        self.log.info(format!(
            "running {} command(s){}",
            program.len(),
            world
                .as_deref()
                .map(|w| format!(" for challenge `{}`", w.name()))
                .unwrap_or_default()
        ));

        for statement in program.statements() {
            if cancel.is_cancelled() {
                self.log
                    .info(format!("stopped after {} command(s)", report.applied));
                return self.finish(report, RunState::Aborted);
            }

            let applied = self.apply(
                statement,
                actuator,
                world.as_deref_mut(),
                &mut report.warnings,
            );
            if let Err(err) = applied {
                self.log.error(format!("line {}: {err}", statement.line));
                report.error = Some(err);
                return self.finish(report, RunState::Failed);
            }
            report.applied += 1;
        }

        if let Err(err) = self.park(actuator) {
            self.log.error(format!("parking failed: {err}"));
            report.error = Some(err);
            return self.finish(report, RunState::Failed);
        }

        report.success = world.map(|w| w.success());
        match report.success {
            Some(true) => self.log.info("challenge solved"),
            Some(false) => self.log.info("challenge not solved yet"),
            None => self.log.info("script finished"),
        }
        self.finish(report, RunState::Completed)
    }

    /// Full reset: mechanical home, pump off, wrist centred, then the home cell.
    pub fn home<A: Actuator>(&mut self, actuator: &mut A) -> Result<()> {
        actuator.reset()?;
        let pose = actuator.current_pose()?;
        self.arm.pose = pose;
        actuator.pump(false)?;
        self.log.debug(format!("reset, arm reports {pose}"));
        self.park(actuator)
    }

    /// Centres the wrist and moves to the home cell and height. Leaves the pump alone.
    fn park<A: Actuator>(&mut self, actuator: &mut A) -> Result<()> {
        let home = self.config.home;
        let wrist = self.geometry.config().wrist_center();
        let xy = self.geometry.grid_to_world_xy(home.x, home.y)?;
        let z = self.geometry.grid_to_world_z(home.z, xy)?;

        actuator.set_wrist(wrist)?;
        actuator.move_xy(xy.x, xy.y)?;
        actuator.move_z(z)?;

        self.arm = ArmState {
            cell: home,
            pose: xy.extend(z),
            wrist,
        };
        Ok(())
    }

    fn finish(&mut self, mut report: RunReport, state: RunState) -> RunReport {
        self.state = state;
        report.state = state;
        report
    }

    /// Applies one command: geometry first, then the actuator, then the
    /// block world.
    fn apply<A: Actuator>(
        &mut self,
        statement: &Statement,
        actuator: &mut A,
        world: Option<&mut ChallengeRuntimeState>,
        warnings: &mut Vec<RobotError>,
    ) -> Result<()> {
        self.log
            .debug(format!("line {}: {:?}", statement.line, statement.command));

        match &statement.command {
            Command::MoveXY { x, y } => {
                let outcome = self.move_to(*x, *y, actuator)?;
                self.note_wrist(outcome, warnings);
                turn_held(world, clamp_drift(outcome))?;
            }

            Command::MoveZ { z } => {
                let z_mm = self.geometry.grid_to_world_z(*z, self.xy())?;
                actuator.move_z(z_mm)?;
                self.arm.cell.z = *z;
                self.arm.pose.z = z_mm;
            }

            Command::PumpOn => {
                let wrist = self.geometry.pre_grip_angle(self.xy());
                let z_mm = self.arm.pose.z;
                actuator.set_wrist(wrist)?;
                self.arm.wrist = wrist;
                actuator.move_z(z_mm + self.config.pick_up_correction_mm)?;
                actuator.pump(true)?;
                actuator.move_z(z_mm)?;

                if let Some(world) = world {
                    let id = world.pump_on(self.arm.cell)?;
                    self.log.debug(format!("picked up block {id}"));
                }
            }

            Command::PumpOff => {
                actuator.pump(false)?;
                if let Some(world) = world {
                    let id = world.pump_off(self.arm.cell)?;
                    self.log.debug(format!("released block {id}"));
                }
            }

            Command::RotateWrist { degrees } => {
                let outcome = self.geometry.rotate_wrist(self.arm.wrist, *degrees as f64);
                actuator.set_wrist(outcome.angle())?;
                let turned = outcome.angle() - self.arm.wrist;
                self.arm.wrist = outcome.angle();
                self.note_wrist(outcome, warnings);
                turn_held(world, snap_to_quarter(turned))?;
            }

            Command::Diagnostic { args } => {
                let turned = self.diagnose(args, statement.line, actuator, warnings)?;
                turn_held(world, turned)?;
            }
        }
        Ok(())
    }

    /// Moves above cell `(x, y)` at the current height, carrying the wrist
    /// along so a held block keeps its orientation.
    fn move_to<A: Actuator>(&mut self, x: i32, y: i32, actuator: &mut A) -> Result<WristOutcome> {
        let xy = self.geometry.grid_to_world_xy_at(x, y, self.arm.pose.z)?;
        let outcome = self.geometry.wrist_for_move(self.arm.wrist, self.xy(), xy);

        actuator.move_xy(xy.x, xy.y)?;
        actuator.set_wrist(outcome.angle())?;

        self.arm.cell.x = x;
        self.arm.cell.y = y;
        self.arm.pose.x = xy.x;
        self.arm.pose.y = xy.y;
        self.arm.wrist = outcome.angle();
        Ok(outcome)
    }

    /// `diagnose()` centres the wrist, `diagnose(0)` sweeps the wrist servo,
    /// `diagnose(1)` visits a block of cells and comes back.
    ///
    /// Returns how far a held block ends up turned, in multiples of 90°. The
    /// block world is only updated once the whole diagnostic succeeded.
    fn diagnose<A: Actuator>(
        &mut self,
        args: &[i32],
        line: usize,
        actuator: &mut A,
        warnings: &mut Vec<RobotError>,
    ) -> Result<i32> {
        let limits = self.geometry.config().servo_three_limit;

        match args.first() {
            None => {
                let center = self.geometry.config().wrist_center();
                actuator.set_wrist(center)?;
                let turned = center - self.arm.wrist;
                self.arm.wrist = center;
                Ok(snap_to_quarter(turned))
            }
            Some(0) => {
                let step = self.config.diagnostic_step_deg.max(1.0);
                let mut angle = limits[0];
                while angle <= limits[1] {
                    self.log.debug(format!("servo sweep at {angle:.0}°"));
                    actuator.set_wrist(angle)?;
                    angle += step;
                }
                actuator.set_wrist(self.arm.wrist)?;
                Ok(0)
            }
            Some(1) => {
                let start = self.arm.cell;
                let mut drift = 0;
                let route = (5..7)
                    .flat_map(|x| (3..12).map(move |y| (x, y)))
                    .chain([(start.x, start.y)]);
                for (x, y) in route {
                    let outcome = self.move_to(x, y, actuator)?;
                    self.note_wrist(outcome, warnings);
                    drift += clamp_drift(outcome);
                }
                Ok(drift)
            }
            Some(mode) => Err(RobotError::InvalidArgument {
                line,
                message: format!("unknown diagnostic mode {mode}"),
            }),
        }
    }

    fn note_wrist(&self, outcome: WristOutcome, warnings: &mut Vec<RobotError>) {
        if let Some(warning) = outcome.warning() {
            self.log.warn(warning.to_string());
            warnings.push(warning);
        }
    }

    fn xy(&self) -> DVec2 {
        self.arm.pose.truncate()
    }
}

/// Rounds an angle to the nearest multiple of 90 degrees.
fn snap_to_quarter(degrees: f64) -> i32 {
    (degrees / 90.0).round() as i32 * 90
}

/// Turn a held block picks up when the wrist cannot follow a move.
fn clamp_drift(outcome: WristOutcome) -> i32 {
    match outcome {
        WristOutcome::Exact(_) => 0,
        WristOutcome::Clamped { requested, applied } => snap_to_quarter(applied - requested),
    }
}

/// Turns the block in the gripper, if there is one, along with the wrist.
fn turn_held(world: Option<&mut ChallengeRuntimeState>, degrees: i32) -> Result<()> {
    if let Some(world) = world
        && degrees != 0
        && world.is_holding()
    {
        world.rotate_held(degrees)?;
    }
    Ok(())
}
