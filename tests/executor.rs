// tests/executor.rs
use arm_script::{
    Actuator, ActuatorCall, ActuatorError, CancelToken, ChallengeDefinition, ErrorKind,
    ExecutorConfig, GridPosition, Placement, RecordingActuator, RunState, ScriptExecutor,
    WorkspaceConfig,
};
use glam::DVec3;

const PICK_AND_PLACE: &str =
    "position(3,4);hoehe(1);pumpe_an();hoehe(2);position(4,6);hoehe(1);pumpe_aus()";

fn executor() -> ScriptExecutor {
    ScriptExecutor::new(WorkspaceConfig::default(), ExecutorConfig::default()).unwrap()
}

fn at(x: i32, y: i32, z: i32) -> GridPosition {
    GridPosition::new(x, y, z)
}

fn move_one() -> ChallengeDefinition {
    ChallengeDefinition::new("move one")
        .with_block_type("cube", 1, 1)
        .with_start(Placement::new(at(3, 4, 1), 0, "cube"))
        .with_goal(Placement::new(at(4, 6, 1), 0, "cube"))
}

/// Requests a stop as soon as the arm first moves vertically.
struct CancelOnLift {
    inner: RecordingActuator,
    token: CancelToken,
}

impl Actuator for CancelOnLift {
    fn move_xy(&mut self, x_mm: f64, y_mm: f64) -> Result<(), ActuatorError> {
        self.inner.move_xy(x_mm, y_mm)
    }

    fn move_z(&mut self, z_mm: f64) -> Result<(), ActuatorError> {
        self.token.cancel();
        self.inner.move_z(z_mm)
    }

    fn set_wrist(&mut self, angle_deg: f64) -> Result<(), ActuatorError> {
        self.inner.set_wrist(angle_deg)
    }

    fn pump(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.inner.pump(on)
    }

    fn reset(&mut self) -> Result<(), ActuatorError> {
        self.inner.reset()
    }

    fn current_pose(&self) -> Result<DVec3, ActuatorError> {
        self.inner.current_pose()
    }
}

#[test]
fn test_pick_and_place_solves_challenge() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    let mut world = move_one().instantiate().unwrap();

    let report = executor.run_source(PICK_AND_PLACE, &mut arm, Some(&mut world), &CancelToken::new());

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.error, None);
    assert_eq!(report.applied, 7);
    assert_eq!(report.success, Some(true));
    assert!(report.warnings.is_empty());
    assert_eq!(executor.state(), RunState::Completed);

    // Parked at home afterwards.
    assert_eq!(executor.arm().cell, at(3, 8, 2));
    assert_eq!(arm.current_pose().unwrap(), DVec3::new(140.0, 20.0, 80.0));
    assert_eq!(arm.wrist(), 90.0);
}

#[test]
fn test_pick_up_dips_below_the_block() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source(
        "position(3,4)\nhoehe(1)\npumpe_an()",
        &mut arm,
        None,
        &CancelToken::new(),
    );
    assert_eq!(report.state, RunState::Completed);

    let calls = arm.calls();
    let pump = calls
        .iter()
        .position(|c| *c == ActuatorCall::Pump { on: true })
        .unwrap();
    assert_eq!(calls[pump - 1], ActuatorCall::MoveZ { z_mm: 31.0 });
    assert_eq!(calls[pump + 1], ActuatorCall::MoveZ { z_mm: 40.0 });
    // Completed runs leave the pump as the script left it.
    assert!(arm.is_pump_on());
}

#[test]
fn test_unfinished_challenge_reports_no_success() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    let mut world = move_one().instantiate().unwrap();
    let script = PICK_AND_PLACE.trim_end_matches(";pumpe_aus()");

    let report = executor.run_source(script, &mut arm, Some(&mut world), &CancelToken::new());

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.success, Some(false));
    assert!(world.is_holding());
}

#[test]
fn test_free_mode_has_no_verdict() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source(PICK_AND_PLACE, &mut arm, None, &CancelToken::new());

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.success, None);
    assert!(!report.is_success());
}

#[test]
fn test_cancelled_before_start() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = executor.run_source(PICK_AND_PLACE, &mut arm, None, &cancel);

    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(report.applied, 0);
    assert_eq!(report.success, None);
    assert!(arm.calls().is_empty());

    cancel.reset();
    assert!(!cancel.is_cancelled());
}

#[test]
fn test_cancel_takes_effect_between_commands() {
    let mut executor = executor();
    let token = CancelToken::new();
    let mut arm = CancelOnLift {
        inner: RecordingActuator::new(),
        token: token.clone(),
    };

    let report = executor.run_source(
        "position(3,4)\nhoehe(1)\npumpe_an()\nhoehe(2)",
        &mut arm,
        None,
        &token,
    );

    // hoehe(1) runs to the end, pumpe_an() never starts.
    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(report.applied, 2);
    assert!(!arm.inner.calls().contains(&ActuatorCall::Pump { on: true }));
}

#[test]
fn test_mid_air_release_fails_the_run() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    let mut world = move_one().instantiate().unwrap();

    let report = executor.run_source(
        "position(3,4)\nhoehe(1)\npumpe_an()\nhoehe(2)\nposition(6,6)\npumpe_aus()",
        &mut arm,
        Some(&mut world),
        &CancelToken::new(),
    );

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::MidAirRelease));
    assert_eq!(report.applied, 5);
    assert_eq!(report.success, None);
    // The failed release leaves the block in the gripper.
    assert!(world.is_holding());
    assert!(world.blocks().next().is_none());
}

#[test]
fn test_unreachable_cell_sends_nothing() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source("position(10,10)\nhoehe(1)", &mut arm, None, &CancelToken::new());

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(
        report.error.map(|e| e.kind()),
        Some(ErrorKind::UnreachablePosition)
    );
    assert_eq!(report.applied, 0);
    assert!(arm.calls().is_empty());
    assert_eq!(executor.arm().cell, at(3, 8, 2));
}

#[test]
fn test_rejected_scripts_never_start() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source("position(3,4)\nhoehe(", &mut arm, None, &CancelToken::new());
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.error.as_ref().and_then(|e| e.line()), Some(2));
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::Syntax));

    let report = executor.run_source(" \n\n", &mut arm, None, &CancelToken::new());
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::EmptyScript));

    assert!(arm.calls().is_empty());
    assert_eq!(executor.state(), RunState::Failed);
}

#[test]
fn test_gripping_nothing_fails() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    let mut world = move_one().instantiate().unwrap();

    let report = executor.run_source(
        "hoehe(1)\npumpe_an()",
        &mut arm,
        Some(&mut world),
        &CancelToken::new(),
    );

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::EmptyGrip));
    assert_eq!(report.applied, 1);
    assert!(!world.is_holding());
}

#[test]
fn test_lost_link_fails_the_run() {
    let mut executor = executor();
    let mut arm = RecordingActuator::failing_after(1);

    let report = executor.run_source("position(3,4)", &mut arm, None, &CancelToken::new());

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::Actuator));
    assert_eq!(report.applied, 0);
}

#[test]
fn test_wrist_limit_is_a_warning() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source(
        "drehen(-70)\nposition(3,4)",
        &mut arm,
        None,
        &CancelToken::new(),
    );

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind(), ErrorKind::WristLimitExceeded);
    assert!(arm.calls().contains(&ActuatorCall::SetWrist { angle_deg: 12.0 }));
}

#[test]
fn test_turning_a_held_plank() {
    let script = "position(3,4)\nhoehe(1)\npumpe_an()\ndrehen(90)\nhoehe(2)\nposition(4,6)\nhoehe(1)\npumpe_aus()";

    for goal_rotation in [90, 270] {
        let challenge = ChallengeDefinition::new("turn")
            .with_block_type("plank", 2, 1)
            .with_start(Placement::new(at(3, 4, 1), 0, "plank"))
            .with_goal(Placement::new(at(4, 6, 1), goal_rotation, "plank"));
        let mut world = challenge.instantiate().unwrap();
        let mut executor = executor();
        let mut arm = RecordingActuator::new();

        let report = executor.run_source(script, &mut arm, Some(&mut world), &CancelToken::new());

        assert_eq!(report.state, RunState::Completed, "{report:?}");
        assert_eq!(report.success, Some(true));
        let plank = world.block_at(at(4, 7, 1)).unwrap();
        assert_eq!(plank.rotation(), 90);
    }
}

#[test]
fn test_diagnostics() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    let report = executor.run_source("diagnose(0)", &mut arm, None, &CancelToken::new());
    assert_eq!(report.state, RunState::Completed);
    assert!(arm.calls().contains(&ActuatorCall::SetWrist { angle_deg: 12.0 }));
    assert!(arm.calls().contains(&ActuatorCall::SetWrist { angle_deg: 162.0 }));

    let report = executor.run_source("diagnose(1)\ndiagnose()", &mut arm, None, &CancelToken::new());
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.applied, 2);

    let report = executor.run_source("diagnose(7)", &mut arm, None, &CancelToken::new());
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.error.map(|e| e.kind()), Some(ErrorKind::InvalidArgument));
}

#[test]
fn test_home_resets_and_parks() {
    let mut executor = executor();
    let mut arm = RecordingActuator::new();
    arm.pump(true).unwrap();
    arm.clear();

    executor.home(&mut arm).unwrap();

    assert_eq!(arm.calls()[0], ActuatorCall::Reset);
    assert_eq!(arm.calls()[1], ActuatorCall::Pump { on: false });
    assert!(!arm.is_pump_on());
    assert_eq!(arm.current_pose().unwrap(), DVec3::new(140.0, 20.0, 80.0));
}

#[test]
fn test_home_must_be_reachable() {
    let config = ExecutorConfig {
        home: at(10, 10, 2),
        ..ExecutorConfig::default()
    };

    let err = ScriptExecutor::new(WorkspaceConfig::default(), config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreachablePosition);
}

fn plank_challenge(start: GridPosition, goal: GridPosition) -> ChallengeDefinition {
    ChallengeDefinition::new("plank")
        .with_block_type("plank", 2, 1)
        .with_start(Placement::new(start, 0, "plank"))
        .with_goal(Placement::new(goal, 0, "plank"))
}

#[test]
fn test_centring_the_wrist_turns_the_held_block_back() {
    let mut world = plank_challenge(at(7, 7, 1), at(7, 7, 1)).instantiate().unwrap();
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    // drehen(70) turns the plank a quarter, diagnose() turns the wrist back.
    let report = executor.run_source(
        "position(7,7);hoehe(1);pumpe_an();drehen(70);diagnose();pumpe_aus()",
        &mut arm,
        Some(&mut world),
        &CancelToken::new(),
    );

    assert_eq!(report.state, RunState::Completed, "{report:?}");
    assert_eq!(world.block_at(at(7, 7, 1)).map(|b| b.rotation()), Some(0));
    assert_eq!(report.success, Some(true));
}

#[test]
fn test_held_block_follows_a_clamped_wrist() {
    let mut world = plank_challenge(at(3, 12, 1), at(6, 5, 1)).instantiate().unwrap();
    let mut executor = executor();
    let mut arm = RecordingActuator::new();

    // After drehen(-120) the wrist sits at about 22°. The move to (6, 5)
    // would need about -51°, so the wrist stops at 12° and the plank is
    // dragged round by a further quarter turn.
    let report = executor.run_source(
        "position(3,12)\nhoehe(1)\npumpe_an()\ndrehen(-120)\nhoehe(2)\nposition(6,5)\nhoehe(1)\npumpe_aus()",
        &mut arm,
        Some(&mut world),
        &CancelToken::new(),
    );

    assert_eq!(report.state, RunState::Completed, "{report:?}");
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind(), ErrorKind::WristLimitExceeded);

    let plank = world.block_at(at(6, 5, 1)).unwrap();
    assert_eq!(plank.rotation(), 0);
    assert!(world.block_at(at(7, 5, 1)).is_some());
    assert_eq!(report.success, Some(true));
}
