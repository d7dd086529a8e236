//! Owns the arm and serialises script runs with the background reset worker.
//!
//! Resetting drives the physical arm home and takes a while, so it runs on
//! its own thread. Only one reset may be in flight, and a script run first
//! waits for it to finish.

use crate::actuator::Actuator;
use crate::challenge::{ChallengeCatalog, ChallengeDefinition, ChallengeProgress};
use crate::error::{Result, RobotError};
use crate::executor::{CancelToken, RunReport, RunState, ScriptExecutor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

struct Rig<A> {
    actuator: A,
    executor: ScriptExecutor,
    /// Whether the arm is known to be at the home pose.
    homed: bool,
}

impl<A: Actuator> Rig<A> {
    fn home(&mut self) -> Result<()> {
        let result = self.executor.home(&mut self.actuator);
        self.homed = result.is_ok();
        result
    }
}

/// Owns an arm and the executor driving it.
///
/// Runs one script at a time. After a failed or aborted run the arm is homed
/// on a background thread, and the next run waits for that reset to finish.
pub struct ArmController<A: Actuator + Send + 'static> {
    rig: Arc<Mutex<Rig<A>>>,
    reset_worker: Option<JoinHandle<Result<()>>>,
}

impl<A: Actuator + Send + 'static> ArmController<A> {
    /// The arm is homed before the first run.
    pub fn new(actuator: A, executor: ScriptExecutor) -> Self {
        Self {
            rig: Arc::new(Mutex::new(Rig {
                actuator,
                executor,
                homed: false,
            })),
            reset_worker: None,
        }
    }

    /// Starts homing the arm in the background.
    ///
    /// Returns `false` without doing anything if a reset is still running.
    pub fn start_reset(&mut self) -> bool {
        if self.is_resetting() {
            return false;
        }
        // Result of a previous, finished reset is superseded.
        let _ = self.wait_for_reset();

        let rig = Arc::clone(&self.rig);
        self.reset_worker = Some(thread::spawn(move || {
            let mut rig = lock(&rig);
            rig.home()
        }));
        true
    }

    /// A background reset is still running.
    pub fn is_resetting(&self) -> bool {
        self.reset_worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Blocks until the in-flight reset is done and returns its result, or
    /// `None` if no reset was started since the last call.
    pub fn wait_for_reset(&mut self) -> Option<Result<()>> {
        let worker = self.reset_worker.take()?;
        Some(worker.join().unwrap_or_else(|_| {
            Err(RobotError::Actuator("reset worker panicked".into()))
        }))
    }

    /// Runs `source`, optionally against a fresh instance of `challenge`.
    ///
    /// A failed or stopped run leaves the arm somewhere in the workspace, so
    /// a background reset is started afterwards.
    pub fn run_script(
        &mut self,
        source: &str,
        challenge: Option<&ChallengeDefinition>,
        cancel: &CancelToken,
    ) -> RunReport {
        let _ = self.wait_for_reset();

        let report = self.run_locked(source, challenge, cancel);
        if matches!(report.state, RunState::Failed | RunState::Aborted) {
            self.start_reset();
        }
        report
    }

    /// Looks `name` up in `catalog`, runs `source` against it and records a
    /// solved challenge in `progress`.
    pub fn run_challenge(
        &mut self,
        source: &str,
        catalog: &ChallengeCatalog,
        name: &str,
        progress: &mut ChallengeProgress,
        cancel: &CancelToken,
    ) -> RunReport {
        let definition = match catalog.get(name) {
            Ok(definition) => definition,
            Err(err) => return RunReport::failed(err),
        };

        let report = self.run_script(source, Some(definition), cancel);
        if report.is_success() {
            progress.record(name);
        }
        report
    }

    /// Gives read access to the actuator, waiting for any running reset.
    pub fn with_actuator<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&lock(&self.rig).actuator)
    }

    /// Life-cycle state of the last run.
    pub fn executor_state(&self) -> RunState {
        lock(&self.rig).executor.state()
    }

    fn run_locked(
        &self,
        source: &str,
        challenge: Option<&ChallengeDefinition>,
        cancel: &CancelToken,
    ) -> RunReport {
        let mut world = match challenge.map(ChallengeDefinition::instantiate).transpose() {
            Ok(world) => world,
            Err(err) => return RunReport::failed(err),
        };

        let mut rig = lock(&self.rig);
        if !rig.homed
            && let Err(err) = rig.home()
        {
            return RunReport::failed(err);
        }

        let Rig {
            actuator, executor, ..
        } = &mut *rig;
        let report = executor.run_source(source, actuator, world.as_mut(), cancel);
        rig.homed = report.state == RunState::Completed;
        report
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
