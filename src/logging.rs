//! Per-run log context.
//!
//! Each script run carries its own [`RunLog`] instead of process-wide print
//! toggles. Messages go through the [`log`] facade under the `arm_script`
//! target, so the embedding application decides where they end up.

use serde::{Deserialize, Serialize};

const TARGET: &str = "arm_script";

/// How chatty a run is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Errors, warnings and run milestones.
    #[default]
    Normal,
    /// Everything, including every actuator call.
    Verbose,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunLog {
    verbosity: Verbosity,
}

impl RunLog {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.verbosity >= Verbosity::Verbose {
            log::debug!(target: TARGET, "{}", msg.as_ref());
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.verbosity >= Verbosity::Normal {
            log::info!(target: TARGET, "{}", msg.as_ref());
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.verbosity >= Verbosity::Normal {
            log::warn!(target: TARGET, "{}", msg.as_ref());
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        log::error!(target: TARGET, "{}", msg.as_ref());
    }
}
