//! Phase machine shared by the tick-driven demos.
//!
//! ```text
//! Idle ──start──▶ Running ──pause──▶ Paused ──start──▶ Running
//!                    │
//!                    ├── tick reaches threshold ──▶ Converged
//!                    └── tick fails ─────────────▶ Diverged
//! any ──reset──▶ Idle
//! ```
//!
//! Converged and Diverged are terminal until `reset`.
use crate::error::{LabError, LabResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
    Converged,
    Diverged,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Converged | Phase::Diverged)
    }

    /// Phase after a start request, or the refusal.
    pub fn started(self) -> LabResult<Phase> {
        if self.is_terminal() {
            return Err(LabError::Transition {
                action: "start",
                phase: self,
            });
        }
        Ok(Phase::Running)
    }

    /// Pausing anything but a running simulation is a no-op.
    pub fn paused(self) -> Phase {
        match self {
            Phase::Running => Phase::Paused,
            other => other,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Paused => "paused",
            Phase::Converged => "converged",
            Phase::Diverged => "diverged",
        };
        f.write_str(s)
    }
}

/// A demo advanced by a fixed-interval timer.
pub trait Simulation {
    fn name(&self) -> &'static str;

    fn phase(&self) -> Phase;

    /// Enter Running. Guarded; see [`Phase::started`].
    fn start(&mut self) -> LabResult<()>;

    fn pause(&mut self);

    /// Back to Idle with the initial parameters; clears history.
    fn reset(&mut self);

    /// Advance one step. Does nothing unless Running.
    fn tick(&mut self) -> Phase;

    fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// The start/pause button.
    fn toggle(&mut self) -> LabResult<()> {
        if self.is_running() {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Tick until the simulation leaves Running or `max_ticks` elapse.
    /// Returns the number of ticks applied.
    fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while self.is_running() && ticks < max_ticks {
            self.tick();
            ticks += 1;
        }
        if self.is_running() {
            info!(sim = self.name(), ticks, "tick budget exhausted");
        }
        ticks
    }
}
