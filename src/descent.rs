//! One-dimensional gradient descent on the bell-shaped bowl
//! `J(θ) = 1 − e^{−θ²/2}`.
use crate::error::{LabError, LabResult};
use crate::input::SliderBounds;
use crate::loss::{bell_curve_cost, bell_curve_gradient};
use crate::metrics::History;
use crate::simulation::{Phase, Simulation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const POSITION_BOUNDS: SliderBounds = SliderBounds::new(-3.0, 3.0, 0.1);
pub const LEARNING_RATE_BOUNDS: SliderBounds = SliderBounds::new(0.01, 0.5, 0.01);
pub const CONVERGENCE_RADIUS: f64 = 0.01;
pub const HISTORY_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescentPoint {
    pub epoch: u64,
    pub position: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescentParams {
    pub start_position: f64,
    pub learning_rate: f64,
}

impl Default for DescentParams {
    fn default() -> Self {
        Self {
            start_position: 1.5,
            learning_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DescentSimulator {
    params: DescentParams,
    position: f64,
    epoch: u64,
    phase: Phase,
    history: History<DescentPoint>,
}

impl DescentSimulator {
    pub fn new(params: DescentParams) -> Self {
        Self {
            params,
            position: params.start_position,
            epoch: 0,
            phase: Phase::Idle,
            history: History::new(HISTORY_LEN),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn cost(&self) -> f64 {
        bell_curve_cost(self.position)
    }

    pub fn gradient(&self) -> f64 {
        bell_curve_gradient(self.position)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn learning_rate(&self) -> f64 {
        self.params.learning_rate
    }

    pub fn history(&self) -> &History<DescentPoint> {
        &self.history
    }

    pub fn at_minimum(&self) -> bool {
        self.position.abs() <= CONVERGENCE_RADIUS
    }

    /// Move the ball. Refused while running.
    pub fn set_position(&mut self, position: f64) -> LabResult<()> {
        if self.phase == Phase::Running {
            return Err(LabError::Transition {
                action: "move the starting point",
                phase: self.phase,
            });
        }
        self.position = POSITION_BOUNDS.check(position)?;
        Ok(())
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> LabResult<()> {
        self.params.learning_rate = LEARNING_RATE_BOUNDS.check(learning_rate)?;
        Ok(())
    }
}

impl Default for DescentSimulator {
    fn default() -> Self {
        Self::new(DescentParams::default())
    }
}

impl Simulation for DescentSimulator {
    fn name(&self) -> &'static str {
        "gradient-descent"
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn start(&mut self) -> LabResult<()> {
        if self.at_minimum() {
            return Err(LabError::AtMinimum {
                position: self.position,
            });
        }
        self.phase = self.phase.started()?;
        info!(position = self.position, lr = self.params.learning_rate, "descent started");
        Ok(())
    }

    fn pause(&mut self) {
        self.phase = self.phase.paused();
    }

    fn reset(&mut self) {
        *self = Self::new(self.params);
    }

    fn tick(&mut self) -> Phase {
        if self.phase != Phase::Running {
            return self.phase;
        }
        let grad = bell_curve_gradient(self.position);
        self.position -= self.params.learning_rate * grad;
        self.epoch += 1;
        self.history.push(DescentPoint {
            epoch: self.epoch,
            position: self.position,
            cost: bell_curve_cost(self.position),
        });
        debug!(epoch = self.epoch, position = self.position, grad, "descent tick");
        if self.at_minimum() {
            self.phase = Phase::Converged;
            info!(epoch = self.epoch, position = self.position, "descent converged");
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_ticks_do_nothing() {
        let mut sim = DescentSimulator::default();
        assert_eq!(sim.tick(), Phase::Idle);
        assert_eq!(sim.position(), 1.5);
        assert_eq!(sim.epoch(), 0);
    }

    #[test]
    fn pause_and_resume() {
        let mut sim = DescentSimulator::default();
        sim.start().unwrap();
        sim.tick();
        sim.toggle().unwrap();
        assert_eq!(sim.phase(), Phase::Paused);
        let frozen = sim.position();
        sim.tick();
        assert_eq!(sim.position(), frozen);
        sim.toggle().unwrap();
        assert_eq!(sim.phase(), Phase::Running);
    }

    #[test]
    fn cannot_move_ball_while_running() {
        let mut sim = DescentSimulator::default();
        sim.start().unwrap();
        assert!(sim.set_position(-1.0).is_err());
        sim.pause();
        sim.set_position(-1.0).unwrap();
        assert!(sim.set_position(4.0).is_err());
        assert_eq!(sim.position(), -1.0);
    }

    #[test]
    fn start_refused_at_minimum() {
        let mut sim = DescentSimulator::new(DescentParams {
            start_position: 0.005,
            ..DescentParams::default()
        });
        let err = sim.start().unwrap_err();
        assert!(matches!(err, LabError::AtMinimum { position } if position == 0.005));
        assert!(err.to_string().starts_with("already at the minimum"));
        assert_eq!(sim.phase(), Phase::Idle);
    }

    #[test]
    fn history_is_bounded() {
        let mut sim = DescentSimulator::new(DescentParams {
            start_position: 3.0,
            learning_rate: 0.01,
        });
        sim.start().unwrap();
        for _ in 0..120 {
            sim.tick();
        }
        assert_eq!(sim.history().len(), HISTORY_LEN);
        assert_eq!(sim.history().latest().map(|p| p.epoch), Some(120));
    }

    #[test]
    fn reset_restores_start() {
        let mut sim = DescentSimulator::default();
        sim.start().unwrap();
        sim.run(10);
        sim.reset();
        assert_eq!(sim.phase(), Phase::Idle);
        assert_eq!(sim.position(), 1.5);
        assert!(sim.history().is_empty());
    }
}
