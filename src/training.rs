//! Training dashboard: online gradient descent on the toy network, one
//! epoch per tick.
//!
//! Each tick runs forward pass, cost, backward pass, and a clamped weight
//! update, then checks for convergence. A non-finite cost, a non-finite
//! gradient, or a runaway update halts the run in [`Phase::Diverged`] with a
//! [`TrainingFailure`] describing why. Nothing is retried; the caller resets.
use crate::error::{LabError, LabResult};
use crate::input::{parse_bounded, SliderBounds};
use crate::metrics::{output_accuracy, History};
use crate::simulation::{Phase, Simulation};
use crate::toy::{self, ToyParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Weights {
    pub theta1: f64,
    pub theta2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightGradients {
    pub d_theta1: f64,
    pub d_theta2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub input: f64,
    pub target: f64,
    pub initial_weights: Weights,
    pub learning_rate: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            input: 0.5,
            target: 0.8,
            initial_weights: Weights {
                theta1: 0.5,
                theta2: -0.5,
            },
            learning_rate: 0.1,
        }
    }
}

/// Limits applied while training. The defaults reproduce the course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardLimits {
    /// Stop once the epoch's cost falls below this.
    pub convergence_threshold: f64,
    /// Rolling history length.
    pub history_len: usize,
    /// Weights are clamped to `±weight_limit` after each update.
    pub weight_limit: f64,
    /// The input is clamped to `±input_limit` before the forward pass.
    pub input_limit: f64,
    /// Largest `|η·∂J/∂θ|` accepted in one epoch.
    pub max_weight_step: f64,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self {
            convergence_threshold: 1e-4,
            history_len: 100,
            weight_limit: 10.0,
            input_limit: 10.0,
            max_weight_step: 1.0,
        }
    }
}

/// Snapshot after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: u64,
    pub weights: Weights,
    pub cost: f64,
    pub gradients: WeightGradients,
    pub output: f64,
    pub error: f64,
    pub accuracy: f64,
}

impl TrainingState {
    fn initial(weights: Weights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DivergenceCause {
    NonFiniteCost,
    RunawayStep { step: f64 },
}

/// Why a run halted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrainingFailure {
    Diverged(DivergenceCause),
    /// Gradients or update came out NaN/∞.
    ComputationError,
}

impl TrainingFailure {
    pub fn message(&self) -> &'static str {
        match self {
            TrainingFailure::Diverged(_) => "Training diverged! Adjust parameters and reset.",
            TrainingFailure::ComputationError => {
                "Error in backward pass. Check for extreme parameter values."
            }
        }
    }

    pub fn is_divergence(&self) -> bool {
        matches!(self, TrainingFailure::Diverged(_))
    }
}

impl fmt::Display for TrainingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

/// Advisory shown under the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Insight {
    Failed(TrainingFailure),
    Converged,
    ExplodingGradients,
    SlowConvergence,
    Paused,
    Ready,
}

const EXPLODING_GRADIENT: f64 = 10.0;
const SLOW_COST: f64 = 0.1;
const SLOW_EPOCHS: u64 = 50;

impl Insight {
    pub fn message(&self) -> &'static str {
        match self {
            Insight::Failed(failure) => failure.message(),
            Insight::Converged => "Convergence achieved! The model has learned.",
            Insight::ExplodingGradients => "Exploding gradients! Lower the learning rate or reset.",
            Insight::SlowConvergence => "Convergence is slow. Try increasing the learning rate.",
            Insight::Paused => "Training paused. Press Start to resume.",
            Insight::Ready => "Ready to train. Adjust parameters and press Start.",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Insight::Failed(_) | Insight::ExplodingGradients => Severity::Danger,
            Insight::Converged => Severity::Success,
            Insight::SlowConvergence => Severity::Warning,
            Insight::Paused => Severity::Info,
            Insight::Ready => Severity::Neutral,
        }
    }
}

/// Hyper-parameters editable from the dashboard controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    LearningRate,
    Input,
    Target,
    InitialTheta1,
    InitialTheta2,
}

impl Param {
    /// Write `value` into `params` without checking the slider range.
    pub fn apply(self, params: &mut TrainingParams, value: f64) {
        match self {
            Param::LearningRate => params.learning_rate = value,
            Param::Input => params.input = value,
            Param::Target => params.target = value,
            Param::InitialTheta1 => params.initial_weights.theta1 = value,
            Param::InitialTheta2 => params.initial_weights.theta2 = value,
        }
    }

    pub fn bounds(self) -> SliderBounds {
        match self {
            Param::LearningRate => SliderBounds::new(0.01, 1.0, 0.01),
            Param::Input => SliderBounds::new(-2.0, 2.0, 0.1),
            Param::Target => SliderBounds::new(0.0, 1.0, 0.05),
            Param::InitialTheta1 | Param::InitialTheta2 => SliderBounds::new(-2.0, 2.0, 0.1),
        }
    }
}

impl FromStr for Param {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lr" | "learning_rate" | "eta" => Ok(Param::LearningRate),
            "x" | "input" => Ok(Param::Input),
            "t" | "target" => Ok(Param::Target),
            "theta1" => Ok(Param::InitialTheta1),
            "theta2" => Ok(Param::InitialTheta2),
            _ => Err(LabError::Unknown {
                kind: "parameter",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    params: TrainingParams,
    limits: DashboardLimits,
    phase: Phase,
    failure: Option<TrainingFailure>,
    current: TrainingState,
    history: History<TrainingState>,
}

impl Dashboard {
    pub fn new(params: TrainingParams) -> Self {
        Self::with_limits(params, DashboardLimits::default())
    }

    pub fn with_limits(params: TrainingParams, limits: DashboardLimits) -> Self {
        Self {
            params,
            limits,
            phase: Phase::Idle,
            failure: None,
            current: TrainingState::initial(params.initial_weights),
            history: History::new(limits.history_len),
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn limits(&self) -> &DashboardLimits {
        &self.limits
    }

    pub fn state(&self) -> &TrainingState {
        &self.current
    }

    pub fn history(&self) -> &History<TrainingState> {
        &self.history
    }

    pub fn failure(&self) -> Option<TrainingFailure> {
        self.failure
    }

    /// Change one hyper-parameter. Accepted values reset the run; rejected
    /// ones leave everything as it was.
    pub fn set_param(&mut self, param: Param, value: f64) -> LabResult<()> {
        let value = param.bounds().check(value)?;
        param.apply(&mut self.params, value);
        self.reset();
        Ok(())
    }

    /// Text-field flavour of [`set_param`](Self::set_param).
    pub fn edit_param(&mut self, param: Param, text: &str) -> LabResult<()> {
        let value = parse_bounded(text, param.bounds())?;
        self.set_param(param, value)
    }

    pub fn insight(&self) -> Insight {
        let s = &self.current;
        let running = self.phase == Phase::Running;
        if let Some(failure) = self.failure {
            return Insight::Failed(failure);
        }
        if s.cost < self.limits.convergence_threshold && s.epoch > 0 {
            return Insight::Converged;
        }
        if running
            && (s.gradients.d_theta1.abs() > EXPLODING_GRADIENT
                || s.gradients.d_theta2.abs() > EXPLODING_GRADIENT)
        {
            return Insight::ExplodingGradients;
        }
        if running && s.cost > SLOW_COST && s.epoch > SLOW_EPOCHS {
            return Insight::SlowConvergence;
        }
        if !running && !self.history.is_empty() {
            return Insight::Paused;
        }
        Insight::Ready
    }

    /// One epoch from `self.current`, without committing it.
    ///
    /// The arithmetic is the toy evaluator's; the dashboard adds the input
    /// clamp, the failure checks and the weight clamp around it.
    fn step(&self) -> Result<TrainingState, TrainingFailure> {
        let prev = &self.current;
        let limit = self.limits.input_limit;
        let ev = toy::evaluate(ToyParams {
            input: self.params.input.clamp(-limit, limit),
            theta1: prev.weights.theta1,
            theta2: prev.weights.theta2,
            target: self.params.target,
        });
        if !ev.cost.is_finite() {
            return Err(TrainingFailure::Diverged(DivergenceCause::NonFiniteCost));
        }

        let lr = self.params.learning_rate;
        let next = ev.updated_params(lr);
        if ![ev.d_theta1, ev.d_theta2, next.theta1, next.theta2]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(TrainingFailure::ComputationError);
        }
        let step = (lr * ev.d_theta1).abs().max((lr * ev.d_theta2).abs());
        if step > self.limits.max_weight_step {
            return Err(TrainingFailure::Diverged(DivergenceCause::RunawayStep { step }));
        }

        let limit = self.limits.weight_limit;
        Ok(TrainingState {
            epoch: prev.epoch + 1,
            weights: Weights {
                theta1: next.theta1.clamp(-limit, limit),
                theta2: next.theta2.clamp(-limit, limit),
            },
            cost: ev.cost,
            gradients: WeightGradients {
                d_theta1: ev.d_theta1,
                d_theta2: ev.d_theta2,
            },
            output: ev.y,
            error: ev.error,
            accuracy: output_accuracy(ev.error),
        })
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(TrainingParams::default())
    }
}

impl Simulation for Dashboard {
    fn name(&self) -> &'static str {
        "training-dashboard"
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn start(&mut self) -> LabResult<()> {
        self.phase = self.phase.started()?;
        self.failure = None;
        info!(epoch = self.current.epoch, lr = self.params.learning_rate, "training started");
        Ok(())
    }

    fn pause(&mut self) {
        self.phase = self.phase.paused();
    }

    fn reset(&mut self) {
        *self = Self::with_limits(self.params, self.limits);
        debug!("training reset");
    }

    fn tick(&mut self) -> Phase {
        if self.phase != Phase::Running {
            return self.phase;
        }
        match self.step() {
            Ok(state) => {
                debug!(
                    epoch = state.epoch,
                    cost = state.cost,
                    theta1 = state.weights.theta1,
                    theta2 = state.weights.theta2,
                    "epoch"
                );
                self.current = state;
                self.history.push(state);
                if state.cost < self.limits.convergence_threshold {
                    self.phase = Phase::Converged;
                    info!(epoch = state.epoch, cost = state.cost, "training converged");
                }
            }
            Err(failure) => {
                warn!(epoch = self.current.epoch, ?failure, "training halted");
                self.failure = Some(failure);
                self.phase = Phase::Diverged;
            }
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_dashboard_is_ready() {
        let d = Dashboard::default();
        assert_eq!(d.phase(), Phase::Idle);
        assert_eq!(d.insight(), Insight::Ready);
        assert_eq!(d.state().weights, TrainingParams::default().initial_weights);
    }

    #[test]
    fn epochs_follow_toy_evaluator() {
        let mut d = Dashboard::default();
        d.start().unwrap();
        let mut p = ToyParams {
            input: 0.5,
            theta1: 0.5,
            theta2: -0.5,
            target: 0.8,
        };
        for epoch in 1..=5 {
            d.tick();
            let ev = toy::evaluate(p);
            let s = d.state();
            assert_eq!(s.epoch, epoch);
            assert_eq!(s.cost, ev.cost);
            assert_eq!(s.output, ev.y);
            assert_eq!(s.error, ev.error);
            assert_eq!(s.gradients.d_theta1, ev.d_theta1);
            assert_eq!(s.gradients.d_theta2, ev.d_theta2);
            p = ev.updated_params(0.1);
            assert_eq!(s.weights.theta1, p.theta1);
            assert_eq!(s.weights.theta2, p.theta2);
        }
    }

    #[test]
    fn input_is_clamped_before_evaluation() {
        let mut d = Dashboard::new(TrainingParams {
            input: 1e6,
            learning_rate: 0.01,
            ..TrainingParams::default()
        });
        d.start().unwrap();
        d.tick();
        let ev = toy::evaluate(ToyParams {
            input: 10.0,
            theta1: 0.5,
            theta2: -0.5,
            target: 0.8,
        });
        assert_eq!(d.state().cost, ev.cost);
        assert_eq!(d.state().gradients.d_theta1, ev.d_theta1);
    }

    #[test]
    fn nan_input_is_divergence() {
        let mut d = Dashboard::new(TrainingParams {
            input: f64::NAN,
            ..TrainingParams::default()
        });
        d.start().unwrap();
        assert_eq!(d.tick(), Phase::Diverged);
        assert_eq!(
            d.failure(),
            Some(TrainingFailure::Diverged(DivergenceCause::NonFiniteCost))
        );
    }

    #[test]
    fn pause_shows_paused_insight() {
        let mut d = Dashboard::default();
        d.start().unwrap();
        d.tick();
        d.pause();
        assert_eq!(d.insight(), Insight::Paused);
        assert_eq!(d.insight().severity(), Severity::Info);
    }

    #[test]
    fn non_finite_target_is_divergence() {
        let mut d = Dashboard::new(TrainingParams {
            target: f64::INFINITY,
            ..TrainingParams::default()
        });
        d.start().unwrap();
        assert_eq!(d.tick(), Phase::Diverged);
        assert_eq!(
            d.failure(),
            Some(TrainingFailure::Diverged(DivergenceCause::NonFiniteCost))
        );
        assert_eq!(d.state().epoch, 0);
    }

    #[test]
    fn non_finite_learning_rate_is_computation_error() {
        let mut d = Dashboard::new(TrainingParams {
            learning_rate: f64::NAN,
            ..TrainingParams::default()
        });
        d.start().unwrap();
        d.tick();
        assert_eq!(d.failure(), Some(TrainingFailure::ComputationError));
        assert!(!d.failure().unwrap().is_divergence());
    }

    #[test]
    fn diverged_run_must_be_reset() {
        let mut d = Dashboard::new(TrainingParams {
            learning_rate: 50.0,
            ..TrainingParams::default()
        });
        d.start().unwrap();
        d.tick();
        assert_eq!(d.phase(), Phase::Diverged);
        assert!(d.start().is_err());
        d.reset();
        assert_eq!(d.phase(), Phase::Idle);
        assert_eq!(d.failure(), None);
    }

    #[test]
    fn weights_are_clamped() {
        let limits = DashboardLimits {
            weight_limit: 0.55,
            ..DashboardLimits::default()
        };
        let mut d = Dashboard::with_limits(
            TrainingParams {
                learning_rate: 1.0,
                ..TrainingParams::default()
            },
            limits,
        );
        d.start().unwrap();
        d.run(200);
        assert!(d.state().weights.theta1 <= 0.55);
        assert!(d.state().weights.theta2 <= 0.55);
    }

    #[test]
    fn set_param_validates_and_resets() {
        let mut d = Dashboard::default();
        d.start().unwrap();
        d.run(3);
        assert!(d.set_param(Param::LearningRate, 5.0).is_err());
        assert_eq!(d.state().epoch, 3);
        assert_eq!(d.params().learning_rate, 0.1);

        d.edit_param(Param::Target, "0.5").unwrap();
        assert_eq!(d.params().target, 0.5);
        assert_eq!(d.state().epoch, 0);
        assert_eq!(d.phase(), Phase::Idle);
    }

    #[test]
    fn parses_param_names() {
        assert_eq!("eta".parse::<Param>().unwrap(), Param::LearningRate);
        assert!("gamma".parse::<Param>().is_err());
    }
}
