//! The 1-1-1 toy network: one input, one sigmoid unit, one output.
//!
//! ```text
//! x ──θ₁──▶ z = θ₁·x + θ₂ ──σ──▶ y ──▶ J = ½(y − t)²
//! ```
//!
//! Gradients come from the chain rule:
//! `∂J/∂θ₁ = (y − t)·y(1 − y)·x`, `∂J/∂θ₂ = (y − t)·y(1 − y)`.
use crate::activations::{sigmoid, sigmoid_slope};
use crate::input::SliderBounds;
use crate::loss::half_squared_error;
use serde::{Deserialize, Serialize};

pub const INPUT_BOUNDS: SliderBounds = SliderBounds::new(-2.0, 2.0, 0.01);
pub const THETA1_BOUNDS: SliderBounds = SliderBounds::new(-3.0, 3.0, 0.01);
pub const THETA2_BOUNDS: SliderBounds = SliderBounds::new(-2.0, 2.0, 0.01);
pub const TARGET_BOUNDS: SliderBounds = SliderBounds::new(0.0, 1.0, 0.01);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyParams {
    pub input: f64,
    pub theta1: f64,
    pub theta2: f64,
    pub target: f64,
}

impl Default for ToyParams {
    fn default() -> Self {
        Self {
            input: 1.0,
            theta1: 0.5,
            theta2: -0.3,
            target: 0.8,
        }
    }
}

/// Every intermediate value of one forward and backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToyEvaluation {
    pub params: ToyParams,
    pub z: f64,
    pub a: f64,
    pub y: f64,
    pub error: f64,
    pub cost: f64,
    pub d_theta1: f64,
    pub d_theta2: f64,
}

/// The four factors of the toy network's chain rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainRule {
    /// `∂J/∂y = y − t`
    pub dj_dy: f64,
    /// `∂y/∂z = y(1 − y)`
    pub dy_dz: f64,
    /// `∂z/∂θ₁ = x`
    pub dz_dtheta1: f64,
    /// `∂z/∂θ₂ = 1`
    pub dz_dtheta2: f64,
}

/// One numbered line of the forward-propagation walkthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationStep {
    pub title: String,
    pub equation: String,
    pub calculation: String,
}

pub fn evaluate(params: ToyParams) -> ToyEvaluation {
    let ToyParams {
        input,
        theta1,
        theta2,
        target,
    } = params;
    let z = theta1 * input + theta2;
    let a = sigmoid(z);
    let y = a;
    let error = y - target;
    let cost = half_squared_error(y, target);
    let delta = error * sigmoid_slope(y);
    ToyEvaluation {
        params,
        z,
        a,
        y,
        error,
        cost,
        d_theta1: delta * input,
        d_theta2: delta,
    }
}

/// Central finite-difference estimate of `(∂J/∂θ₁, ∂J/∂θ₂)`.
pub fn numerical_gradient(params: ToyParams, eps: f64) -> (f64, f64) {
    let cost_at = |p: ToyParams| evaluate(p).cost;
    let d1 = (cost_at(ToyParams { theta1: params.theta1 + eps, ..params })
        - cost_at(ToyParams { theta1: params.theta1 - eps, ..params }))
        / (2.0 * eps);
    let d2 = (cost_at(ToyParams { theta2: params.theta2 + eps, ..params })
        - cost_at(ToyParams { theta2: params.theta2 - eps, ..params }))
        / (2.0 * eps);
    (d1, d2)
}

impl ToyEvaluation {
    pub fn chain_rule(&self) -> ChainRule {
        ChainRule {
            dj_dy: self.error,
            dy_dz: sigmoid_slope(self.y),
            dz_dtheta1: self.params.input,
            dz_dtheta2: 1.0,
        }
    }

    /// Parameters after one gradient-descent step of size `learning_rate`.
    pub fn updated_params(&self, learning_rate: f64) -> ToyParams {
        ToyParams {
            theta1: self.params.theta1 - learning_rate * self.d_theta1,
            theta2: self.params.theta2 - learning_rate * self.d_theta2,
            ..self.params
        }
    }

    pub fn forward_steps(&self) -> Vec<DerivationStep> {
        let p = &self.params;
        vec![
            DerivationStep {
                title: "Step 1: Linear Combination".into(),
                equation: r"z^{(2)} = \theta_1 x + \theta_2".into(),
                calculation: format!(
                    "z⁽²⁾ = {:.3} × {:.3} + {:.3} = {:.4}",
                    p.theta1, p.input, p.theta2, self.z
                ),
            },
            DerivationStep {
                title: "Step 2: Sigmoid Activation".into(),
                equation: r"y = a^{(2)} = \sigma(z^{(2)}) = \frac{1}{1 + e^{-z^{(2)}}}".into(),
                calculation: format!("y = σ({:.4}) = {:.4}", self.z, self.y),
            },
            DerivationStep {
                title: "Step 3: Error".into(),
                equation: r"e = y - t".into(),
                calculation: format!("e = {:.4} - {:.4} = {:.4}", self.y, p.target, self.error),
            },
            DerivationStep {
                title: "Step 4: Cost".into(),
                equation: r"J(\theta) = \frac{1}{2}(y - t)^2".into(),
                calculation: format!("J = ½ × ({:.4})² = {:.4}", self.error, self.cost),
            },
        ]
    }

    /// Backward walkthrough, one line per parameter.
    pub fn backward_steps(&self) -> Vec<DerivationStep> {
        let c = self.chain_rule();
        vec![
            DerivationStep {
                title: "Computing ∂J/∂θ₁".into(),
                equation: r"\frac{\partial J}{\partial \theta_1} = \frac{\partial J}{\partial y} \cdot \frac{\partial y}{\partial z^{(2)}} \cdot \frac{\partial z^{(2)}}{\partial \theta_1}".into(),
                calculation: format!(
                    "∂J/∂θ₁ = {:.4} × {:.4} × {:.4} = {:.6}",
                    c.dj_dy, c.dy_dz, c.dz_dtheta1, self.d_theta1
                ),
            },
            DerivationStep {
                title: "Computing ∂J/∂θ₂".into(),
                equation: r"\frac{\partial J}{\partial \theta_2} = \frac{\partial J}{\partial y} \cdot \frac{\partial y}{\partial z^{(2)}} \cdot 1".into(),
                calculation: format!(
                    "∂J/∂θ₂ = {:.4} × {:.4} × {:.4} = {:.6}",
                    c.dj_dy, c.dy_dz, c.dz_dtheta2, self.d_theta2
                ),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn reference_point() {
        let ev = evaluate(ToyParams::default());
        assert!(close(ev.z, 0.2, 1e-12));
        assert!(close(ev.a, 0.5498, 1e-4));
        assert!(close(ev.cost, 0.0313, 1e-4));
        assert_eq!(ev.y, ev.a);
    }

    #[test]
    fn chain_rule_factors_multiply_to_gradients() {
        let ev = evaluate(ToyParams { input: -1.3, ..ToyParams::default() });
        let c = ev.chain_rule();
        assert!(close(c.dj_dy * c.dy_dz * c.dz_dtheta1, ev.d_theta1, 1e-15));
        assert!(close(c.dj_dy * c.dy_dz * c.dz_dtheta2, ev.d_theta2, 1e-15));
    }

    #[test]
    fn update_step_lowers_cost() {
        let ev = evaluate(ToyParams::default());
        let next = evaluate(ev.updated_params(0.5));
        assert!(next.cost < ev.cost);
        assert_eq!(next.params.input, ev.params.input);
    }

    #[test]
    fn forward_steps_print_substituted_values() {
        let steps = evaluate(ToyParams::default()).forward_steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].calculation, "z⁽²⁾ = 0.500 × 1.000 + -0.300 = 0.2000");
        assert!(steps[1].calculation.ends_with("0.5498"));
    }

    #[test]
    fn extreme_inputs_are_not_guarded() {
        let ev = evaluate(ToyParams { input: f64::NAN, ..ToyParams::default() });
        assert!(ev.cost.is_nan());
    }
}
