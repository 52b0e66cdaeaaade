//! Activation functions shared by every demo.
//!
//! The free functions [`sigmoid`] and [`sigmoid_slope`] are the arithmetic
//! kernel behind the toy, multi-layer, and dashboard evaluators. The
//! [`Activation`] trait objects serve the configurable feed-forward
//! visualizer, where the activation is picked at runtime.
use crate::error::LabError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Pre-activation magnitude the visualizer feeds into `exp`/`tanh`.
pub const ACTIVATION_INPUT_LIMIT: f64 = 100.0;

/// `σ(z) = 1 / (1 + e^{-z})`, unguarded.
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// `σ'(z)` expressed through the activation `a = σ(z)`: `a·(1 − a)`.
pub fn sigmoid_slope(a: f64) -> f64 {
    a * (1.0 - a)
}

/// Trait for activation functions.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
    fn apply_vec(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.apply(xi)).collect()
    }
}

/// ReLU: max(0, x)
#[derive(Debug, Clone, Default)]
pub struct ReLU;

impl Activation for ReLU {
    fn apply(&self, x: f64) -> f64 {
        x.max(0.0)
    }
    fn derivative(&self, x: f64) -> f64 {
        (x > 0.0) as u8 as f64
    }
}

/// Sigmoid with its argument clamped to ±[`ACTIVATION_INPUT_LIMIT`].
#[derive(Debug, Clone, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: f64) -> f64 {
        sigmoid(x.clamp(-ACTIVATION_INPUT_LIMIT, ACTIVATION_INPUT_LIMIT))
    }
    fn derivative(&self, x: f64) -> f64 {
        sigmoid_slope(self.apply(x))
    }
}

/// Tanh, clamped like [`Sigmoid`].
#[derive(Debug, Clone, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, x: f64) -> f64 {
        x.clamp(-ACTIVATION_INPUT_LIMIT, ACTIVATION_INPUT_LIMIT).tanh()
    }
    fn derivative(&self, x: f64) -> f64 {
        let t = self.apply(x);
        1.0 - t * t
    }
}

/// ReLU with a small slope `alpha` below zero.
#[derive(Debug, Clone)]
pub struct LeakyReLU {
    pub alpha: f64,
}

impl Default for LeakyReLU {
    fn default() -> Self {
        Self { alpha: 0.01 }
    }
}

impl Activation for LeakyReLU {
    fn apply(&self, x: f64) -> f64 {
        x.max(self.alpha * x)
    }
    fn derivative(&self, x: f64) -> f64 {
        if x > 0.0 {
            1.0
        } else {
            self.alpha
        }
    }
}

/// Identity; the output layer of a regression net.
#[derive(Debug, Clone, Default)]
pub struct Linear;

impl Activation for Linear {
    fn apply(&self, x: f64) -> f64 {
        x
    }
    fn derivative(&self, _x: f64) -> f64 {
        1.0
    }
}

/// Softmax over a whole layer. Not an [`Activation`]: it has no scalar form.
#[derive(Debug, Clone, Default)]
pub struct Softmax;

impl Softmax {
    pub fn apply_vec(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let max = x.iter().fold(f64::MIN, |a, &b| a.max(b));
        let exps: Vec<f64> = x.iter().map(|&xi| (xi - max).exp()).collect();
        let exp_sum: f64 = exps.iter().sum();
        if !exp_sum.is_finite() || exp_sum <= 0.0 {
            // Fallback to uniform distribution to avoid NaNs
            let n = x.len() as f64;
            return vec![1.0 / n; x.len()];
        }
        exps.into_iter().map(|e| e / exp_sum).collect()
    }
}

/// Activation choices offered by the feed-forward visualizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    #[default]
    Sigmoid,
    Relu,
    Tanh,
    LeakyRelu,
    Linear,
    /// Output layer only; hidden layers fall back to ReLU.
    Softmax,
}

impl ActivationKind {
    pub const ALL: [ActivationKind; 6] = [
        ActivationKind::Sigmoid,
        ActivationKind::Relu,
        ActivationKind::Tanh,
        ActivationKind::LeakyRelu,
        ActivationKind::Linear,
        ActivationKind::Softmax,
    ];

    /// Scalar activation for a hidden layer.
    pub fn hidden(&self) -> Arc<dyn Activation> {
        match self {
            ActivationKind::Sigmoid => Arc::new(Sigmoid),
            ActivationKind::Relu | ActivationKind::Softmax => Arc::new(ReLU),
            ActivationKind::Tanh => Arc::new(Tanh),
            ActivationKind::LeakyRelu => Arc::new(LeakyReLU::default()),
            ActivationKind::Linear => Arc::new(Linear),
        }
    }

    /// Output range, as printed next to a neuron.
    pub fn range(&self) -> &'static str {
        match self {
            ActivationKind::Sigmoid | ActivationKind::Softmax => "[0, 1]",
            ActivationKind::Relu => "[0, ∞)",
            ActivationKind::Tanh => "[-1, 1]",
            ActivationKind::LeakyRelu | ActivationKind::Linear => "(-∞, ∞)",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Relu => "relu",
            ActivationKind::Tanh => "tanh",
            ActivationKind::LeakyRelu => "leaky_relu",
            ActivationKind::Linear => "linear",
            ActivationKind::Softmax => "softmax",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationKind {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ActivationKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| LabError::Unknown {
                kind: "activation",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_half_at_zero() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid_slope(sigmoid(0.0)), 0.25);
    }

    #[test]
    fn clamped_sigmoid_stays_finite() {
        let s = Sigmoid;
        assert_eq!(s.apply(1e6), sigmoid(100.0));
        assert!(s.apply(-1e308).is_finite());
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = Softmax.apply_vec(&[1.0, 2.0, 3.0]);
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn slopes() {
        assert_eq!(Sigmoid.derivative(0.0), 0.25);
        assert_eq!(Tanh.derivative(0.0), 1.0);
        assert_eq!(LeakyReLU::default().derivative(-2.0), 0.01);
        assert_eq!(LeakyReLU::default().apply(-2.0), -0.02);
        assert_eq!(ReLU.derivative(-1.0), 0.0);
    }

    #[test]
    fn softmax_hidden_layers_use_relu() {
        assert_eq!(ActivationKind::Softmax.hidden().apply(-3.0), 0.0);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Leaky-ReLU".parse::<ActivationKind>().unwrap(), ActivationKind::LeakyRelu);
        assert!("swish".parse::<ActivationKind>().is_err());
    }
}
