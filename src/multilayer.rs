//! The fixed 2-2-2 network: two inputs, two sigmoid hidden units, two
//! sigmoid outputs, no biases.
//!
//! Matrices are indexed `[receiving][sending]`: `W1[i][j]` connects input
//! `j` to hidden `i`, `W2[k][i]` connects hidden `i` to output `k`.
//!
//! Gradients are built by listing every path from a weight to the cost and
//! summing the path products. A layer-1 weight reaches the cost through both
//! outputs; a layer-2 weight through exactly one.
use crate::activations::{sigmoid, sigmoid_slope};
use crate::error::{LabError, LabResult};
use crate::input::SliderBounds;
use crate::loss::half_sum_squared_error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub type Matrix2 = [[f64; 2]; 2];

pub const WEIGHT_BOUNDS: SliderBounds = SliderBounds::new(-2.0, 2.0, 0.1);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiLayerParams {
    pub inputs: [f64; 2],
    pub weights_layer1: Matrix2,
    pub weights_layer2: Matrix2,
    pub targets: [f64; 2],
}

impl Default for MultiLayerParams {
    fn default() -> Self {
        Self {
            inputs: [1.0, 0.5],
            weights_layer1: [[0.2, 0.8], [0.4, 0.6]],
            weights_layer2: [[0.3, 0.7], [0.5, 0.9]],
            targets: [0.9, 0.1],
        }
    }
}

/// Identifies one weight. Indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weight {
    /// Input `input` → hidden `hidden`.
    Layer1 { hidden: usize, input: usize },
    /// Hidden `hidden` → output `output`.
    Layer2 { output: usize, hidden: usize },
}

impl Weight {
    pub fn all() -> impl Iterator<Item = Weight> {
        let layer1 = (0..2).flat_map(|hidden| (0..2).map(move |input| Weight::Layer1 { hidden, input }));
        let layer2 = (0..2).flat_map(|output| (0..2).map(move |hidden| Weight::Layer2 { output, hidden }));
        layer1.chain(layer2)
    }

    fn check(self) -> LabResult<Self> {
        let (r, c) = match self {
            Weight::Layer1 { hidden, input } => (hidden, input),
            Weight::Layer2 { output, hidden } => (output, hidden),
        };
        if r < 2 && c < 2 {
            Ok(self)
        } else {
            Err(LabError::Topology(format!("{self:?} is not a weight of the 2-2-2 network")))
        }
    }
}

fn subscript(n: usize) -> char {
    char::from_u32(0x2080 + n as u32).unwrap_or('?')
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (layer, r, c) = match *self {
            Weight::Layer1 { hidden, input } => ('¹', hidden, input),
            Weight::Layer2 { output, hidden } => ('²', output, hidden),
        };
        write!(f, "θ⁽{layer}⁾{}{}", subscript(r + 1), subscript(c + 1))
    }
}

impl MultiLayerParams {
    pub fn weight(&self, w: Weight) -> LabResult<f64> {
        Ok(match w.check()? {
            Weight::Layer1 { hidden, input } => self.weights_layer1[hidden][input],
            Weight::Layer2 { output, hidden } => self.weights_layer2[output][hidden],
        })
    }

    /// Slider edit of a single weight. Out-of-range values leave every
    /// weight untouched.
    pub fn set_weight(&mut self, w: Weight, value: f64) -> LabResult<()> {
        let w = w.check()?;
        let value = WEIGHT_BOUNDS.check(value)?;
        match w {
            Weight::Layer1 { hidden, input } => self.weights_layer1[hidden][input] = value,
            Weight::Layer2 { output, hidden } => self.weights_layer2[output][hidden] = value,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiLayerForward {
    pub params: MultiLayerParams,
    pub z2: [f64; 2],
    pub a2: [f64; 2],
    pub z3: [f64; 2],
    pub a3: [f64; 2],
    pub errors: [f64; 2],
    pub cost: f64,
}

/// One chain-rule path from a weight to the cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathContribution {
    /// Output neuron the path runs through (zero-based).
    pub output: usize,
    /// `(label, value)` for each chain-rule factor, cost side first.
    pub factors: Vec<(String, f64)>,
    pub product: f64,
}

impl PathContribution {
    fn new(output: usize, factors: Vec<(String, f64)>) -> Self {
        let product = factors.iter().map(|(_, v)| v).product();
        Self {
            output,
            factors,
            product,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gradients {
    pub d_layer1: Matrix2,
    pub d_layer2: Matrix2,
}

fn matvec(m: &Matrix2, v: &[f64; 2]) -> [f64; 2] {
    [
        m[0][0] * v[0] + m[0][1] * v[1],
        m[1][0] * v[0] + m[1][1] * v[1],
    ]
}

pub fn forward(params: MultiLayerParams) -> MultiLayerForward {
    let z2 = matvec(&params.weights_layer1, &params.inputs);
    let a2 = z2.map(sigmoid);
    let z3 = matvec(&params.weights_layer2, &a2);
    let a3 = z3.map(sigmoid);
    let errors = [a3[0] - params.targets[0], a3[1] - params.targets[1]];
    let cost = half_sum_squared_error(&a3, &params.targets);
    MultiLayerForward {
        params,
        z2,
        a2,
        z3,
        a3,
        errors,
        cost,
    }
}

impl MultiLayerForward {
    /// Every path through which `weight` moves the cost.
    pub fn gradient_paths(&self, weight: Weight) -> LabResult<Vec<PathContribution>> {
        let weight = weight.check()?;
        let w2 = &self.params.weights_layer2;
        let paths = match weight {
            Weight::Layer1 { hidden: i, input: j } => (0..2)
                .map(|k| {
                    let n = k + 1;
                    let h = i + 1;
                    PathContribution::new(
                        k,
                        vec![
                            (format!("∂J/∂a⁽³⁾{}", subscript(n)), self.errors[k]),
                            (format!("∂a⁽³⁾{0}/∂z⁽³⁾{0}", subscript(n)), sigmoid_slope(self.a3[k])),
                            (format!("∂z⁽³⁾{}/∂a⁽²⁾{}", subscript(n), subscript(h)), w2[k][i]),
                            (format!("∂a⁽²⁾{0}/∂z⁽²⁾{0}", subscript(h)), sigmoid_slope(self.a2[i])),
                            (format!("∂z⁽²⁾{}/∂{weight}", subscript(h)), self.params.inputs[j]),
                        ],
                    )
                })
                .collect(),
            Weight::Layer2 { output: k, hidden: i } => {
                let n = k + 1;
                vec![PathContribution::new(
                    k,
                    vec![
                        (format!("∂J/∂a⁽³⁾{}", subscript(n)), self.errors[k]),
                        (format!("∂a⁽³⁾{0}/∂z⁽³⁾{0}", subscript(n)), sigmoid_slope(self.a3[k])),
                        (format!("∂z⁽³⁾{}/∂{weight}", subscript(n)), self.a2[i]),
                    ],
                )]
            }
        };
        debug!(%weight, paths = paths.len(), "enumerated gradient paths");
        Ok(paths)
    }

    /// `∂J/∂weight`, the sum over [`gradient_paths`](Self::gradient_paths).
    pub fn gradient(&self, weight: Weight) -> LabResult<f64> {
        Ok(self
            .gradient_paths(weight)?
            .iter()
            .map(|p| p.product)
            .sum())
    }

    pub fn gradients(&self) -> Gradients {
        let mut grads = Gradients {
            d_layer1: [[0.0; 2]; 2],
            d_layer2: [[0.0; 2]; 2],
        };
        for w in Weight::all() {
            // Weight::all only yields in-range indices.
            let g = self.gradient(w).unwrap_or(f64::NAN);
            match w {
                Weight::Layer1 { hidden, input } => grads.d_layer1[hidden][input] = g,
                Weight::Layer2 { output, hidden } => grads.d_layer2[output][hidden] = g,
            }
        }
        grads
    }
}
