//! Configurable feed-forward network for the perceptron visualizer.
//!
//! Forward pass only: layers are initialized once (Xavier uniform weights,
//! small uniform biases) and every run records each layer's pre-activations
//! and outputs so single neurons can be inspected afterwards.
use crate::activations::{Activation, ActivationKind, Softmax};
use crate::error::{LabError, LabResult};
use crate::input::{NumericField, SliderBounds};
use crate::metrics::History;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Row-major weight matrix, `[neuron][input]`.
pub type Matrix = Vec<Vec<f64>>;

pub const MAX_INPUTS: usize = 20;
pub const MAX_OUTPUTS: usize = 20;
pub const MAX_HIDDEN_LAYERS: usize = 10;
pub const MAX_HIDDEN_WIDTH: usize = 50;
pub const INPUT_BOUNDS: SliderBounds = SliderBounds::new(-1000.0, 1000.0, 0.01);
pub const BIAS_LIMIT: f64 = 0.1;
pub const HISTORY_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    pub inputs: usize,
    pub hidden: Vec<usize>,
    pub outputs: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            inputs: 3,
            hidden: vec![4],
            outputs: 2,
        }
    }
}

impl Topology {
    pub fn validate(&self) -> LabResult<()> {
        if !(1..=MAX_INPUTS).contains(&self.inputs) {
            return Err(LabError::Topology(format!(
                "input size must be 1-{MAX_INPUTS}, got {}",
                self.inputs
            )));
        }
        if !(1..=MAX_OUTPUTS).contains(&self.outputs) {
            return Err(LabError::Topology(format!(
                "output size must be 1-{MAX_OUTPUTS}, got {}",
                self.outputs
            )));
        }
        if self.hidden.len() > MAX_HIDDEN_LAYERS {
            return Err(LabError::Topology(format!(
                "at most {MAX_HIDDEN_LAYERS} hidden layers, got {}",
                self.hidden.len()
            )));
        }
        if let Some((i, &width)) = self
            .hidden
            .iter()
            .enumerate()
            .find(|(_, w)| !(1..=MAX_HIDDEN_WIDTH).contains(*w))
        {
            return Err(LabError::Topology(format!(
                "hidden layer {} must have 1-{MAX_HIDDEN_WIDTH} neurons, got {width}",
                i + 1
            )));
        }
        Ok(())
    }

    /// Every layer width, input first.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden.len() + 2);
        sizes.push(self.inputs);
        sizes.extend(&self.hidden);
        sizes.push(self.outputs);
        sizes
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<String> = self.sizes().iter().map(|s| s.to_string()).collect();
        f.write_str(&sizes.join("-"))
    }
}

/// A fully-connected layer.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub weights: Matrix,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    /// Xavier/Glorot uniform weights `U(−√(6/(fan_in+fan_out)), +…)` and
    /// biases `U(−0.1, 0.1)`.
    pub fn new<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let weights = (0..fan_out)
            .map(|_| (0..fan_in).map(|_| rng.gen_range(-limit..=limit)).collect())
            .collect();
        let bias = (0..fan_out)
            .map(|_| rng.gen_range(-BIAS_LIMIT..=BIAS_LIMIT))
            .collect();
        Self { weights, bias }
    }

    pub fn fan_in(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn fan_out(&self) -> usize {
        self.bias.len()
    }

    /// `z = W·x + b`
    pub fn pre_activations(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, &b)| row.iter().zip(input).map(|(&w, &x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

/// What one forward run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardRecord {
    pub run: u64,
    pub inputs: Vec<f64>,
    pub outputs: Vec<f64>,
}

/// The arithmetic behind one neuron's value, for the inspector panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeuronBreakdown {
    pub layer: usize,
    pub neuron: usize,
    /// `(input, weight, input·weight)` per incoming connection.
    pub terms: Vec<(f64, f64, f64)>,
    pub bias: f64,
    pub pre_activation: f64,
    pub activated: f64,
    /// `∂a/∂z` at this neuron. For a softmax output, the diagonal term `a(1 − a)`.
    pub slope: f64,
    pub activation: ActivationKind,
}

#[derive(Debug)]
pub struct FeedForwardNet {
    topology: Topology,
    activation: ActivationKind,
    hidden_activation: Arc<dyn Activation>,
    layers: Vec<DenseLayer>,
    inputs: Vec<NumericField>,
    /// Pre-activations per non-input layer from the last run.
    pre_activations: Vec<Vec<f64>>,
    /// Outputs per layer from the last run, input layer first.
    layer_outputs: Vec<Vec<f64>>,
    history: History<ForwardRecord>,
    runs: u64,
    rng: StdRng,
}

impl FeedForwardNet {
    pub fn new(topology: Topology, activation: ActivationKind, seed: u64) -> LabResult<Self> {
        topology.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let sizes = topology.sizes();
        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], &mut rng))
            .collect();
        let inputs = (0..topology.inputs)
            .map(|_| NumericField::new(0.0, INPUT_BOUNDS).lenient())
            .collect();
        let layer_outputs = sizes.iter().map(|&n| vec![0.0; n]).collect();
        info!(%topology, %activation, seed, "network initialized");
        Ok(Self {
            hidden_activation: activation.hidden(),
            topology,
            activation,
            layers,
            inputs,
            pre_activations: Vec::new(),
            layer_outputs,
            history: History::new(HISTORY_LEN),
            runs: 0,
            rng,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn activation(&self) -> ActivationKind {
        self.activation
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn inputs(&self) -> &[NumericField] {
        &self.inputs
    }

    pub fn input_values(&self) -> Vec<f64> {
        self.inputs.iter().map(NumericField::value).collect()
    }

    pub fn layer_outputs(&self) -> &[Vec<f64>] {
        &self.layer_outputs
    }

    pub fn outputs(&self) -> &[f64] {
        self.layer_outputs.last().map_or(&[], Vec::as_slice)
    }

    pub fn history(&self) -> &History<ForwardRecord> {
        &self.history
    }

    /// Swap the activation; weights are kept.
    pub fn set_activation(&mut self, activation: ActivationKind) {
        self.activation = activation;
        self.hidden_activation = activation.hidden();
    }

    fn field_mut(&mut self, index: usize) -> LabResult<&mut NumericField> {
        let len = self.inputs.len();
        self.inputs
            .get_mut(index)
            .ok_or_else(|| LabError::Topology(format!("input {index} out of range (network has {len})")))
    }

    /// Typed edit of one input box.
    pub fn edit_input(&mut self, index: usize, text: &str) -> LabResult<f64> {
        Ok(self.field_mut(index)?.edit(text)?)
    }

    pub fn set_inputs(&mut self, values: &[f64]) -> LabResult<()> {
        if values.len() != self.inputs.len() {
            return Err(LabError::Topology(format!(
                "expected {} inputs, got {}",
                self.inputs.len(),
                values.len()
            )));
        }
        // Validate everything first so a bad value leaves all fields alone.
        for &v in values {
            INPUT_BOUNDS.check(v)?;
        }
        for (field, &v) in self.inputs.iter_mut().zip(values) {
            field.set(v)?;
        }
        Ok(())
    }

    /// Uniform values in `[−5, 5)`, rounded to two decimals.
    pub fn randomize_inputs(&mut self) {
        for field in &mut self.inputs {
            let v: f64 = (self.rng.gen::<f64>() - 0.5) * 10.0;
            let _ = field.set((v * 100.0).round() / 100.0);
        }
    }

    pub fn reset_inputs(&mut self) {
        for field in &mut self.inputs {
            let _ = field.set(0.0);
        }
    }

    /// Run every layer on the current inputs.
    ///
    /// Refused while any input box holds a rejected edit.
    pub fn forward(&mut self) -> LabResult<&[f64]> {
        if let Some((i, field)) = self
            .inputs
            .iter()
            .enumerate()
            .find(|(_, f)| f.error().is_some())
        {
            return Err(LabError::Field {
                index: i + 1,
                message: field.error().unwrap_or_default().to_string(),
            });
        }
        let input = self.input_values();
        let last = self.layers.len().saturating_sub(1);
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut layer_outputs = vec![input.clone()];
        let mut current = input.clone();
        for (idx, layer) in self.layers.iter().enumerate() {
            let z = layer.pre_activations(&current);
            let a = if idx == last && self.activation == ActivationKind::Softmax {
                Softmax.apply_vec(&z)
            } else {
                self.hidden_activation.apply_vec(&z)
            };
            debug!(layer = idx + 1, neurons = a.len(), "layer computed");
            pre_activations.push(z);
            layer_outputs.push(a.clone());
            current = a;
        }
        self.runs += 1;
        self.pre_activations = pre_activations;
        self.layer_outputs = layer_outputs;
        self.history.push(ForwardRecord {
            run: self.runs,
            inputs: input,
            outputs: current,
        });
        Ok(self.outputs())
    }

    /// Explain neuron `neuron` of layer `layer` (1 = first hidden layer)
    /// using the last run.
    pub fn neuron_breakdown(&self, layer: usize, neuron: usize) -> LabResult<NeuronBreakdown> {
        let dense = layer
            .checked_sub(1)
            .and_then(|i| self.layers.get(i))
            .ok_or_else(|| LabError::Topology(format!("no computed layer {layer}")))?;
        let row = dense
            .weights
            .get(neuron)
            .ok_or_else(|| LabError::Topology(format!("layer {layer} has no neuron {neuron}")))?;
        let incoming = &self.layer_outputs[layer - 1];
        let terms = incoming
            .iter()
            .zip(row)
            .map(|(&x, &w)| (x, w, x * w))
            .collect();
        let activation = if layer == self.layers.len() {
            self.activation
        } else if self.activation == ActivationKind::Softmax {
            ActivationKind::Relu
        } else {
            self.activation
        };
        let pre_activation = self
            .pre_activations
            .get(layer - 1)
            .and_then(|z| z.get(neuron))
            .copied()
            .unwrap_or(0.0);
        let activated = self.layer_outputs[layer][neuron];
        let slope = if activation == ActivationKind::Softmax {
            activated * (1.0 - activated)
        } else {
            activation.hidden().derivative(pre_activation)
        };
        Ok(NeuronBreakdown {
            layer,
            neuron,
            terms,
            bias: dense.bias[neuron],
            pre_activation,
            activated,
            slope,
            activation,
        })
    }
}
