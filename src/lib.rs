//! Numeric kernels and tick-driven simulators behind an interactive
//! backpropagation course.
//!
//! - Toy 1-1-1 network with a step-by-step chain-rule walkthrough
//! - Fixed 2-2-2 network with per-path gradient breakdowns
//! - One-dimensional gradient descent on a bell-shaped cost
//! - Training dashboard with divergence detection and advisories
//! - Configurable feed-forward visualizer (forward pass only)
//! - Walkthrough stepper, equation typesetter and page routes
//! - TOML configuration, tracing setup and CSV history export

pub mod activations;
pub mod config;
pub mod descent;
pub mod error;
pub mod feedforward;
pub mod input;
pub mod logging;
pub mod loss;
pub mod metrics;
pub mod multilayer;
pub mod report;
pub mod routes;
pub mod simulation;
pub mod stepper;
pub mod toy;
pub mod training;
pub mod typeset;

pub use activations::{sigmoid, sigmoid_slope, Activation, ActivationKind};
pub use config::LabConfig;
pub use descent::{DescentParams, DescentSimulator};
pub use error::{InputError, LabError, LabResult};
pub use feedforward::{FeedForwardNet, Topology};
pub use input::{NumericField, SliderBounds};
pub use loss::{bell_curve_cost, bell_curve_gradient, half_squared_error};
pub use metrics::History;
pub use multilayer::{MultiLayerForward, MultiLayerParams, Weight};
pub use routes::Page;
pub use simulation::{Phase, Simulation};
pub use stepper::Walkthrough;
pub use toy::{ToyEvaluation, ToyParams};
pub use training::{Dashboard, Insight, TrainingFailure, TrainingParams, TrainingState};
pub use typeset::Typesetter;
